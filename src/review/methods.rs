use super::{report, review_modifier_list, ReviewError};
use crate::ast::*;
use crate::common::error::Diagnostics;

pub(crate) fn review_method(method: &MethodDecl, diags: &mut Diagnostics) {
    review_modifier_list(
        &method.modifiers,
        &[
            Modifier::Public,
            Modifier::Protected,
            Modifier::Abstract,
            Modifier::Static,
            Modifier::Final,
            Modifier::Native,
        ],
        "method",
        method.span,
        diags,
    );

    let mods = &method.modifiers;
    if !has_modifier(mods, Modifier::Public) && !has_modifier(mods, Modifier::Protected) {
        report(diags, ReviewError::MethodNeedsAccess(method.name.clone()), method.span);
    }

    if has_modifier(mods, Modifier::Abstract)
        && (has_modifier(mods, Modifier::Static)
            || has_modifier(mods, Modifier::Final)
            || has_modifier(mods, Modifier::Native))
    {
        report(diags, ReviewError::AbstractConflict(method.name.clone()), method.span);
    }

    if has_modifier(mods, Modifier::Static) && has_modifier(mods, Modifier::Final) {
        report(diags, ReviewError::StaticFinal(method.name.clone()), method.span);
    }

    if has_modifier(mods, Modifier::Native) {
        if !has_modifier(mods, Modifier::Static) {
            report(diags, ReviewError::NativeNotStatic(method.name.clone()), method.span);
        }
        let int_return = method.return_ty.kind == TypeRefKind::Int;
        let int_param = method.params.len() == 1 && method.params[0].ty.kind == TypeRefKind::Int;
        if !int_return || !int_param {
            report(diags, ReviewError::NativeSignature(method.name.clone()), method.span);
        }
    }

    let bodiless = has_modifier(mods, Modifier::Abstract) || has_modifier(mods, Modifier::Native);
    if bodiless && method.body.is_some() {
        report(diags, ReviewError::AbstractWithBody(method.name.clone()), method.span);
    }
    if !bodiless && method.body.is_none() {
        report(diags, ReviewError::MissingBody(method.name.clone()), method.span);
    }

    review_duplicate_params(&method.params, diags);
}

pub(crate) fn review_interface_method(method: &MethodDecl, diags: &mut Diagnostics) {
    review_modifier_list(
        &method.modifiers,
        &[Modifier::Public, Modifier::Abstract],
        "interface method",
        method.span,
        diags,
    );

    if has_modifier(&method.modifiers, Modifier::Static)
        || has_modifier(&method.modifiers, Modifier::Final)
        || has_modifier(&method.modifiers, Modifier::Native)
    {
        report(diags, ReviewError::InterfaceMethodModifier(method.name.clone()), method.span);
    }

    if method.body.is_some() {
        report(diags, ReviewError::InterfaceMethodBody(method.name.clone()), method.span);
    }

    review_duplicate_params(&method.params, diags);
}

pub(crate) fn review_constructor(ctor: &ConstructorDecl, diags: &mut Diagnostics) {
    review_modifier_list(
        &ctor.modifiers,
        &[Modifier::Public, Modifier::Protected],
        "constructor",
        ctor.span,
        diags,
    );

    if !has_modifier(&ctor.modifiers, Modifier::Public)
        && !has_modifier(&ctor.modifiers, Modifier::Protected)
    {
        report(diags, ReviewError::CtorNeedsAccess, ctor.span);
    }

    review_duplicate_params(&ctor.params, diags);
}

fn review_duplicate_params(params: &[Param], diags: &mut Diagnostics) {
    for (i, param) in params.iter().enumerate() {
        if params[..i].iter().any(|p| p.name == param.name) {
            diags.error(
                crate::common::error::ErrorKind::Weeder,
                format!("duplicate formal parameter '{}'", param.name),
                Some(param.span),
            );
        }
    }
}
