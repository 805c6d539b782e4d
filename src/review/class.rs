use super::{report, review_modifier_list, ReviewError};
use crate::ast::*;
use crate::common::error::Diagnostics;

pub(crate) fn review_class(unit: &CompilationUnit, decl: &ClassDecl, diags: &mut Diagnostics) {
    review_modifier_list(
        &decl.modifiers,
        &[Modifier::Public, Modifier::Abstract, Modifier::Final],
        "class",
        decl.span,
        diags,
    );

    if has_modifier(&decl.modifiers, Modifier::Abstract)
        && has_modifier(&decl.modifiers, Modifier::Final)
    {
        report(diags, ReviewError::ClassAbstractAndFinal(decl.name.clone()), decl.span);
    }

    if has_modifier(&decl.modifiers, Modifier::Public) && decl.name != unit.file_name {
        report(diags, ReviewError::FileNameMismatch { name: decl.name.clone() }, decl.span);
    }

    if !has_modifier(&decl.modifiers, Modifier::Abstract) {
        for method in &decl.methods {
            if has_modifier(&method.modifiers, Modifier::Abstract) {
                report(
                    diags,
                    ReviewError::AbstractMethodInConcreteClass(
                        decl.name.clone(),
                        method.name.clone(),
                    ),
                    method.span,
                );
            }
        }
    }
}

pub(crate) fn review_interface(
    unit: &CompilationUnit,
    decl: &InterfaceDecl,
    diags: &mut Diagnostics,
) {
    review_modifier_list(
        &decl.modifiers,
        &[Modifier::Public, Modifier::Abstract],
        "interface",
        decl.span,
        diags,
    );

    if has_modifier(&decl.modifiers, Modifier::Public) && decl.name != unit.file_name {
        report(diags, ReviewError::FileNameMismatch { name: decl.name.clone() }, decl.span);
    }
}
