use super::{report, review_modifier_list, ReviewError};
use crate::ast::*;
use crate::common::error::Diagnostics;

pub(crate) fn review_field(field: &FieldDecl, diags: &mut Diagnostics) {
    review_modifier_list(
        &field.modifiers,
        &[Modifier::Public, Modifier::Protected, Modifier::Static, Modifier::Final],
        "field",
        field.span,
        diags,
    );

    if has_modifier(&field.modifiers, Modifier::Final) && field.init.is_none() {
        report(diags, ReviewError::FinalFieldWithoutInit(field.name.clone()), field.span);
    }
}
