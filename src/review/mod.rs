//! AST-level review (the weeder): syntactic restrictions the grammar
//! cannot express, checked per compilation unit before any global analysis.

use crate::ast::*;
use crate::common::error::{Diagnostics, ErrorKind};
use crate::parser::span::Span;

mod class;
mod fields;
mod methods;
mod statements;

#[derive(thiserror::Error, Debug)]
pub enum ReviewError {
    #[error("duplicate modifier '{0}'")]
    DuplicateModifier(Modifier),
    #[error("declaration cannot be both public and protected")]
    PublicAndProtected,
    #[error("invalid modifier '{modifier}' in {place} declaration")]
    InvalidModifier { modifier: Modifier, place: &'static str },
    #[error("class '{0}' cannot be both abstract and final")]
    ClassAbstractAndFinal(String),
    #[error("public type '{name}' must be declared in a file named {name}.java")]
    FileNameMismatch { name: String },
    #[error("non-abstract class '{0}' cannot contain abstract method '{1}'")]
    AbstractMethodInConcreteClass(String, String),
    #[error("method '{0}' must be declared public or protected")]
    MethodNeedsAccess(String),
    #[error("constructor must be declared public or protected")]
    CtorNeedsAccess,
    #[error("abstract method '{0}' cannot also be static, final or native")]
    AbstractConflict(String),
    #[error("static method '{0}' cannot be final")]
    StaticFinal(String),
    #[error("native method '{0}' must be static")]
    NativeNotStatic(String),
    #[error("native method '{0}' must have the signature 'static native int {0}(int)'")]
    NativeSignature(String),
    #[error("abstract or native method '{0}' must not have a body")]
    AbstractWithBody(String),
    #[error("method '{0}' must have a body")]
    MissingBody(String),
    #[error("interface method '{0}' cannot be static, final or native")]
    InterfaceMethodModifier(String),
    #[error("interface method '{0}' must not have a body")]
    InterfaceMethodBody(String),
    #[error("final field '{0}' must have an initializer")]
    FinalFieldWithoutInit(String),
    #[error("integer literal {0} is out of range")]
    IntegerOutOfRange(u64),
    #[error("void method cannot return a value")]
    VoidReturnsValue,
    #[error("non-void method must return a value")]
    NonVoidReturnsNothing,
}

/// Report a review failure into the shared diagnostics sink.
pub(crate) fn report(diags: &mut Diagnostics, error: ReviewError, span: Span) {
    diags.error(ErrorKind::Weeder, error.to_string(), Some(span));
}

/// Review one compilation unit, reporting every violation found.
pub fn review_unit(unit: &CompilationUnit, diags: &mut Diagnostics) {
    match &unit.ty {
        TypeDeclNode::Class(decl) => {
            class::review_class(unit, decl, diags);
            for field in &decl.fields {
                fields::review_field(field, diags);
            }
            for method in &decl.methods {
                methods::review_method(method, diags);
            }
            for ctor in &decl.constructors {
                methods::review_constructor(ctor, diags);
            }
            statements::review_class_bodies(decl, diags);
        }
        TypeDeclNode::Interface(decl) => {
            class::review_interface(unit, decl, diags);
            for method in &decl.methods {
                methods::review_interface_method(method, diags);
            }
        }
    }
}

/// Shared modifier-list hygiene: duplicates and public/protected conflicts.
pub(crate) fn review_modifier_list(
    modifiers: &[Modifier],
    allowed: &[Modifier],
    place: &'static str,
    span: Span,
    diags: &mut Diagnostics,
) {
    for (i, modifier) in modifiers.iter().enumerate() {
        if modifiers[..i].contains(modifier) {
            report(diags, ReviewError::DuplicateModifier(*modifier), span);
        }
        if !allowed.contains(modifier) {
            report(
                diags,
                ReviewError::InvalidModifier { modifier: *modifier, place },
                span,
            );
        }
    }
    if has_modifier(modifiers, Modifier::Public) && has_modifier(modifiers, Modifier::Protected) {
        report(diags, ReviewError::PublicAndProtected, span);
    }
}
