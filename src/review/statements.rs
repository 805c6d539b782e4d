use super::{report, ReviewError};
use crate::ast::*;
use crate::common::error::Diagnostics;

const MAX_INT: u64 = i32::MAX as u64;

/// Walk every method, constructor and field-initializer body of a class,
/// enforcing literal ranges and return-statement arity.
pub(crate) fn review_class_bodies(decl: &ClassDecl, diags: &mut Diagnostics) {
    for field in &decl.fields {
        if let Some(init) = &field.init {
            review_expr(init, diags);
        }
    }
    for ctor in &decl.constructors {
        review_block(&ctor.body, None, diags);
    }
    for method in &decl.methods {
        if let Some(body) = &method.body {
            let is_void = method.return_ty.kind == TypeRefKind::Void;
            review_block(body, Some(is_void), diags);
        }
    }
}

fn review_block(block: &Block, void_ctx: Option<bool>, diags: &mut Diagnostics) {
    for stmt in &block.statements {
        review_stmt(stmt, void_ctx, diags);
    }
}

fn review_stmt(stmt: &Stmt, void_ctx: Option<bool>, diags: &mut Diagnostics) {
    match &stmt.kind {
        StmtKind::Block(block) => review_block(block, void_ctx, diags),
        StmtKind::Empty => {}
        StmtKind::Expr(expr) => review_expr(expr, diags),
        StmtKind::If { cond, then_branch, else_branch } => {
            review_expr(cond, diags);
            review_stmt(then_branch, void_ctx, diags);
            if let Some(else_branch) = else_branch {
                review_stmt(else_branch, void_ctx, diags);
            }
        }
        StmtKind::While { cond, body } => {
            review_expr(cond, diags);
            review_stmt(body, void_ctx, diags);
        }
        StmtKind::For { init, cond, update, body } => {
            match init.as_deref() {
                Some(ForInit::Decl(decl)) => {
                    if let Some(init) = &decl.init {
                        review_expr(init, diags);
                    }
                }
                Some(ForInit::Expr(expr)) => review_expr(expr, diags),
                None => {}
            }
            if let Some(cond) = cond {
                review_expr(cond, diags);
            }
            if let Some(update) = update {
                review_expr(update, diags);
            }
            review_stmt(body, void_ctx, diags);
        }
        StmtKind::Return(value) => {
            if let Some(value) = value {
                review_expr(value, diags);
            }
            // Constructors (void_ctx None) may only use the bare form.
            match (void_ctx, value.is_some()) {
                (Some(true), true) | (None, true) => {
                    report(diags, ReviewError::VoidReturnsValue, stmt.span)
                }
                (Some(false), false) => {
                    report(diags, ReviewError::NonVoidReturnsNothing, stmt.span)
                }
                _ => {}
            }
        }
        StmtKind::LocalVar(decl) => {
            if let Some(init) = &decl.init {
                review_expr(init, diags);
            }
        }
    }
}

fn review_expr(expr: &Expr, diags: &mut Diagnostics) {
    match &expr.kind {
        // `-2147483648` is the one place the magnitude 2^31 is legal.
        ExprKind::Unary { op: UnaryOp::Minus, operand } => {
            if let ExprKind::Literal(Literal::Int(value)) = &operand.kind {
                if *value > MAX_INT + 1 {
                    report(diags, ReviewError::IntegerOutOfRange(*value), operand.span);
                }
            } else {
                review_expr(operand, diags);
            }
        }
        ExprKind::Literal(Literal::Int(value)) => {
            if *value > MAX_INT {
                report(diags, ReviewError::IntegerOutOfRange(*value), expr.span);
            }
        }
        ExprKind::Literal(_) | ExprKind::This => {}
        ExprKind::Name(_) => {}
        ExprKind::FieldAccess { target, .. } => review_expr(target, diags),
        ExprKind::ArrayAccess { array, index } => {
            review_expr(array, diags);
            review_expr(index, diags);
        }
        ExprKind::Call { recv, args, .. } => {
            if let Some(recv) = recv {
                review_expr(recv, diags);
            }
            for arg in args {
                review_expr(arg, diags);
            }
        }
        ExprKind::New { args, .. } => {
            for arg in args {
                review_expr(arg, diags);
            }
        }
        ExprKind::NewArray { len, .. } => review_expr(len, diags),
        ExprKind::Unary { operand, .. } => review_expr(operand, diags),
        ExprKind::Binary { lhs, rhs, .. } => {
            review_expr(lhs, diags);
            review_expr(rhs, diags);
        }
        ExprKind::InstanceOf { expr, .. } => review_expr(expr, diags),
        ExprKind::Cast { expr, .. } => review_expr(expr, diags),
        ExprKind::Assign { lhs, rhs } => {
            review_expr(lhs, diags);
            review_expr(rhs, diags);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::common::error::Diagnostics;
    use crate::parser::{parse_unit, AstIds};
    use crate::review::review_unit;

    fn review(source: &str) -> Diagnostics {
        let mut ids = AstIds::new();
        let unit = parse_unit(source, "Test", &mut ids).expect("parse failed");
        let mut diags = Diagnostics::new();
        review_unit(&unit, &mut diags);
        diags
    }

    #[test]
    fn int_min_magnitude_needs_minus() {
        let diags = review(
            "public class Test { public Test() {} public int f() { return 2147483648; } }",
        );
        assert!(diags.has_errors());

        let diags = review(
            "public class Test { public Test() {} public int f() { return -2147483648; } }",
        );
        assert!(!diags.has_errors());
    }

    #[test]
    fn out_of_range_even_with_minus() {
        let diags = review(
            "public class Test { public Test() {} public int f() { return -2147483649; } }",
        );
        assert!(diags.has_errors());
    }

    #[test]
    fn void_return_arity() {
        let diags = review(
            "public class Test { public Test() {} public void f() { return 1; } }",
        );
        assert!(diags.has_errors());

        let diags = review(
            "public class Test { public Test() {} public int f() { return; } }",
        );
        assert!(diags.has_errors());
    }

    #[test]
    fn abstract_method_in_concrete_class() {
        let diags = review(
            "public class Test { public Test() {} public abstract int f(); }",
        );
        assert!(diags.has_errors());
    }

    #[test]
    fn native_signature_enforced() {
        let diags = review(
            "public class Test { public Test() {} public static native int f(int x); }",
        );
        assert!(!diags.has_errors());

        let diags = review(
            "public class Test { public Test() {} public static native char f(int x); }",
        );
        assert!(diags.has_errors());
    }

    #[test]
    fn clean_class_passes() {
        let diags = review(
            "public class Test { public Test() {} public static int test() { return 123; } }",
        );
        assert!(diags.is_empty());
    }
}
