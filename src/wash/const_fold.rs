//! Constant folding: evaluate compile-time constant expressions and record
//! them for reachability analysis and the code generator.
//!
//! Constants are literals, unary `-`/`!` of constants, binary operators
//! over constant operands (including string concatenation), numeric casts
//! of constants, and reads of static final fields whose initializers are
//! themselves constant.

use std::collections::HashMap;

use crate::ast::*;
use crate::wash::{Attributes, Binding, Const, FieldRef, Program, Ty};

pub fn run(program: &Program, attrs: &mut Attributes) {
    // Fixpoint over static final field initializers: a constant field may
    // reference another constant field declared in any unit.
    let mut constant_statics: HashMap<FieldRef, Const> = HashMap::new();
    loop {
        let mut changed = false;
        for id in 0..program.units.len() {
            let class = match &program.units[id].ty {
                TypeDeclNode::Class(class) => class,
                TypeDeclNode::Interface(_) => continue,
            };
            for (index, field) in class.fields.iter().enumerate() {
                let info = &program.types[id].fields[index];
                if !info.is_static() || !info.is_final() {
                    continue;
                }
                let fr = FieldRef { owner: id, index };
                if constant_statics.contains_key(&fr) {
                    continue;
                }
                if let Some(init) = &field.init {
                    if let Some(value) = fold(init, attrs, &constant_statics) {
                        constant_statics.insert(fr, value);
                        changed = true;
                    }
                }
            }
        }
        if !changed {
            break;
        }
    }

    // Fold every expression in the program, recording results per node.
    for id in 0..program.units.len() {
        let class = match &program.units[id].ty {
            TypeDeclNode::Class(class) => class,
            TypeDeclNode::Interface(_) => continue,
        };
        for field in &class.fields {
            if let Some(init) = &field.init {
                fold_and_record(init, attrs, &constant_statics);
            }
        }
        for ctor in &class.constructors {
            fold_block(&ctor.body, attrs, &constant_statics);
        }
        for method in &class.methods {
            if let Some(body) = &method.body {
                fold_block(body, attrs, &constant_statics);
            }
        }
    }
}

fn fold_block(block: &Block, attrs: &mut Attributes, env: &HashMap<FieldRef, Const>) {
    for stmt in &block.statements {
        fold_stmt(stmt, attrs, env);
    }
}

fn fold_stmt(stmt: &Stmt, attrs: &mut Attributes, env: &HashMap<FieldRef, Const>) {
    match &stmt.kind {
        StmtKind::Block(block) => fold_block(block, attrs, env),
        StmtKind::Empty => {}
        StmtKind::Expr(expr) => {
            fold_and_record(expr, attrs, env);
        }
        StmtKind::If { cond, then_branch, else_branch } => {
            fold_and_record(cond, attrs, env);
            fold_stmt(then_branch, attrs, env);
            if let Some(else_branch) = else_branch {
                fold_stmt(else_branch, attrs, env);
            }
        }
        StmtKind::While { cond, body } => {
            fold_and_record(cond, attrs, env);
            fold_stmt(body, attrs, env);
        }
        StmtKind::For { init, cond, update, body } => {
            match init.as_deref() {
                Some(ForInit::Decl(decl)) => {
                    if let Some(init) = &decl.init {
                        fold_and_record(init, attrs, env);
                    }
                }
                Some(ForInit::Expr(expr)) => {
                    fold_and_record(expr, attrs, env);
                }
                None => {}
            }
            if let Some(cond) = cond {
                fold_and_record(cond, attrs, env);
            }
            if let Some(update) = update {
                fold_and_record(update, attrs, env);
            }
            fold_stmt(body, attrs, env);
        }
        StmtKind::Return(value) => {
            if let Some(value) = value {
                fold_and_record(value, attrs, env);
            }
        }
        StmtKind::LocalVar(decl) => {
            if let Some(init) = &decl.init {
                fold_and_record(init, attrs, env);
            }
        }
    }
}

fn fold_and_record(
    expr: &Expr,
    attrs: &mut Attributes,
    env: &HashMap<FieldRef, Const>,
) -> Option<Const> {
    let value = fold(expr, attrs, env);
    if let Some(value) = &value {
        attrs.consts.insert(expr.id, value.clone());
    }
    value
}

/// Evaluate an expression to a constant, recording constants for every
/// foldable sub-expression along the way.
fn fold(expr: &Expr, attrs: &mut Attributes, env: &HashMap<FieldRef, Const>) -> Option<Const> {
    let value = match &expr.kind {
        ExprKind::Literal(lit) => match lit {
            Literal::Int(magnitude) => Some(Const::Int(*magnitude as u32 as i32)),
            Literal::Bool(b) => Some(Const::Bool(*b)),
            Literal::Char(c) => Some(Const::Int(*c as i32)),
            Literal::Str(s) => Some(Const::Str(s.clone())),
            Literal::Null => Some(Const::Null),
        },
        ExprKind::Unary { op, operand } => {
            let operand_value = fold_and_record(operand, attrs, env);
            match (op, operand_value?) {
                (UnaryOp::Minus, Const::Int(v)) => Some(Const::Int(v.wrapping_neg())),
                (UnaryOp::Not, Const::Bool(b)) => Some(Const::Bool(!b)),
                _ => None,
            }
        }
        ExprKind::Binary { op, lhs, rhs } => {
            let lhs_value = fold_and_record(lhs, attrs, env);
            let rhs_value = fold_and_record(rhs, attrs, env);
            fold_binary(*op, expr, lhs, rhs, lhs_value?, rhs_value?, attrs)
        }
        ExprKind::Cast { ty: _, expr: operand } => {
            let operand_value = fold_and_record(operand, attrs, env)?;
            let target = attrs.type_operands.get(&expr.id)?.clone();
            match (&target, operand_value) {
                (Ty::Int, Const::Int(v)) => Some(Const::Int(v)),
                (Ty::Short, Const::Int(v)) => Some(Const::Int(v as i16 as i32)),
                (Ty::Byte, Const::Int(v)) => Some(Const::Int(v as i8 as i32)),
                (Ty::Char, Const::Int(v)) => Some(Const::Int(v as u16 as i32)),
                (Ty::Boolean, Const::Bool(b)) => Some(Const::Bool(b)),
                (Ty::Ref(_), Const::Str(s)) => Some(Const::Str(s)),
                _ => None,
            }
        }
        ExprKind::Name(_) => {
            let resolution = attrs.names.get(&expr.id)?;
            if attrs.chains.contains_key(&expr.id) {
                return None;
            }
            match resolution.binding {
                Binding::StaticField(fr) => env.get(&fr).cloned(),
                _ => None,
            }
        }
        // Not constant themselves, but constants may hide in the operands.
        ExprKind::Call { recv, args, .. } => {
            if let Some(recv) = recv {
                fold_and_record(recv, attrs, env);
            }
            for arg in args {
                fold_and_record(arg, attrs, env);
            }
            None
        }
        ExprKind::New { args, .. } => {
            for arg in args {
                fold_and_record(arg, attrs, env);
            }
            None
        }
        ExprKind::NewArray { len, .. } => {
            fold_and_record(len, attrs, env);
            None
        }
        ExprKind::ArrayAccess { array, index } => {
            fold_and_record(array, attrs, env);
            fold_and_record(index, attrs, env);
            None
        }
        ExprKind::FieldAccess { target, .. } => {
            fold_and_record(target, attrs, env);
            None
        }
        ExprKind::InstanceOf { expr: operand, .. } => {
            fold_and_record(operand, attrs, env);
            None
        }
        ExprKind::Assign { lhs, rhs } => {
            fold_and_record(rhs, attrs, env);
            // The target is never folded, but its index expressions may be.
            if let ExprKind::ArrayAccess { array, index } = &lhs.kind {
                fold_and_record(array, attrs, env);
                fold_and_record(index, attrs, env);
            }
            None
        }
        ExprKind::This => None,
    };
    value
}

fn fold_binary(
    op: BinaryOp,
    expr: &Expr,
    lhs: &Expr,
    rhs: &Expr,
    a: Const,
    b: Const,
    attrs: &Attributes,
) -> Option<Const> {
    use BinaryOp::*;

    // String concatenation: the result type decides, not the operands.
    if op == Add {
        if let Some(Ty::Ref(_)) = attrs.expr_tys.get(&expr.id) {
            let lhs_ty = attrs.expr_tys.get(&lhs.id);
            let rhs_ty = attrs.expr_tys.get(&rhs.id);
            let mut s = render(&a, lhs_ty)?;
            s.push_str(&render(&b, rhs_ty)?);
            return Some(Const::Str(s));
        }
    }

    match (a, b) {
        (Const::Int(x), Const::Int(y)) => match op {
            Add => Some(Const::Int(x.wrapping_add(y))),
            Sub => Some(Const::Int(x.wrapping_sub(y))),
            Mul => Some(Const::Int(x.wrapping_mul(y))),
            // Division by a zero constant is left for the runtime check.
            Div if y != 0 => Some(Const::Int(x.wrapping_div(y))),
            Rem if y != 0 => Some(Const::Int(x.wrapping_rem(y))),
            Lt => Some(Const::Bool(x < y)),
            Le => Some(Const::Bool(x <= y)),
            Gt => Some(Const::Bool(x > y)),
            Ge => Some(Const::Bool(x >= y)),
            Eq => Some(Const::Bool(x == y)),
            Ne => Some(Const::Bool(x != y)),
            _ => None,
        },
        (Const::Bool(x), Const::Bool(y)) => match op {
            Eq => Some(Const::Bool(x == y)),
            Ne => Some(Const::Bool(x != y)),
            And | EagerAnd => Some(Const::Bool(x && y)),
            Or | EagerOr => Some(Const::Bool(x || y)),
            _ => None,
        },
        _ => None,
    }
}

/// Render a constant the way Java's string conversion would, using the
/// operand's static type to distinguish chars from ints.
fn render(value: &Const, ty: Option<&Ty>) -> Option<String> {
    Some(match value {
        Const::Int(v) => {
            if ty == Some(&Ty::Char) {
                char::from_u32(*v as u32)?.to_string()
            } else {
                v.to_string()
            }
        }
        Const::Bool(b) => b.to_string(),
        Const::Str(s) => s.clone(),
        Const::Null => "null".to_string(),
    })
}
