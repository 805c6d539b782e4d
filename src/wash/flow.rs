//! Flow phase: reachability and definite assignment over every method and
//! constructor body.
//!
//! Reachability follows the Joos statement rules with constant-condition
//! folding applied; unreachable statements are warnings, a non-void body
//! that can complete normally is an error. Definite assignment tracks the
//! set of locals assigned on every path, merging with intersection at join
//! points; a branch that cannot complete normally contributes no
//! constraint to the merge.

use std::collections::HashSet;

use crate::ast::*;
use crate::common::error::{Diagnostics, ErrorKind};
use crate::wash::{Attributes, Binding, Program, StmtFlags, Ty};

pub fn run(program: &Program, attrs: &mut Attributes, diags: &mut Diagnostics) {
    for id in 0..program.units.len() {
        diags.set_file(&program.units[id].file_name);
        let class = match &program.units[id].ty {
            TypeDeclNode::Class(class) => class,
            TypeDeclNode::Interface(_) => continue,
        };
        let info = &program.types[id];

        for ctor in &class.constructors {
            let mut flow = Flow { attrs: &mut *attrs, diags: &mut *diags, warned: false };
            flow.analyze_block(&ctor.body, true);
            let mut da = Assigned { attrs: &*attrs, diags: &mut *diags };
            da.block(&ctor.body, Some(HashSet::new()));
        }

        for (index, method) in class.methods.iter().enumerate() {
            if let Some(body) = &method.body {
                let mut flow = Flow { attrs: &mut *attrs, diags: &mut *diags, warned: false };
                let completes = flow.analyze_block(body, true);
                if completes && info.methods[index].ret != Ty::Void {
                    diags.error(
                        ErrorKind::Reachability,
                        format!("non-void method '{}' may complete without returning", method.name),
                        Some(method.span),
                    );
                }
                let mut da = Assigned { attrs: &*attrs, diags: &mut *diags };
                da.block(body, Some(HashSet::new()));
            }
        }
    }
    diags.clear_file();
}

// ---- reachability ---------------------------------------------------------

struct Flow<'a> {
    attrs: &'a mut Attributes,
    diags: &'a mut Diagnostics,
    /// Only the first statement of an unreachable region is reported.
    warned: bool,
}

impl<'a> Flow<'a> {
    /// Analyze a block; returns whether it can complete normally.
    fn analyze_block(&mut self, block: &Block, mut reachable: bool) -> bool {
        for stmt in &block.statements {
            reachable = self.analyze(stmt, reachable);
        }
        reachable
    }

    /// Analyze one statement; `reachable` is the in-flag, the return value
    /// is whether execution can continue past it.
    fn analyze(&mut self, stmt: &Stmt, reachable: bool) -> bool {
        if reachable {
            self.warned = false;
        } else if !self.warned {
            self.warned = true;
            self.diags.warning(
                ErrorKind::Reachability,
                "unreachable statement",
                Some(stmt.span),
            );
        }

        let completes = match &stmt.kind {
            StmtKind::Block(block) => self.analyze_block(block, reachable),
            StmtKind::Empty | StmtKind::Expr(_) | StmtKind::LocalVar(_) => reachable,
            StmtKind::If { cond, then_branch, else_branch } => {
                let cond_const = self.attrs.bool_const(cond.id);
                match else_branch {
                    None => {
                        let completes_via_then =
                            self.analyze(then_branch, reachable && cond_const != Some(false));
                        match cond_const {
                            // `if (true) S` only completes if S does.
                            Some(true) => completes_via_then,
                            // reachability flows around the branch
                            _ => reachable,
                        }
                    }
                    Some(else_branch) => {
                        let then_completes =
                            self.analyze(then_branch, reachable && cond_const != Some(false));
                        let else_completes =
                            self.analyze(else_branch, reachable && cond_const != Some(true));
                        match cond_const {
                            Some(true) => then_completes,
                            Some(false) => else_completes,
                            None => then_completes || else_completes,
                        }
                    }
                }
            }
            StmtKind::While { cond, body } => {
                let cond_const = self.attrs.bool_const(cond.id);
                self.analyze(body, reachable && cond_const != Some(false));
                match cond_const {
                    // Joos has no break, so `while (true)` never exits.
                    Some(true) => false,
                    Some(false) => reachable,
                    None => reachable,
                }
            }
            StmtKind::For { cond, body, .. } => {
                let cond_const = match cond {
                    // `for (;;)` behaves like `while (true)`.
                    None => Some(true),
                    Some(cond) => self.attrs.bool_const(cond.id),
                };
                self.analyze(body, reachable && cond_const != Some(false));
                match cond_const {
                    Some(true) => false,
                    _ => reachable,
                }
            }
            StmtKind::Return(_) => false,
        };

        self.attrs.stmt_flags.insert(
            stmt.id,
            StmtFlags { reachable, completes_normally: completes },
        );
        completes
    }
}

// ---- definite assignment --------------------------------------------------

/// The set of definitely-assigned locals at a program point; `None` means
/// the point is unreachable (no constraint).
type DaSet = Option<HashSet<NodeId>>;

struct Assigned<'a> {
    attrs: &'a Attributes,
    diags: &'a mut Diagnostics,
}

impl<'a> Assigned<'a> {
    fn block(&mut self, block: &Block, mut set: DaSet) -> DaSet {
        for stmt in &block.statements {
            set = self.stmt(stmt, set);
        }
        set
    }

    fn stmt(&mut self, stmt: &Stmt, set: DaSet) -> DaSet {
        match &stmt.kind {
            StmtKind::Block(block) => self.block(block, set),
            StmtKind::Empty => set,
            StmtKind::Expr(expr) => self.expr(expr, set),
            StmtKind::If { cond, then_branch, else_branch } => {
                let after_cond = self.expr(cond, set);
                let cond_const = self.attrs.bool_const(cond.id);
                match else_branch {
                    None => {
                        let after_then = self.stmt(then_branch, after_cond.clone());
                        match cond_const {
                            Some(true) => after_then,
                            _ => after_cond,
                        }
                    }
                    Some(else_branch) => {
                        let after_then = self.stmt(then_branch, after_cond.clone());
                        let after_else = self.stmt(else_branch, after_cond);
                        match cond_const {
                            Some(true) => after_then,
                            Some(false) => after_else,
                            None => intersect(after_then, after_else),
                        }
                    }
                }
            }
            StmtKind::While { cond, body } => {
                // The condition sees the pre-loop set; assignments inside
                // the body are not assumed on exit.
                let after_cond = self.expr(cond, set);
                self.stmt(body, after_cond.clone());
                match self.attrs.bool_const(cond.id) {
                    Some(true) => None,
                    _ => after_cond,
                }
            }
            StmtKind::For { init, cond, update, body } => {
                let mut current = set;
                match init.as_deref() {
                    Some(ForInit::Decl(decl)) => {
                        current = self.local_decl(decl, current);
                    }
                    Some(ForInit::Expr(expr)) => {
                        current = self.expr(expr, current);
                    }
                    None => {}
                }
                let cond_const = match cond {
                    None => Some(true),
                    Some(cond) => {
                        current = self.expr(cond, current);
                        self.attrs.bool_const(cond.id)
                    }
                };
                let after_body = self.stmt(body, current.clone());
                if let Some(update) = update {
                    self.expr(update, after_body);
                }
                match cond_const {
                    Some(true) => None,
                    _ => current,
                }
            }
            StmtKind::Return(value) => {
                if let Some(value) = value {
                    self.expr(value, set);
                }
                None
            }
            StmtKind::LocalVar(decl) => self.local_decl(decl, set),
        }
    }

    fn local_decl(&mut self, decl: &LocalVarDecl, set: DaSet) -> DaSet {
        // The initializer is evaluated before the local becomes assigned,
        // so `int x = x + 1;` is rejected here.
        let mut set = match &decl.init {
            Some(init) => self.expr(init, set),
            None => set,
        };
        if decl.init.is_some() {
            if let Some(set) = set.as_mut() {
                set.insert(decl.id);
            }
        }
        set
    }

    /// Evaluate an expression for definite assignment: check every local
    /// read, add assignments, and return the updated set.
    fn expr(&mut self, expr: &Expr, set: DaSet) -> DaSet {
        match &expr.kind {
            ExprKind::Literal(_) | ExprKind::This => set,
            ExprKind::Name(_) => {
                self.check_read(expr, &set);
                set
            }
            ExprKind::FieldAccess { target, .. } => self.expr(target, set),
            ExprKind::ArrayAccess { array, index } => {
                let set = self.expr(array, set);
                self.expr(index, set)
            }
            ExprKind::Call { recv, args, .. } => {
                let mut set = match recv {
                    Some(recv) => self.expr(recv, set),
                    None => set,
                };
                for arg in args {
                    set = self.expr(arg, set);
                }
                set
            }
            ExprKind::New { args, .. } => {
                let mut set = set;
                for arg in args {
                    set = self.expr(arg, set);
                }
                set
            }
            ExprKind::NewArray { len, .. } => self.expr(len, set),
            ExprKind::Unary { operand, .. } => self.expr(operand, set),
            ExprKind::Binary { op, lhs, rhs } => {
                let after_lhs = self.expr(lhs, set);
                match op {
                    // The right operand runs conditionally; reads inside it
                    // are still checked, but its assignments are discarded.
                    BinaryOp::And | BinaryOp::Or => {
                        self.expr(rhs, after_lhs.clone());
                        after_lhs
                    }
                    _ => self.expr(rhs, after_lhs),
                }
            }
            ExprKind::InstanceOf { expr: operand, .. } => self.expr(operand, set),
            ExprKind::Cast { expr: operand, .. } => self.expr(operand, set),
            ExprKind::Assign { lhs, rhs } => {
                let mut set = self.expr(rhs, set);
                match &lhs.kind {
                    // A simple local target is a write, not a read.
                    ExprKind::Name(_) => {
                        let is_simple_local = self
                            .attrs
                            .names
                            .get(&lhs.id)
                            .map(|r| matches!(r.binding, Binding::Local(_) | Binding::Param(_)))
                            .unwrap_or(false)
                            && !self.attrs.chains.contains_key(&lhs.id);
                        if is_simple_local {
                            if let Some(resolution) = self.attrs.names.get(&lhs.id) {
                                if let Binding::Local(decl) = resolution.binding {
                                    if let Some(set) = set.as_mut() {
                                        set.insert(decl);
                                    }
                                }
                            }
                        } else {
                            self.check_read(lhs, &set);
                        }
                    }
                    _ => {
                        set = self.expr(lhs, set);
                    }
                }
                set
            }
        }
    }

    fn check_read(&mut self, expr: &Expr, set: &DaSet) {
        let Some(resolution) = self.attrs.names.get(&expr.id) else {
            return;
        };
        if let Binding::Local(decl) = resolution.binding {
            let assigned = match set {
                None => true,
                Some(set) => set.contains(&decl),
            };
            if !assigned {
                if let ExprKind::Name(name) = &expr.kind {
                    self.diags.error(
                        ErrorKind::DefiniteAssignment,
                        format!("variable '{}' may not have been initialized", name.ids[0]),
                        Some(expr.span),
                    );
                }
            }
        }
    }
}

fn intersect(a: DaSet, b: DaSet) -> DaSet {
    match (a, b) {
        (None, other) | (other, None) => other,
        (Some(a), Some(b)) => Some(a.intersection(&b).cloned().collect()),
    }
}
