//! Attr phase: assign a static type to every expression, resolve method
//! and constructor overloads, and verify assignability, casts, numeric
//! promotion and access control.

use crate::ast::*;
use crate::common::error::{Diagnostics, ErrorKind};
use crate::wash::hierarchy::Hierarchy;
use crate::wash::{
    Attributes, Binding, CallResolution, ChainLink, CtorRef, FieldRef, MethodRef, Program, Ty,
    TypeId, TypeKind,
};

/// Assignability `from -> to`: identity, numeric widening
/// (`byte -> short -> int`, `char -> int`), null to any reference,
/// reference subtyping, and array covariance for reference elements.
pub fn assignable(program: &Program, hierarchy: &Hierarchy, from: &Ty, to: &Ty) -> bool {
    if from == to {
        return true;
    }
    match (from, to) {
        (Ty::Byte, Ty::Short) | (Ty::Byte, Ty::Int) | (Ty::Short, Ty::Int) | (Ty::Char, Ty::Int) => {
            true
        }
        (Ty::Null, Ty::Ref(_)) | (Ty::Null, Ty::Array(_)) => true,
        (Ty::Ref(s), Ty::Ref(t)) => hierarchy.is_subtype(*s, *t),
        (Ty::Array(_), Ty::Ref(t)) => {
            *t == program.well_known.object
                || *t == program.well_known.cloneable
                || *t == program.well_known.serializable
        }
        (Ty::Array(s), Ty::Array(t)) => match (s.as_ref(), t.as_ref()) {
            (Ty::Ref(se), Ty::Ref(te)) => hierarchy.is_subtype(*se, *te),
            _ => false,
        },
        _ => false,
    }
}

/// Cast admissibility: any numeric pair, identity booleans, and reference
/// pairs related by subtyping in either direction. An interface may be cast
/// against anything except a final class that does not implement it.
pub fn castable(program: &Program, hierarchy: &Hierarchy, from: &Ty, to: &Ty) -> bool {
    if from == to {
        return true;
    }
    if from.is_numeric() && to.is_numeric() {
        return true;
    }
    if assignable(program, hierarchy, from, to) || assignable(program, hierarchy, to, from) {
        return true;
    }
    match (from, to) {
        (Ty::Ref(s), Ty::Ref(t)) => {
            let s_info = &program.types[*s];
            let t_info = &program.types[*t];
            match (s_info.kind, t_info.kind) {
                (TypeKind::Interface, TypeKind::Interface) => true,
                (TypeKind::Interface, TypeKind::Class) => {
                    !t_info.is_final() || hierarchy.is_subtype(*t, *s)
                }
                (TypeKind::Class, TypeKind::Interface) => {
                    !s_info.is_final() || hierarchy.is_subtype(*s, *t)
                }
                (TypeKind::Class, TypeKind::Class) => false,
            }
        }
        (Ty::Array(s), Ty::Array(t)) => match (s.as_ref(), t.as_ref()) {
            (Ty::Ref(_), Ty::Ref(_)) => castable(program, hierarchy, s, t),
            _ => false,
        },
        _ => false,
    }
}

pub fn run(
    program: &Program,
    hierarchy: &Hierarchy,
    attrs: &mut Attributes,
    diags: &mut Diagnostics,
) {
    for id in 0..program.units.len() {
        diags.set_file(&program.units[id].file_name);
        let class = match &program.units[id].ty {
            TypeDeclNode::Class(class) => class,
            TypeDeclNode::Interface(_) => continue,
        };
        let info = &program.types[id];

        for (field_index, field) in class.fields.iter().enumerate() {
            if let Some(init) = &field.init {
                let field_ty = info.fields[field_index].ty.clone();
                let mut checker = Checker {
                    program,
                    hierarchy,
                    attrs: &mut *attrs,
                    diags: &mut *diags,
                    ty: id,
                    params: Vec::new(),
                    is_static: info.fields[field_index].is_static(),
                    ret: None,
                };
                if let Some(init_ty) = checker.require_value(init) {
                    checker.check_assignable(&init_ty, &field_ty, init.span, "field initializer");
                }
            }
        }

        for (ctor_index, ctor) in class.constructors.iter().enumerate() {
            let params = info
                .ctors
                .iter()
                .find(|c| c.index == Some(ctor_index))
                .map(|c| c.params.clone())
                .unwrap_or_default();
            let mut checker = Checker {
                program,
                hierarchy,
                attrs: &mut *attrs,
                diags: &mut *diags,
                ty: id,
                params,
                is_static: false,
                ret: None,
            };
            checker.block(&ctor.body);
        }

        for (method_index, method) in class.methods.iter().enumerate() {
            if let Some(body) = &method.body {
                let minfo = &info.methods[method_index];
                let mut checker = Checker {
                    program,
                    hierarchy,
                    attrs: &mut *attrs,
                    diags: &mut *diags,
                    ty: id,
                    params: minfo.params.clone(),
                    is_static: minfo.is_static(),
                    ret: Some(minfo.ret.clone()),
                };
                checker.block(body);
            }
        }
    }
    diags.clear_file();
}

struct Checker<'a> {
    program: &'a Program,
    hierarchy: &'a Hierarchy,
    attrs: &'a mut Attributes,
    diags: &'a mut Diagnostics,
    ty: TypeId,
    params: Vec<Ty>,
    is_static: bool,
    /// Declared return type; `None` inside constructors.
    ret: Option<Ty>,
}

impl<'a> Checker<'a> {
    fn error(&mut self, message: String, span: crate::parser::span::Span) {
        self.diags.error(ErrorKind::Type, message, Some(span));
    }

    fn describe(&self, ty: &Ty) -> String {
        ty.describe(self.program)
    }

    fn check_assignable(&mut self, from: &Ty, to: &Ty, span: crate::parser::span::Span, what: &str) {
        if !assignable(self.program, self.hierarchy, from, to) {
            let from = self.describe(from);
            let to = self.describe(to);
            self.error(format!("cannot convert '{from}' to '{to}' in {what}"), span);
        }
    }

    // ---- statements -------------------------------------------------------

    fn block(&mut self, block: &Block) {
        for stmt in &block.statements {
            self.stmt(stmt);
        }
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Block(block) => self.block(block),
            StmtKind::Empty => {}
            StmtKind::Expr(expr) => {
                if !matches!(
                    expr.kind,
                    ExprKind::Assign { .. } | ExprKind::Call { .. } | ExprKind::New { .. }
                ) {
                    self.error("expression is not a statement".into(), expr.span);
                }
                self.expr_ty(expr);
            }
            StmtKind::If { cond, then_branch, else_branch } => {
                self.condition(cond);
                self.stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.stmt(else_branch);
                }
            }
            StmtKind::While { cond, body } => {
                self.condition(cond);
                self.stmt(body);
            }
            StmtKind::For { init, cond, update, body } => {
                match init.as_deref() {
                    Some(ForInit::Decl(decl)) => self.local_decl(decl),
                    Some(ForInit::Expr(expr)) => {
                        self.expr_ty(expr);
                    }
                    None => {}
                }
                if let Some(cond) = cond {
                    self.condition(cond);
                }
                if let Some(update) = update {
                    self.expr_ty(update);
                }
                self.stmt(body);
            }
            StmtKind::Return(value) => {
                let ret = self.ret.clone();
                match (ret, value) {
                    (Some(ret), Some(value)) if ret != Ty::Void => {
                        if let Some(value_ty) = self.require_value(value) {
                            self.check_assignable(&value_ty, &ret, value.span, "return statement");
                        }
                    }
                    (_, Some(value)) => {
                        // Void/constructor arity already weeded; still type it.
                        self.expr_ty(value);
                    }
                    _ => {}
                }
            }
            StmtKind::LocalVar(decl) => self.local_decl(decl),
        }
    }

    fn local_decl(&mut self, decl: &LocalVarDecl) {
        let declared = self.attrs.local_tys.get(&decl.id).cloned();
        if let Some(init) = &decl.init {
            if let (Some(init_ty), Some(declared)) = (self.require_value(init), declared) {
                self.check_assignable(&init_ty, &declared, init.span, "initializer");
            }
        }
    }

    fn condition(&mut self, cond: &Expr) {
        if let Some(ty) = self.require_value(cond) {
            if ty != Ty::Boolean {
                let ty = self.describe(&ty);
                self.error(format!("condition must be boolean, found '{ty}'"), cond.span);
            }
        }
    }

    // ---- expressions ------------------------------------------------------

    /// Type an expression in a value position: `void` is rejected.
    fn require_value(&mut self, expr: &Expr) -> Option<Ty> {
        let ty = self.expr_ty(expr)?;
        if ty == Ty::Void {
            self.error("void expression used as a value".into(), expr.span);
            return None;
        }
        Some(ty)
    }

    /// Type an expression, recording the result. Returns `None` after
    /// reporting an error (or when a sub-expression already failed).
    fn expr_ty(&mut self, expr: &Expr) -> Option<Ty> {
        let ty = self.compute_ty(expr)?;
        self.attrs.expr_tys.insert(expr.id, ty.clone());
        Some(ty)
    }

    fn compute_ty(&mut self, expr: &Expr) -> Option<Ty> {
        match &expr.kind {
            ExprKind::Literal(lit) => Some(match lit {
                Literal::Int(_) => Ty::Int,
                Literal::Bool(_) => Ty::Boolean,
                Literal::Char(_) => Ty::Char,
                Literal::Str(_) => Ty::Ref(self.program.well_known.string),
                Literal::Null => Ty::Null,
            }),
            ExprKind::This => Some(Ty::Ref(self.ty)),
            ExprKind::Name(name) => self.name_ty(expr, name),
            ExprKind::FieldAccess { target, name } => {
                let target_ty = self.require_value(target)?;
                let (link, ty) = self.field_link(&target_ty, name, expr.span)?;
                self.attrs.chains.insert(expr.id, vec![link]);
                Some(ty)
            }
            ExprKind::ArrayAccess { array, index } => {
                let array_ty = self.require_value(array)?;
                if let Some(index_ty) = self.require_value(index) {
                    if !index_ty.is_numeric() {
                        let index_ty = self.describe(&index_ty);
                        self.error(format!("array index must be numeric, found '{index_ty}'"), index.span);
                    }
                }
                match array_ty {
                    Ty::Array(elem) => Some(*elem),
                    other => {
                        let other = self.describe(&other);
                        self.error(format!("cannot index non-array type '{other}'"), array.span);
                        None
                    }
                }
            }
            ExprKind::Call { recv, name, args } => self.call_ty(expr, recv.as_deref(), name, args),
            ExprKind::New { ty, args } => self.new_ty(expr, ty, args),
            ExprKind::NewArray { elem, len } => {
                if let Some(len_ty) = self.require_value(len) {
                    if !len_ty.is_numeric() {
                        let len_ty = self.describe(&len_ty);
                        self.error(format!("array size must be numeric, found '{len_ty}'"), len.span);
                    }
                }
                let elem_ty = self.resolve_ty(&elem.kind, elem.span)?;
                self.attrs.type_operands.insert(expr.id, elem_ty.clone());
                Some(Ty::Array(Box::new(elem_ty)))
            }
            ExprKind::Unary { op, operand } => {
                let operand_ty = self.require_value(operand)?;
                match op {
                    UnaryOp::Minus => {
                        if !operand_ty.is_numeric() {
                            let operand_ty = self.describe(&operand_ty);
                            self.error(format!("cannot negate '{operand_ty}'"), operand.span);
                            return None;
                        }
                        Some(Ty::Int)
                    }
                    UnaryOp::Not => {
                        if operand_ty != Ty::Boolean {
                            let operand_ty = self.describe(&operand_ty);
                            self.error(format!("'!' requires a boolean, found '{operand_ty}'"), operand.span);
                            return None;
                        }
                        Some(Ty::Boolean)
                    }
                }
            }
            ExprKind::Binary { op, lhs, rhs } => self.binary_ty(*op, lhs, rhs, expr.span),
            ExprKind::InstanceOf { expr: operand, ty } => {
                let operand_ty = self.require_value(operand)?;
                let target = self.resolve_ty(&ty.kind, ty.span)?;
                if !operand_ty.is_reference() {
                    let operand_ty = self.describe(&operand_ty);
                    self.error(
                        format!("left side of instanceof must be a reference, found '{operand_ty}'"),
                        operand.span,
                    );
                    return None;
                }
                if !target.is_reference() {
                    let target = self.describe(&target);
                    self.error(format!("instanceof target must be a reference type, found '{target}'"), ty.span);
                    return None;
                }
                if !castable(self.program, self.hierarchy, &operand_ty, &target) {
                    let operand_ty = self.describe(&operand_ty);
                    let target_name = self.describe(&target);
                    self.error(
                        format!("'{operand_ty}' can never be an instance of '{target_name}'"),
                        expr.span,
                    );
                }
                self.attrs.type_operands.insert(expr.id, target);
                Some(Ty::Boolean)
            }
            ExprKind::Cast { ty, expr: operand } => {
                let operand_ty = self.require_value(operand)?;
                let target = self.resolve_ty(&ty.kind, ty.span)?;
                let ok = (operand_ty.is_numeric() && target.is_numeric())
                    || (operand_ty == Ty::Boolean && target == Ty::Boolean)
                    || (operand_ty.is_reference()
                        && target.is_reference()
                        && castable(self.program, self.hierarchy, &operand_ty, &target));
                if !ok {
                    let operand_ty = self.describe(&operand_ty);
                    let target_name = self.describe(&target);
                    self.error(format!("cannot cast '{operand_ty}' to '{target_name}'"), expr.span);
                    return None;
                }
                self.attrs.type_operands.insert(expr.id, target.clone());
                Some(target)
            }
            ExprKind::Assign { lhs, rhs } => {
                let lhs_ty = self.lvalue_ty(lhs)?;
                let rhs_ty = self.require_value(rhs)?;
                self.check_assignable(&rhs_ty, &lhs_ty, expr.span, "assignment");
                Some(lhs_ty)
            }
        }
    }

    fn binary_ty(
        &mut self,
        op: BinaryOp,
        lhs: &Expr,
        rhs: &Expr,
        span: crate::parser::span::Span,
    ) -> Option<Ty> {
        let lhs_ty = self.require_value(lhs)?;
        let rhs_ty = self.require_value(rhs)?;
        let string = Ty::Ref(self.program.well_known.string);

        match op {
            BinaryOp::Add if lhs_ty == string || rhs_ty == string => Some(string),
            BinaryOp::Add
            | BinaryOp::Sub
            | BinaryOp::Mul
            | BinaryOp::Div
            | BinaryOp::Rem => {
                if !lhs_ty.is_numeric() || !rhs_ty.is_numeric() {
                    self.binary_op_error(op, &lhs_ty, &rhs_ty, span);
                    return None;
                }
                Some(Ty::Int)
            }
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                if !lhs_ty.is_numeric() || !rhs_ty.is_numeric() {
                    self.binary_op_error(op, &lhs_ty, &rhs_ty, span);
                    return None;
                }
                Some(Ty::Boolean)
            }
            BinaryOp::Eq | BinaryOp::Ne => {
                let ok = (lhs_ty.is_numeric() && rhs_ty.is_numeric())
                    || (lhs_ty == Ty::Boolean && rhs_ty == Ty::Boolean)
                    || (lhs_ty.is_reference()
                        && rhs_ty.is_reference()
                        && (assignable(self.program, self.hierarchy, &lhs_ty, &rhs_ty)
                            || assignable(self.program, self.hierarchy, &rhs_ty, &lhs_ty)));
                if !ok {
                    self.binary_op_error(op, &lhs_ty, &rhs_ty, span);
                    return None;
                }
                Some(Ty::Boolean)
            }
            BinaryOp::And | BinaryOp::Or | BinaryOp::EagerAnd | BinaryOp::EagerOr => {
                if lhs_ty != Ty::Boolean || rhs_ty != Ty::Boolean {
                    self.binary_op_error(op, &lhs_ty, &rhs_ty, span);
                    return None;
                }
                Some(Ty::Boolean)
            }
        }
    }

    fn binary_op_error(&mut self, op: BinaryOp, lhs: &Ty, rhs: &Ty, span: crate::parser::span::Span) {
        let lhs = self.describe(lhs);
        let rhs = self.describe(rhs);
        self.error(format!("operator '{op}' cannot be applied to '{lhs}', '{rhs}'"), span);
    }

    // ---- names and field chains -------------------------------------------

    fn name_ty(&mut self, expr: &Expr, name: &Name) -> Option<Ty> {
        let resolution = *self.attrs.names.get(&expr.id)?;
        let mut ty = match resolution.binding {
            Binding::Local(decl) => self.attrs.local_tys.get(&decl)?.clone(),
            Binding::Param(i) => self.params.get(i)?.clone(),
            Binding::Field(fr) | Binding::StaticField(fr) => {
                self.program.types[fr.owner].fields[fr.index].ty.clone()
            }
            Binding::Type(_) => {
                self.error(format!("type name '{}' used as an expression", name.dotted()), expr.span);
                return None;
            }
        };

        let mut links = Vec::new();
        for id in &name.ids[resolution.consumed..] {
            let (link, next) = self.field_link(&ty, id, expr.span)?;
            links.push(link);
            ty = next;
        }
        if !links.is_empty() {
            self.attrs.chains.insert(expr.id, links);
        }
        Some(ty)
    }

    /// One step of instance field access on a receiver of type `base`.
    fn field_link(
        &mut self,
        base: &Ty,
        name: &str,
        span: crate::parser::span::Span,
    ) -> Option<(ChainLink, Ty)> {
        match base {
            Ty::Array(_) if name == "length" => Some((ChainLink::ArrayLength, Ty::Int)),
            Ty::Ref(t) => {
                let fr = match self.hierarchy.resolve_field(self.program, *t, name) {
                    Some(fr) => fr,
                    None => {
                        let base = self.describe(base);
                        self.error(format!("no field '{name}' in type '{base}'"), span);
                        return None;
                    }
                };
                let field = &self.program.types[fr.owner].fields[fr.index];
                if field.is_static() {
                    self.error(
                        format!("cannot access static field '{name}' through an instance"),
                        span,
                    );
                    return None;
                }
                if field.is_protected() && !self.accessible_instance_member(fr.owner, *t) {
                    self.error(format!("protected field '{name}' is not accessible here"), span);
                    return None;
                }
                Some((ChainLink::Field(fr), field.ty.clone()))
            }
            other => {
                let other = self.describe(other);
                self.error(format!("type '{other}' has no field '{name}'"), span);
                None
            }
        }
    }

    /// Protected instance member accessibility: same package, or the
    /// accessing class is a subclass of the declaring class and the
    /// receiver's static type is the accessing class or one of its
    /// subtypes.
    fn accessible_instance_member(&self, declaring: TypeId, receiver: TypeId) -> bool {
        self.program.same_package(self.ty, declaring)
            || (self.hierarchy.is_subtype(self.ty, declaring)
                && self.hierarchy.is_subtype(receiver, self.ty))
    }

    fn accessible_static_member(&self, declaring: TypeId) -> bool {
        self.program.same_package(self.ty, declaring)
            || self.hierarchy.is_subtype(self.ty, declaring)
    }

    // ---- assignment targets -----------------------------------------------

    fn lvalue_ty(&mut self, lhs: &Expr) -> Option<Ty> {
        let ty = self.expr_ty(lhs)?;
        match &lhs.kind {
            ExprKind::Name(name) => {
                let resolution = *self.attrs.names.get(&lhs.id)?;
                if matches!(resolution.binding, Binding::Type(_)) {
                    self.error(format!("cannot assign to type '{}'", name.dotted()), lhs.span);
                    return None;
                }
                match self.attrs.chains.get(&lhs.id).and_then(|c| c.last()) {
                    Some(ChainLink::ArrayLength) => {
                        self.error("cannot assign to the length of an array".into(), lhs.span);
                        None
                    }
                    Some(ChainLink::Field(fr)) => {
                        self.check_final_field(*fr, lhs.span)?;
                        Some(ty)
                    }
                    None => {
                        if let Binding::Field(fr) | Binding::StaticField(fr) = resolution.binding {
                            self.check_final_field(fr, lhs.span)?;
                        }
                        Some(ty)
                    }
                }
            }
            ExprKind::FieldAccess { .. } => {
                match self.attrs.chains.get(&lhs.id).and_then(|c| c.last()) {
                    Some(ChainLink::ArrayLength) => {
                        self.error("cannot assign to the length of an array".into(), lhs.span);
                        None
                    }
                    Some(ChainLink::Field(fr)) => {
                        self.check_final_field(*fr, lhs.span)?;
                        Some(ty)
                    }
                    None => Some(ty),
                }
            }
            ExprKind::ArrayAccess { .. } => Some(ty),
            _ => {
                self.error("left-hand side of assignment is not a variable".into(), lhs.span);
                None
            }
        }
    }

    fn check_final_field(&mut self, fr: FieldRef, span: crate::parser::span::Span) -> Option<()> {
        let field = &self.program.types[fr.owner].fields[fr.index];
        if field.is_final() {
            let name = field.name.clone();
            self.error(format!("cannot assign to final field '{name}'"), span);
            return None;
        }
        Some(())
    }

    // ---- invocations ------------------------------------------------------

    fn call_ty(
        &mut self,
        expr: &Expr,
        recv: Option<&Expr>,
        name: &str,
        args: &[Expr],
    ) -> Option<Ty> {
        let mut arg_tys = Vec::with_capacity(args.len());
        for arg in args {
            arg_tys.push(self.require_value(arg)?);
        }

        // Classify the receiver: implicit this, a type (static call), or a
        // value expression.
        enum Recv {
            Implicit,
            Static(TypeId),
            Value(TypeId),
        }

        let receiver = match recv {
            None => Recv::Implicit,
            Some(r) => {
                let as_type = match &r.kind {
                    ExprKind::Name(n) => {
                        let resolution = self.attrs.names.get(&r.id).copied();
                        match resolution {
                            Some(res)
                                if matches!(res.binding, Binding::Type(_))
                                    && res.consumed == n.ids.len() =>
                            {
                                match res.binding {
                                    Binding::Type(t) => Some(t),
                                    _ => unreachable!(),
                                }
                            }
                            _ => None,
                        }
                    }
                    _ => None,
                };
                match as_type {
                    Some(t) => Recv::Static(t),
                    None => {
                        let recv_ty = self.require_value(r)?;
                        match recv_ty {
                            Ty::Ref(t) => Recv::Value(t),
                            // Arrays only understand Object's methods.
                            Ty::Array(_) => Recv::Value(self.program.well_known.object),
                            other => {
                                let other = self.describe(&other);
                                self.error(
                                    format!("cannot invoke a method on type '{other}'"),
                                    r.span,
                                );
                                return None;
                            }
                        }
                    }
                }
            }
        };

        let (search_ty, want_static, recv_static_ty) = match &receiver {
            Recv::Implicit => (self.ty, None, self.ty),
            Recv::Static(t) => (*t, Some(true), *t),
            Recv::Value(t) => (*t, Some(false), *t),
        };

        if matches!(receiver, Recv::Static(_)) && !self.program.types[search_ty].is_class() {
            let name = &self.program.types[search_ty].name;
            self.error(format!("cannot call a static method on interface '{name}'"), expr.span);
            return None;
        }

        let candidates = self.hierarchy.methods_named(search_ty, name);
        let chosen = self.select_overload(&candidates, &arg_tys, name, expr.span)?;
        let chosen_info = &self.program.types[chosen.owner].methods[chosen.index];
        let is_static = chosen_info.is_static();
        let ret = chosen_info.ret.clone();
        let is_protected = chosen_info.is_protected();

        match want_static {
            Some(true) if !is_static => {
                self.error(format!("'{name}' is not a static method"), expr.span);
                return None;
            }
            Some(false) if is_static => {
                self.error(
                    format!("static method '{name}' cannot be called through an instance"),
                    expr.span,
                );
                return None;
            }
            None if !is_static && self.is_static => {
                self.error(
                    format!("cannot call instance method '{name}' from a static context"),
                    expr.span,
                );
                return None;
            }
            _ => {}
        }

        if is_protected {
            let accessible = if is_static {
                self.accessible_static_member(chosen.owner)
            } else {
                self.accessible_instance_member(chosen.owner, recv_static_ty)
            };
            if !accessible {
                self.error(format!("protected method '{name}' is not accessible here"), expr.span);
                return None;
            }
        }

        self.attrs.calls.insert(expr.id, CallResolution { method: chosen, is_static });
        Some(ret)
    }

    /// Overload selection: gather applicable methods, then choose the
    /// unique most specific one.
    fn select_overload(
        &mut self,
        candidates: &[MethodRef],
        arg_tys: &[Ty],
        name: &str,
        span: crate::parser::span::Span,
    ) -> Option<MethodRef> {
        let applicable: Vec<MethodRef> = candidates
            .iter()
            .copied()
            .filter(|m| {
                let params = &self.program.types[m.owner].methods[m.index].params;
                params.len() == arg_tys.len()
                    && arg_tys
                        .iter()
                        .zip(params)
                        .all(|(a, p)| assignable(self.program, self.hierarchy, a, p))
            })
            .collect();

        match applicable.len() {
            0 => {
                self.error(format!("no applicable method '{name}' for the given arguments"), span);
                None
            }
            1 => Some(applicable[0]),
            _ => {
                let most_specific: Vec<MethodRef> = applicable
                    .iter()
                    .copied()
                    .filter(|m| {
                        applicable.iter().all(|o| {
                            m == o || self.more_specific_method(*m, *o)
                        })
                    })
                    .collect();
                // Identical signatures (an override collapses to one slot in
                // the contains set, but statics may repeat) tie harmlessly.
                let unique: Option<MethodRef> = match most_specific.as_slice() {
                    [] => None,
                    [only] => Some(*only),
                    [first, rest @ ..] => {
                        let sig = self.program.types[first.owner].methods[first.index].sig();
                        rest.iter()
                            .all(|m| self.program.types[m.owner].methods[m.index].sig() == sig)
                            .then_some(*first)
                    }
                };
                match unique {
                    Some(m) => Some(m),
                    None => {
                        self.error(format!("ambiguous method invocation '{name}'"), span);
                        None
                    }
                }
            }
        }
    }

    fn more_specific_method(&self, m: MethodRef, o: MethodRef) -> bool {
        let mp = &self.program.types[m.owner].methods[m.index].params;
        let op = &self.program.types[o.owner].methods[o.index].params;
        mp.iter()
            .zip(op)
            .all(|(a, b)| assignable(self.program, self.hierarchy, a, b))
    }

    fn new_ty(&mut self, expr: &Expr, ty: &TypeRef, args: &[Expr]) -> Option<Ty> {
        let mut arg_tys = Vec::with_capacity(args.len());
        for arg in args {
            arg_tys.push(self.require_value(arg)?);
        }

        let target = self.resolve_ty(&ty.kind, ty.span)?;
        let class = match target {
            Ty::Ref(t) => t,
            other => {
                let other = self.describe(&other);
                self.error(format!("cannot instantiate '{other}'"), ty.span);
                return None;
            }
        };
        let info = &self.program.types[class];
        if !info.is_class() {
            let name = info.name.clone();
            self.error(format!("cannot instantiate interface '{name}'"), ty.span);
            return None;
        }
        if info.is_abstract() {
            let name = info.name.clone();
            self.error(format!("cannot instantiate abstract class '{name}'"), ty.span);
            return None;
        }

        let applicable: Vec<usize> = info
            .ctors
            .iter()
            .enumerate()
            .filter(|(_, c)| {
                c.params.len() == arg_tys.len()
                    && arg_tys
                        .iter()
                        .zip(&c.params)
                        .all(|(a, p)| assignable(self.program, self.hierarchy, a, p))
            })
            .map(|(i, _)| i)
            .collect();

        let chosen = match applicable.len() {
            0 => {
                let name = info.name.clone();
                self.error(format!("no applicable constructor for '{name}'"), expr.span);
                return None;
            }
            1 => applicable[0],
            _ => {
                let most_specific: Vec<usize> = applicable
                    .iter()
                    .copied()
                    .filter(|&i| {
                        applicable.iter().all(|&o| {
                            i == o || {
                                let ip = &info.ctors[i].params;
                                let op = &info.ctors[o].params;
                                ip.iter().zip(op).all(|(a, b)| {
                                    assignable(self.program, self.hierarchy, a, b)
                                })
                            }
                        })
                    })
                    .collect();
                match most_specific.as_slice() {
                    [only] => *only,
                    _ => {
                        let name = info.name.clone();
                        self.error(format!("ambiguous constructor invocation for '{name}'"), expr.span);
                        return None;
                    }
                }
            }
        };

        // A protected constructor is only reachable from the same package.
        if info.ctors[chosen].is_protected() && !self.program.same_package(self.ty, class) {
            let name = info.name.clone();
            self.error(format!("protected constructor of '{name}' is not accessible here"), expr.span);
            return None;
        }

        self.attrs.ctor_calls.insert(expr.id, CtorRef { owner: class, index: chosen });
        Some(Ty::Ref(class))
    }

    fn resolve_ty(&mut self, kind: &TypeRefKind, span: crate::parser::span::Span) -> Option<Ty> {
        match self.program.resolve_type_ref(self.ty, kind) {
            Ok(ty) => Some(ty),
            Err(message) => {
                self.diags.error(ErrorKind::Environment, message, Some(span));
                None
            }
        }
    }
}
