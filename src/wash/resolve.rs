//! Resolve phase: JLS 6.5 name disambiguation.
//!
//! Every dotted name is reclassified greedily, longest expression prefix
//! first: local or parameter in the innermost scope, then a field of
//! `this` walking the superclass chain, then the shortest prefix naming a
//! type (via single imports, same package, on-demand imports), with the
//! remaining identifiers becoming field accesses typed by the attr phase.

use std::collections::HashMap;

use crate::ast::*;
use crate::common::error::{Diagnostics, ErrorKind};
use crate::wash::hierarchy::Hierarchy;
use crate::wash::{Attributes, Binding, NameResolution, Program, TypeId};

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

        for (field_index, field) in class.fields.iter().enumerate() {
            if let Some(init) = &field.init {
                let is_static = has_modifier(&field.modifiers, Modifier::Static);
                let mut resolver = Resolver::new(
                    program,
                    hierarchy,
                    attrs,
                    diags,
                    Ctx {
                        ty: id,
                        params: &[],
                        is_static,
                        field_init: Some((field_index, is_static)),
                    },
                );
                resolver.expr(init, false);
            }
        }

        for ctor in &class.constructors {
            let mut resolver = Resolver::new(
                program,
                hierarchy,
                attrs,
                diags,
                Ctx { ty: id, params: &ctor.params, is_static: false, field_init: None },
            );
            resolver.block(&ctor.body);
        }

        for method in &class.methods {
            if let Some(body) = &method.body {
                let mut resolver = Resolver::new(
                    program,
                    hierarchy,
                    attrs,
                    diags,
                    Ctx {
                        ty: id,
                        params: &method.params,
                        is_static: has_modifier(&method.modifiers, Modifier::Static),
                        field_init: None,
                    },
                );
                resolver.block(body);
            }
        }
    }
    diags.clear_file();
}

#[derive(Clone, Copy)]
struct Ctx<'a> {
    ty: TypeId,
    params: &'a [Param],
    is_static: bool,
    /// Set while resolving a field initializer: (field index, staticness),
    /// for the forward-reference rule.
    field_init: Option<(usize, bool)>,
}

struct Resolver<'a> {
    program: &'a Program,
    hierarchy: &'a Hierarchy,
    attrs: &'a mut Attributes,
    diags: &'a mut Diagnostics,
    ctx: Ctx<'a>,
    scopes: Vec<HashMap<String, Binding>>,
}

impl<'a> Resolver<'a> {
    fn new(
        program: &'a Program,
        hierarchy: &'a Hierarchy,
        attrs: &'a mut Attributes,
        diags: &'a mut Diagnostics,
        ctx: Ctx<'a>,
    ) -> Self {
        let mut param_scope = HashMap::new();
        for (i, param) in ctx.params.iter().enumerate() {
            param_scope.insert(param.name.clone(), Binding::Param(i));
        }
        Self {
            program,
            hierarchy,
            attrs,
            diags,
            ctx,
            scopes: vec![param_scope],
        }
    }

    fn block(&mut self, block: &Block) {
        self.scopes.push(HashMap::new());
        for stmt in &block.statements {
            self.stmt(stmt);
        }
        self.scopes.pop();
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Block(block) => self.block(block),
            StmtKind::Empty => {}
            StmtKind::Expr(expr) => self.expr(expr, false),
            StmtKind::If { cond, then_branch, else_branch } => {
                self.expr(cond, false);
                self.stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.stmt(else_branch);
                }
            }
            StmtKind::While { cond, body } => {
                self.expr(cond, false);
                self.stmt(body);
            }
            StmtKind::For { init, cond, update, body } => {
                // The for-init declaration scopes over the whole statement.
                self.scopes.push(HashMap::new());
                match init.as_deref() {
                    Some(ForInit::Decl(decl)) => self.local_decl(decl),
                    Some(ForInit::Expr(expr)) => self.expr(expr, false),
                    None => {}
                }
                if let Some(cond) = cond {
                    self.expr(cond, false);
                }
                if let Some(update) = update {
                    self.expr(update, false);
                }
                self.stmt(body);
                self.scopes.pop();
            }
            StmtKind::Return(value) => {
                if let Some(value) = value {
                    self.expr(value, false);
                }
            }
            StmtKind::LocalVar(decl) => self.local_decl(decl),
        }
    }

    fn local_decl(&mut self, decl: &LocalVarDecl) {
        // No two locals in overlapping scopes may share a name; parameters
        // count as the outermost scope.
        if self.scopes.iter().any(|scope| scope.contains_key(&decl.name)) {
            self.diags.error(
                ErrorKind::Environment,
                format!("local variable '{}' is already declared in an enclosing scope", decl.name),
                Some(decl.span),
            );
        }

        match self.program.resolve_type_ref(self.ctx.ty, &decl.ty.kind) {
            Ok(ty) => {
                self.attrs.local_tys.insert(decl.id, ty);
            }
            Err(message) => {
                self.diags.error(ErrorKind::Environment, message, Some(decl.ty.span));
            }
        }

        // The declarator is in scope inside its own initializer; definite
        // assignment rejects self-referencing reads.
        self.scopes
            .last_mut()
            .unwrap()
            .insert(decl.name.clone(), Binding::Local(decl.id));
        if let Some(init) = &decl.init {
            self.expr(init, false);
        }
    }

    fn expr(&mut self, expr: &Expr, write: bool) {
        match &expr.kind {
            ExprKind::Literal(_) => {}
            ExprKind::This => {
                if self.ctx.is_static {
                    self.diags.error(
                        ErrorKind::Environment,
                        "'this' cannot be used in a static context",
                        Some(expr.span),
                    );
                }
            }
            ExprKind::Name(name) => self.name(expr.id, name, expr.span, write),
            ExprKind::FieldAccess { target, .. } => self.expr(target, false),
            ExprKind::ArrayAccess { array, index } => {
                self.expr(array, false);
                self.expr(index, false);
            }
            ExprKind::Call { recv, args, .. } => {
                if let Some(recv) = recv {
                    self.expr(recv, false);
                }
                for arg in args {
                    self.expr(arg, false);
                }
            }
            ExprKind::New { args, .. } => {
                for arg in args {
                    self.expr(arg, false);
                }
            }
            ExprKind::NewArray { len, .. } => self.expr(len, false),
            ExprKind::Unary { operand, .. } => self.expr(operand, false),
            ExprKind::Binary { lhs, rhs, .. } => {
                self.expr(lhs, false);
                self.expr(rhs, false);
            }
            ExprKind::InstanceOf { expr: operand, .. } => self.expr(operand, false),
            ExprKind::Cast { expr: operand, .. } => self.expr(operand, false),
            ExprKind::Assign { lhs, rhs } => {
                self.expr(lhs, true);
                self.expr(rhs, false);
            }
        }
    }

    /// Reclassify a dotted name and record its base binding.
    fn name(&mut self, id: NodeId, name: &Name, span: crate::parser::span::Span, write: bool) {
        let ids = &name.ids;

        // 1. Local variable or parameter, innermost scope first.
        for scope in self.scopes.iter().rev() {
            if let Some(&binding) = scope.get(&ids[0]) {
                self.attrs.names.insert(id, NameResolution { binding, consumed: 1 });
                return;
            }
        }

        // 2. Field of `this`, walking the superclass chain.
        if let Some(fr) = self.hierarchy.resolve_field(self.program, self.ctx.ty, &ids[0]) {
            let field = &self.program.types[fr.owner].fields[fr.index];
            if self.ctx.is_static && !field.is_static() {
                self.diags.error(
                    ErrorKind::Environment,
                    format!("cannot access instance field '{}' in a static context", ids[0]),
                    Some(span),
                );
            }
            // A field initializer may not read a field declared later in
            // the same class (the assignment target itself is exempt).
            if let Some((init_index, init_static)) = self.ctx.field_init {
                let is_plain_write = write && ids.len() == 1;
                if fr.owner == self.ctx.ty
                    && field.is_static() == init_static
                    && field.index >= init_index
                    && !is_plain_write
                {
                    self.diags.error(
                        ErrorKind::Environment,
                        format!("illegal forward reference to field '{}'", ids[0]),
                        Some(span),
                    );
                }
            }
            let binding = if field.is_static() {
                Binding::StaticField(fr)
            } else {
                Binding::Field(fr)
            };
            self.attrs.names.insert(id, NameResolution { binding, consumed: 1 });
            return;
        }

        // 3. Shortest prefix naming a type; anything before it is a package.
        for k in 1..=ids.len() {
            let prefix = ids[..k].join(".");
            let found = if k == 1 {
                match self.program.try_resolve_simple(self.ctx.ty, &prefix) {
                    Ok(found) => found,
                    Err(message) => {
                        self.diags.error(ErrorKind::Environment, message, Some(span));
                        return;
                    }
                }
            } else {
                self.program.by_name.get(&prefix).copied()
            };

            let ty = match found {
                Some(ty) => ty,
                None => continue,
            };

            if k == ids.len() {
                self.attrs
                    .names
                    .insert(id, NameResolution { binding: Binding::Type(ty), consumed: k });
                return;
            }

            // The identifier after a type must be one of its static fields;
            // the rest of the suffix is instance accesses, typed later.
            let field_name = &ids[k];
            let fr = match self.hierarchy.resolve_field(self.program, ty, field_name) {
                Some(fr) => fr,
                None => {
                    self.diags.error(
                        ErrorKind::Environment,
                        format!(
                            "'{}' is not a field of type '{}'",
                            field_name, self.program.types[ty].name
                        ),
                        Some(span),
                    );
                    return;
                }
            };
            let field = &self.program.types[fr.owner].fields[fr.index];
            if !field.is_static() {
                self.diags.error(
                    ErrorKind::Environment,
                    format!(
                        "cannot access non-static field '{}' through type '{}'",
                        field_name, self.program.types[ty].name
                    ),
                    Some(span),
                );
                return;
            }
            if field.is_protected()
                && !self.program.same_package(self.ctx.ty, fr.owner)
                && !self.hierarchy.is_subtype(self.ctx.ty, fr.owner)
            {
                self.diags.error(
                    ErrorKind::Environment,
                    format!("protected field '{}' is not accessible here", field_name),
                    Some(span),
                );
                return;
            }
            self.attrs.names.insert(
                id,
                NameResolution { binding: Binding::StaticField(fr), consumed: k + 1 },
            );
            return;
        }

        self.diags.error(
            ErrorKind::Environment,
            format!("cannot resolve name '{}'", name.dotted()),
            Some(span),
        );
    }
}
