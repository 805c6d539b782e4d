//! IR lowering: translate typed ASTs into the canonical three-address IR.
//!
//! Per class this emits a static-field initializer function, one function
//! per constructor (chaining the super constructor, zeroing the class's own
//! instance fields, running field initializers, then the body), and one
//! function per concrete method. Expressions with folded constants lower
//! directly to immediates; unreachable statements are pruned.

use std::collections::HashMap;

use crate::ast::*;
use crate::codegen::ir::*;
use crate::codegen::layout::{self, ElemKey, Layout, ARRAY_DATA_OFFSET};
use crate::common::consts::{ARRAY_LENGTH_OFFSET, RT_EXCEPTION, RT_MALLOC, WORD};
use crate::wash::attr::assignable;
use crate::wash::hierarchy::Hierarchy;
use crate::wash::{
    Attributes, Binding, Const, CtorRef, FieldRef, MethodRef, Program, Ty, TypeId,
};

/// Label of the per-function exception trampoline.
const ERR_LABEL: &str = ".err";

pub fn lower_program(
    program: &Program,
    hierarchy: &Hierarchy,
    attrs: &Attributes,
    layout: &Layout,
) -> Vec<IrUnit> {
    (0..program.units.len())
        .map(|unit| lower_unit(program, hierarchy, attrs, layout, unit))
        .collect()
}

fn lower_unit(
    program: &Program,
    hierarchy: &Hierarchy,
    attrs: &Attributes,
    layout: &Layout,
    unit: TypeId,
) -> IrUnit {
    let info = &program.types[unit];
    let mut strings = Strings {
        unit,
        list: Vec::new(),
        map: HashMap::new(),
    };
    let mut functions = Vec::new();
    let mut static_fields = Vec::new();
    let mut init_label = None;

    if let TypeDeclNode::Class(class) = &program.units[unit].ty {
        // Static initializer: every static field initializer in
        // declaration order.
        let label = layout::init_label(program, unit);
        let mut f = FnLower::new(program, hierarchy, attrs, layout, &mut strings, 0);
        for (index, field) in class.fields.iter().enumerate() {
            let finfo = &info.fields[index];
            if finfo.is_static() {
                static_fields.push(layout::static_field_label(
                    program,
                    FieldRef { owner: unit, index },
                ));
                if let Some(init) = &field.init {
                    let value = f.expr_value(init);
                    f.emit(Instr::Store {
                        base: Value::Name(layout::static_field_label(
                            program,
                            FieldRef { owner: unit, index },
                        )),
                        offset: 0,
                        src: value,
                    });
                }
            }
        }
        f.emit(Instr::Return(None));
        functions.push(f.finish(label.clone()));
        init_label = Some(label);

        for (index, ctor) in class.constructors.iter().enumerate() {
            functions.push(lower_ctor(
                program, hierarchy, attrs, layout, &mut strings, unit, class, index, ctor,
            ));
        }
        // A class with no declared constructor still gets the implicit
        // default one.
        if class.constructors.is_empty() {
            functions.push(lower_implicit_ctor(
                program, hierarchy, attrs, layout, &mut strings, unit, class,
            ));
        }

        for (index, method) in class.methods.iter().enumerate() {
            if let Some(body) = &method.body {
                let minfo = &info.methods[index];
                let this_params = if minfo.is_static() { 0 } else { 1 };
                let num_params = this_params + minfo.params.len();
                let mut f =
                    FnLower::new(program, hierarchy, attrs, layout, &mut strings, num_params);
                f.this = (!minfo.is_static()).then_some(0);
                f.params = (this_params as Temp..num_params as Temp).collect();
                f.block(body);
                f.emit(Instr::Return(None));
                functions.push(f.finish(layout::method_label(
                    program,
                    MethodRef { owner: unit, index },
                )));
            }
        }
    }

    IrUnit {
        unit,
        class_name: info.name.clone(),
        is_class: info.is_class(),
        functions,
        init_label,
        static_fields,
        strings: strings.list,
    }
}

#[allow(clippy::too_many_arguments)]
fn lower_ctor(
    program: &Program,
    hierarchy: &Hierarchy,
    attrs: &Attributes,
    layout: &Layout,
    strings: &mut Strings,
    unit: TypeId,
    class: &ClassDecl,
    ctor_index: usize,
    ctor: &ConstructorDecl,
) -> IrFunction {
    let sem_index = program.types[unit]
        .ctors
        .iter()
        .position(|c| c.index == Some(ctor_index))
        .expect("constructor entry");
    let num_params = 1 + ctor.params.len();
    let mut f = FnLower::new(program, hierarchy, attrs, layout, strings, num_params);
    f.this = Some(0);
    f.params = (1..num_params as Temp).collect();

    emit_ctor_preamble(&mut f, program, layout, unit, class);
    f.block(&ctor.body);
    f.emit(Instr::Return(None));
    f.finish(layout::ctor_label(program, CtorRef { owner: unit, index: sem_index }))
}

fn lower_implicit_ctor(
    program: &Program,
    hierarchy: &Hierarchy,
    attrs: &Attributes,
    layout: &Layout,
    strings: &mut Strings,
    unit: TypeId,
    class: &ClassDecl,
) -> IrFunction {
    let mut f = FnLower::new(program, hierarchy, attrs, layout, strings, 1);
    f.this = Some(0);
    emit_ctor_preamble(&mut f, program, layout, unit, class);
    f.emit(Instr::Return(None));
    f.finish(layout::ctor_label(program, CtorRef { owner: unit, index: 0 }))
}

/// Shared constructor prologue: chain the zero-argument super constructor,
/// zero the class's own instance fields, then run its field initializers in
/// declaration order.
fn emit_ctor_preamble(
    f: &mut FnLower,
    program: &Program,
    layout: &Layout,
    unit: TypeId,
    class: &ClassDecl,
) {
    let this = Value::Temp(0);

    if let Some(sup) = f.hierarchy.superclass[unit] {
        let index = program.types[sup]
            .ctors
            .iter()
            .position(|c| c.params.is_empty())
            .expect("zero-argument super constructor was checked");
        f.emit(Instr::Call {
            dst: None,
            target: CallTarget::Label(layout::ctor_label(
                program,
                CtorRef { owner: sup, index },
            )),
            args: vec![this.clone()],
        });
    }

    for (index, _) in class.fields.iter().enumerate() {
        let finfo = &program.types[unit].fields[index];
        if !finfo.is_static() {
            let offset = layout.field_offset(FieldRef { owner: unit, index });
            f.emit(Instr::Store { base: this.clone(), offset, src: Value::Const(0) });
        }
    }

    for (index, field) in class.fields.iter().enumerate() {
        let finfo = &program.types[unit].fields[index];
        if !finfo.is_static() {
            if let Some(init) = &field.init {
                let value = f.expr_value(init);
                let offset = layout.field_offset(FieldRef { owner: unit, index });
                f.emit(Instr::Store { base: this.clone(), offset, src: value });
            }
        }
    }
}

/// Per-unit string literal table.
struct Strings {
    unit: usize,
    list: Vec<StringLit>,
    map: HashMap<String, usize>,
}

impl Strings {
    fn intern(&mut self, value: &str) -> String {
        if let Some(&index) = self.map.get(value) {
            return self.list[index].object_label.clone();
        }
        let index = self.list.len();
        let lit = StringLit {
            object_label: layout::string_object_label(self.unit, index),
            chars_label: layout::string_chars_label(self.unit, index),
            value: value.to_string(),
        };
        self.map.insert(value.to_string(), index);
        let label = lit.object_label.clone();
        self.list.push(lit);
        label
    }
}

struct FnLower<'a> {
    program: &'a Program,
    hierarchy: &'a Hierarchy,
    attrs: &'a Attributes,
    layout: &'a Layout,
    strings: &'a mut Strings,
    body: Vec<Instr>,
    next_temp: Temp,
    next_label: u32,
    num_params: usize,
    /// Declaring statement id -> temp.
    locals: HashMap<NodeId, Temp>,
    /// Declared parameter index -> temp.
    params: Vec<Temp>,
    this: Option<Temp>,
    used_err: bool,
}

impl<'a> FnLower<'a> {
    fn new(
        program: &'a Program,
        hierarchy: &'a Hierarchy,
        attrs: &'a Attributes,
        layout: &'a Layout,
        strings: &'a mut Strings,
        num_params: usize,
    ) -> Self {
        Self {
            program,
            hierarchy,
            attrs,
            layout,
            strings,
            body: Vec::new(),
            next_temp: num_params as Temp,
            next_label: 0,
            num_params,
            locals: HashMap::new(),
            params: Vec::new(),
            this: None,
            used_err: false,
        }
    }

    fn finish(mut self, label: String) -> IrFunction {
        if self.used_err {
            self.body.push(Instr::Label(ERR_LABEL.to_string()));
            self.body.push(Instr::Call {
                dst: None,
                target: CallTarget::Label(RT_EXCEPTION.to_string()),
                args: Vec::new(),
            });
        }
        IrFunction {
            label,
            num_params: self.num_params,
            body: self.body,
            next_temp: self.next_temp,
        }
    }

    fn emit(&mut self, instr: Instr) {
        self.body.push(instr);
    }

    fn temp(&mut self) -> Temp {
        let t = self.next_temp;
        self.next_temp += 1;
        t
    }

    fn fresh_label(&mut self) -> String {
        let l = format!(".L{}", self.next_label);
        self.next_label += 1;
        l
    }

    fn err_label(&mut self) -> String {
        self.used_err = true;
        ERR_LABEL.to_string()
    }

    /// Copy a value into a fresh temp when it could be clobbered by later
    /// evaluation (locals and parameters are mutable storage).
    fn materialize(&mut self, value: Value) -> Value {
        match value {
            Value::Temp(_) => {
                let t = self.temp();
                self.emit(Instr::Move { dst: t, src: value });
                Value::Temp(t)
            }
            other => other,
        }
    }

    // ---- statements -------------------------------------------------------

    fn block(&mut self, block: &Block) {
        for stmt in &block.statements {
            self.stmt(stmt);
        }
    }

    fn stmt(&mut self, stmt: &Stmt) {
        // Reachability-based dead-code pruning.
        if let Some(flags) = self.attrs.stmt_flags.get(&stmt.id) {
            if !flags.reachable {
                return;
            }
        }

        match &stmt.kind {
            StmtKind::Block(block) => self.block(block),
            StmtKind::Empty => {}
            StmtKind::Expr(expr) => {
                self.expr_value(expr);
            }
            StmtKind::If { cond, then_branch, else_branch } => match else_branch {
                None => {
                    let lt = self.fresh_label();
                    let lend = self.fresh_label();
                    self.cond(cond, &lt, &lend);
                    self.emit(Instr::Label(lt));
                    self.stmt(then_branch);
                    self.emit(Instr::Label(lend));
                }
                Some(else_branch) => {
                    let lt = self.fresh_label();
                    let lf = self.fresh_label();
                    let lend = self.fresh_label();
                    self.cond(cond, &lt, &lf);
                    self.emit(Instr::Label(lt));
                    self.stmt(then_branch);
                    self.emit(Instr::Jump(lend.clone()));
                    self.emit(Instr::Label(lf));
                    self.stmt(else_branch);
                    self.emit(Instr::Label(lend));
                }
            },
            StmtKind::While { cond, body } => {
                let lcond = self.fresh_label();
                let lbody = self.fresh_label();
                let lend = self.fresh_label();
                self.emit(Instr::Label(lcond.clone()));
                self.cond(cond, &lbody, &lend);
                self.emit(Instr::Label(lbody));
                self.stmt(body);
                self.emit(Instr::Jump(lcond));
                self.emit(Instr::Label(lend));
            }
            StmtKind::For { init, cond, update, body } => {
                match init.as_deref() {
                    Some(ForInit::Decl(decl)) => self.local_decl(decl),
                    Some(ForInit::Expr(expr)) => {
                        self.expr_value(expr);
                    }
                    None => {}
                }
                let lcond = self.fresh_label();
                let lbody = self.fresh_label();
                let lend = self.fresh_label();
                self.emit(Instr::Label(lcond.clone()));
                match cond {
                    Some(cond) => self.cond(cond, &lbody, &lend),
                    None => self.emit(Instr::Jump(lbody.clone())),
                }
                self.emit(Instr::Label(lbody));
                self.stmt(body);
                if let Some(update) = update {
                    self.expr_value(update);
                }
                self.emit(Instr::Jump(lcond));
                self.emit(Instr::Label(lend));
            }
            StmtKind::Return(value) => {
                let value = value.as_ref().map(|v| self.expr_value(v));
                self.emit(Instr::Return(value));
            }
            StmtKind::LocalVar(decl) => self.local_decl(decl),
        }
    }

    fn local_decl(&mut self, decl: &LocalVarDecl) {
        let t = self.temp();
        self.locals.insert(decl.id, t);
        if let Some(init) = &decl.init {
            let value = self.expr_value(init);
            self.emit(Instr::Move { dst: t, src: value });
        }
    }

    // ---- conditions -------------------------------------------------------

    /// Lower a boolean expression as control flow into explicit branches.
    fn cond(&mut self, expr: &Expr, if_true: &str, if_false: &str) {
        if let Some(Const::Bool(b)) = self.attrs.consts.get(&expr.id) {
            let target = if *b { if_true } else { if_false };
            self.emit(Instr::Jump(target.to_string()));
            return;
        }

        match &expr.kind {
            ExprKind::Unary { op: UnaryOp::Not, operand } => {
                self.cond(operand, if_false, if_true)
            }
            ExprKind::Binary { op: BinaryOp::And, lhs, rhs } => {
                let mid = self.fresh_label();
                self.cond(lhs, &mid, if_false);
                self.emit(Instr::Label(mid));
                self.cond(rhs, if_true, if_false);
            }
            ExprKind::Binary { op: BinaryOp::Or, lhs, rhs } => {
                let mid = self.fresh_label();
                self.cond(lhs, if_true, &mid);
                self.emit(Instr::Label(mid));
                self.cond(rhs, if_true, if_false);
            }
            ExprKind::Binary { op, lhs, rhs } if op.is_comparison() => {
                let lhs_v = {
                    let v = self.expr_value(lhs);
                    self.materialize(v)
                };
                let rhs_v = self.expr_value(rhs);
                let t = self.temp();
                self.emit(Instr::Bin { dst: t, op: comparison_op(*op), lhs: lhs_v, rhs: rhs_v });
                self.emit(Instr::CJump {
                    cond: Value::Temp(t),
                    if_true: if_true.to_string(),
                    if_false: if_false.to_string(),
                });
            }
            _ => {
                let v = self.expr_value(expr);
                self.emit(Instr::CJump {
                    cond: v,
                    if_true: if_true.to_string(),
                    if_false: if_false.to_string(),
                });
            }
        }
    }

    // ---- expressions ------------------------------------------------------

    fn const_value(&mut self, value: &Const) -> Value {
        match value {
            Const::Int(v) => Value::Const(*v),
            Const::Bool(b) => Value::Const(*b as i32),
            Const::Null => Value::Const(0),
            Const::Str(s) => Value::Name(self.strings.intern(s)),
        }
    }

    fn expr_value(&mut self, expr: &Expr) -> Value {
        // Constant substitution: folded expressions become immediates, but
        // assignments and calls keep their effects.
        if !matches!(expr.kind, ExprKind::Assign { .. } | ExprKind::Call { .. }) {
            if let Some(value) = self.attrs.consts.get(&expr.id).cloned() {
                return self.const_value(&value);
            }
        }

        match &expr.kind {
            ExprKind::Literal(lit) => match lit {
                Literal::Int(magnitude) => Value::Const(*magnitude as u32 as i32),
                Literal::Bool(b) => Value::Const(*b as i32),
                Literal::Char(c) => Value::Const(*c as i32),
                Literal::Str(s) => Value::Name(self.strings.intern(s)),
                Literal::Null => Value::Const(0),
            },
            ExprKind::This => Value::Temp(self.this.expect("this in instance context")),
            ExprKind::Name(name) => self.name_value(expr, name),
            ExprKind::FieldAccess { target, .. } => {
                let base = self.expr_value(target);
                self.chain_loads(expr.id, base)
            }
            ExprKind::ArrayAccess { array, index } => {
                let arr = {
                    let v = self.expr_value(array);
                    self.materialize(v)
                };
                let idx = {
                    let v = self.expr_value(index);
                    self.materialize(v)
                };
                self.null_check(&arr);
                self.bounds_check(&arr, &idx);
                let addr = self.element_address(&arr, &idx);
                let dst = self.temp();
                self.emit(Instr::Load { dst, base: addr, offset: ARRAY_DATA_OFFSET });
                Value::Temp(dst)
            }
            ExprKind::Call { recv, args, .. } => self.call_value(expr, recv.as_deref(), args),
            ExprKind::New { args, .. } => self.new_value(expr, args),
            ExprKind::NewArray { len, .. } => self.new_array_value(expr, len),
            ExprKind::Unary { op, operand } => {
                let v = self.expr_value(operand);
                let dst = self.temp();
                match op {
                    UnaryOp::Minus => {
                        self.emit(Instr::Bin { dst, op: BinOp::Sub, lhs: Value::Const(0), rhs: v })
                    }
                    UnaryOp::Not => {
                        self.emit(Instr::Bin { dst, op: BinOp::Sub, lhs: Value::Const(1), rhs: v })
                    }
                }
                Value::Temp(dst)
            }
            ExprKind::Binary { op, lhs, rhs } => self.binary_value(expr, *op, lhs, rhs),
            ExprKind::InstanceOf { expr: operand, .. } => {
                let target = self
                    .attrs
                    .type_operands
                    .get(&expr.id)
                    .and_then(|t| self.layout.target_column(t))
                    .expect("instanceof target column");
                let v = {
                    let v = self.expr_value(operand);
                    self.materialize(v)
                };
                let dst = self.temp();
                let lcheck = self.fresh_label();
                let lend = self.fresh_label();
                self.emit(Instr::Move { dst, src: Value::Const(0) });
                // null is an instance of nothing
                let is_null = self.temp();
                self.emit(Instr::Bin {
                    dst: is_null,
                    op: BinOp::Eq,
                    lhs: v.clone(),
                    rhs: Value::Const(0),
                });
                self.emit(Instr::CJump {
                    cond: Value::Temp(is_null),
                    if_true: lend.clone(),
                    if_false: lcheck.clone(),
                });
                self.emit(Instr::Label(lcheck));
                let bit = self.subtype_bit(&v, target);
                self.emit(Instr::Move { dst, src: bit });
                self.emit(Instr::Label(lend));
                Value::Temp(dst)
            }
            ExprKind::Cast { expr: operand, .. } => self.cast_value(expr, operand),
            ExprKind::Assign { lhs, rhs } => self.assign_value(lhs, rhs),
        }
    }

    /// Load vtable -> subtype column -> target bit for a non-null receiver.
    fn subtype_bit(&mut self, recv: &Value, column: usize) -> Value {
        let vt = self.temp();
        self.emit(Instr::Load { dst: vt, base: recv.clone(), offset: 0 });
        let col = self.temp();
        self.emit(Instr::Load { dst: col, base: Value::Temp(vt), offset: 0 });
        let bit = self.temp();
        self.emit(Instr::Load {
            dst: bit,
            base: Value::Temp(col),
            offset: WORD * column as i32,
        });
        Value::Temp(bit)
    }

    fn cast_value(&mut self, expr: &Expr, operand: &Expr) -> Value {
        let target = self.attrs.type_operands.get(&expr.id).cloned().expect("cast target");
        let v = self.expr_value(operand);

        match &target {
            Ty::Byte => {
                let dst = self.temp();
                self.emit(Instr::Ext { dst, src: v, kind: ExtKind::Byte });
                Value::Temp(dst)
            }
            Ty::Short => {
                let dst = self.temp();
                self.emit(Instr::Ext { dst, src: v, kind: ExtKind::Short });
                Value::Temp(dst)
            }
            Ty::Char => {
                let dst = self.temp();
                self.emit(Instr::Ext { dst, src: v, kind: ExtKind::Char });
                Value::Temp(dst)
            }
            Ty::Int | Ty::Boolean => v,
            _ => {
                // Reference cast: widening needs no check, narrowing tests
                // the subtype column and raises the runtime exception.
                let source = self.attrs.expr_tys.get(&operand.id).cloned();
                let needs_check = match &source {
                    Some(src) => {
                        !assignable(self.program, self.hierarchy, src, &target)
                    }
                    None => true,
                };
                if !needs_check {
                    return v;
                }
                let Some(column) = self.layout.target_column(&target) else {
                    return v;
                };
                let v = self.materialize(v);
                let lok = self.fresh_label();
                let lcheck = self.fresh_label();
                let is_null = self.temp();
                self.emit(Instr::Bin {
                    dst: is_null,
                    op: BinOp::Eq,
                    lhs: v.clone(),
                    rhs: Value::Const(0),
                });
                self.emit(Instr::CJump {
                    cond: Value::Temp(is_null),
                    if_true: lok.clone(),
                    if_false: lcheck.clone(),
                });
                self.emit(Instr::Label(lcheck));
                let bit = self.subtype_bit(&v, column);
                let err = self.err_label();
                self.emit(Instr::CJump { cond: bit, if_true: lok.clone(), if_false: err });
                self.emit(Instr::Label(lok));
                v
            }
        }
    }

    fn binary_value(&mut self, expr: &Expr, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> Value {
        // Short-circuit operators as values.
        if matches!(op, BinaryOp::And | BinaryOp::Or) {
            let dst = self.temp();
            let lrhs = self.fresh_label();
            let lend = self.fresh_label();
            let short_value = if op == BinaryOp::And { 0 } else { 1 };
            self.emit(Instr::Move { dst, src: Value::Const(short_value) });
            if op == BinaryOp::And {
                self.cond(lhs, &lrhs, &lend);
            } else {
                self.cond(lhs, &lend, &lrhs);
            }
            self.emit(Instr::Label(lrhs));
            let rhs_v = self.expr_value(rhs);
            self.emit(Instr::Move { dst, src: rhs_v });
            self.emit(Instr::Label(lend));
            return Value::Temp(dst);
        }

        // String concatenation.
        if op == BinaryOp::Add {
            if let Some(Ty::Ref(t)) = self.attrs.expr_tys.get(&expr.id) {
                if *t == self.program.well_known.string {
                    return self.concat_value(lhs, rhs);
                }
            }
        }

        let lhs_v = {
            let v = self.expr_value(lhs);
            self.materialize(v)
        };
        let rhs_v = {
            let v = self.expr_value(rhs);
            self.materialize(v)
        };

        if matches!(op, BinaryOp::Div | BinaryOp::Rem) {
            let zero = self.temp();
            self.emit(Instr::Bin {
                dst: zero,
                op: BinOp::Eq,
                lhs: rhs_v.clone(),
                rhs: Value::Const(0),
            });
            let lok = self.fresh_label();
            let err = self.err_label();
            self.emit(Instr::CJump {
                cond: Value::Temp(zero),
                if_true: err,
                if_false: lok.clone(),
            });
            self.emit(Instr::Label(lok));
        }

        let dst = self.temp();
        self.emit(Instr::Bin { dst, op: lower_op(op), lhs: lhs_v, rhs: rhs_v });
        Value::Temp(dst)
    }

    /// `a + b` with a String result: convert both operands through
    /// `String.valueOf`, then call `concat` on the left.
    fn concat_value(&mut self, lhs: &Expr, rhs: &Expr) -> Value {
        let lhs_s = self.stringify(lhs);
        let rhs_s = self.stringify(rhs);
        let string = self.program.well_known.string;
        let concat = self.program.types[string]
            .methods
            .iter()
            .position(|m| m.name == "concat" && m.params.len() == 1)
            .map(|index| MethodRef { owner: string, index })
            .expect("String.concat in stdlib");
        let slot = self.layout.slot_of(self.program, concat);
        let dst = self.temp();
        self.emit(Instr::Call {
            dst: Some(dst),
            target: CallTarget::Virtual { recv: lhs_s.clone(), slot },
            args: vec![lhs_s, rhs_s],
        });
        Value::Temp(dst)
    }

    fn stringify(&mut self, operand: &Expr) -> Value {
        let v = {
            let v = self.expr_value(operand);
            self.materialize(v)
        };
        let operand_ty = self.attrs.expr_tys.get(&operand.id).cloned().unwrap_or(Ty::Null);
        let param = match operand_ty {
            Ty::Char => Ty::Char,
            Ty::Boolean => Ty::Boolean,
            Ty::Int | Ty::Short | Ty::Byte => Ty::Int,
            _ => Ty::Ref(self.program.well_known.object),
        };
        let string = self.program.well_known.string;
        let value_of = self.program.types[string]
            .methods
            .iter()
            .position(|m| m.name == "valueOf" && m.params.len() == 1 && m.params[0] == param)
            .map(|index| MethodRef { owner: string, index })
            .expect("String.valueOf overload in stdlib");
        let dst = self.temp();
        self.emit(Instr::Call {
            dst: Some(dst),
            target: CallTarget::Label(layout::method_label(self.program, value_of)),
            args: vec![v],
        });
        Value::Temp(dst)
    }

    fn call_value(&mut self, expr: &Expr, recv: Option<&Expr>, args: &[Expr]) -> Value {
        let resolution = *self.attrs.calls.get(&expr.id).expect("resolved call");
        let minfo =
            &self.program.types[resolution.method.owner].methods[resolution.method.index];
        let is_void = minfo.ret == Ty::Void;

        // Receiver: only instance calls evaluate one. A static call through
        // a type name has nothing to evaluate.
        let recv_value = if resolution.is_static {
            None
        } else {
            let value = match recv {
                None => Value::Temp(self.this.expect("implicit this")),
                Some(r) => {
                    let v = self.expr_value(r);
                    self.materialize(v)
                }
            };
            if recv.is_some() {
                self.null_check(&value);
            }
            Some(value)
        };

        let mut arg_values = Vec::with_capacity(args.len() + 1);
        if let Some(recv_value) = &recv_value {
            arg_values.push(recv_value.clone());
        }
        for arg in args {
            let v = self.expr_value(arg);
            arg_values.push(self.materialize(v));
        }

        // Instance calls dispatch through the vtable; static calls (native
        // ones included, via their NATIVE label) are direct.
        let target = match recv_value {
            Some(recv_value) => {
                let slot = self.layout.slot_of(self.program, resolution.method);
                CallTarget::Virtual { recv: recv_value, slot }
            }
            None => CallTarget::Label(layout::method_label(self.program, resolution.method)),
        };

        let dst = (!is_void).then(|| self.temp());
        self.emit(Instr::Call { dst, target, args: arg_values });
        dst.map(Value::Temp).unwrap_or(Value::Const(0))
    }

    fn new_value(&mut self, expr: &Expr, args: &[Expr]) -> Value {
        let ctor = *self.attrs.ctor_calls.get(&expr.id).expect("resolved constructor");
        let size = self.layout.object_size[ctor.owner];

        let obj = self.temp();
        self.emit(Instr::Call {
            dst: Some(obj),
            target: CallTarget::Label(RT_MALLOC.to_string()),
            args: vec![Value::Const(size)],
        });
        self.emit(Instr::Store {
            base: Value::Temp(obj),
            offset: 0,
            src: Value::Name(layout::vtable_label(self.program, ctor.owner)),
        });

        let mut arg_values = vec![Value::Temp(obj)];
        for arg in args {
            let v = self.expr_value(arg);
            arg_values.push(self.materialize(v));
        }
        self.emit(Instr::Call {
            dst: None,
            target: CallTarget::Label(layout::ctor_label(self.program, ctor)),
            args: arg_values,
        });
        Value::Temp(obj)
    }

    fn new_array_value(&mut self, expr: &Expr, len: &Expr) -> Value {
        let elem_ty = self.attrs.type_operands.get(&expr.id).cloned().expect("array element");
        let elem = ElemKey::of(&elem_ty).expect("array element key");

        let len_v = {
            let v = self.expr_value(len);
            self.materialize(v)
        };

        // Negative sizes raise the runtime exception.
        let neg = self.temp();
        self.emit(Instr::Bin {
            dst: neg,
            op: BinOp::Lt,
            lhs: len_v.clone(),
            rhs: Value::Const(0),
        });
        let lok = self.fresh_label();
        let err = self.err_label();
        self.emit(Instr::CJump { cond: Value::Temp(neg), if_true: err, if_false: lok.clone() });
        self.emit(Instr::Label(lok));

        let bytes = self.temp();
        self.emit(Instr::Bin {
            dst: bytes,
            op: BinOp::Mul,
            lhs: len_v.clone(),
            rhs: Value::Const(WORD),
        });
        let total = self.temp();
        self.emit(Instr::Bin {
            dst: total,
            op: BinOp::Add,
            lhs: Value::Temp(bytes),
            rhs: Value::Const(ARRAY_DATA_OFFSET),
        });
        let arr = self.temp();
        self.emit(Instr::Call {
            dst: Some(arr),
            target: CallTarget::Label(RT_MALLOC.to_string()),
            args: vec![Value::Temp(total)],
        });
        self.emit(Instr::Store {
            base: Value::Temp(arr),
            offset: 0,
            src: Value::Name(layout::array_vtable_label(self.program, &elem)),
        });
        self.emit(Instr::Store {
            base: Value::Temp(arr),
            offset: ARRAY_LENGTH_OFFSET,
            src: len_v.clone(),
        });

        // Zero the elements; __malloc gives no such guarantee.
        let i = self.temp();
        self.emit(Instr::Move { dst: i, src: Value::Const(0) });
        let lcond = self.fresh_label();
        let lbody = self.fresh_label();
        let ldone = self.fresh_label();
        self.emit(Instr::Label(lcond.clone()));
        let in_range = self.temp();
        self.emit(Instr::Bin {
            dst: in_range,
            op: BinOp::Lt,
            lhs: Value::Temp(i),
            rhs: len_v,
        });
        self.emit(Instr::CJump {
            cond: Value::Temp(in_range),
            if_true: lbody.clone(),
            if_false: ldone.clone(),
        });
        self.emit(Instr::Label(lbody));
        let addr = self.element_address(&Value::Temp(arr), &Value::Temp(i));
        self.emit(Instr::Store { base: addr, offset: ARRAY_DATA_OFFSET, src: Value::Const(0) });
        let next = self.temp();
        self.emit(Instr::Bin {
            dst: next,
            op: BinOp::Add,
            lhs: Value::Temp(i),
            rhs: Value::Const(1),
        });
        self.emit(Instr::Move { dst: i, src: Value::Temp(next) });
        self.emit(Instr::Jump(lcond));
        self.emit(Instr::Label(ldone));

        Value::Temp(arr)
    }

    fn assign_value(&mut self, lhs: &Expr, rhs: &Expr) -> Value {
        match &lhs.kind {
            ExprKind::Name(_) => {
                let resolution = *self.attrs.names.get(&lhs.id).expect("resolved name");
                let chain = self.attrs.chains.get(&lhs.id).cloned().unwrap_or_default();
                if chain.is_empty() {
                    match resolution.binding {
                        Binding::Local(decl) => {
                            let t = self.locals[&decl];
                            let v = self.expr_value(rhs);
                            self.emit(Instr::Move { dst: t, src: v });
                            Value::Temp(t)
                        }
                        Binding::Param(i) => {
                            let t = self.params[i];
                            let v = self.expr_value(rhs);
                            self.emit(Instr::Move { dst: t, src: v });
                            Value::Temp(t)
                        }
                        Binding::Field(fr) => {
                            let v = {
                                let v = self.expr_value(rhs);
                                self.materialize(v)
                            };
                            let this = Value::Temp(self.this.expect("this"));
                            self.emit(Instr::Store {
                                base: this,
                                offset: self.layout.field_offset(fr),
                                src: v.clone(),
                            });
                            v
                        }
                        Binding::StaticField(fr) => {
                            let v = {
                                let v = self.expr_value(rhs);
                                self.materialize(v)
                            };
                            self.emit(Instr::Store {
                                base: Value::Name(layout::static_field_label(self.program, fr)),
                                offset: 0,
                                src: v.clone(),
                            });
                            v
                        }
                        Binding::Type(_) => unreachable!("assignment to type"),
                    }
                } else {
                    // Navigate to the object holding the final field.
                    let base = self.name_base_value(lhs.id, resolution);
                    let base = self.chain_loads_links(&chain[..chain.len() - 1], base);
                    let crate::wash::ChainLink::Field(fr) = chain[chain.len() - 1] else {
                        unreachable!("assignment to array length was rejected");
                    };
                    self.null_check(&base);
                    let v = {
                        let v = self.expr_value(rhs);
                        self.materialize(v)
                    };
                    self.emit(Instr::Store {
                        base,
                        offset: self.layout.field_offset(fr),
                        src: v.clone(),
                    });
                    v
                }
            }
            ExprKind::FieldAccess { target, .. } => {
                let base = {
                    let v = self.expr_value(target);
                    self.materialize(v)
                };
                let chain = self.attrs.chains.get(&lhs.id).cloned().unwrap_or_default();
                let crate::wash::ChainLink::Field(fr) = chain[0] else {
                    unreachable!("assignment to array length was rejected");
                };
                self.null_check(&base);
                let v = {
                    let v = self.expr_value(rhs);
                    self.materialize(v)
                };
                self.emit(Instr::Store {
                    base,
                    offset: self.layout.field_offset(fr),
                    src: v.clone(),
                });
                v
            }
            ExprKind::ArrayAccess { array, index } => {
                let arr = {
                    let v = self.expr_value(array);
                    self.materialize(v)
                };
                let idx = {
                    let v = self.expr_value(index);
                    self.materialize(v)
                };
                let v = {
                    let v = self.expr_value(rhs);
                    self.materialize(v)
                };
                self.null_check(&arr);
                self.bounds_check(&arr, &idx);
                let addr = self.element_address(&arr, &idx);
                self.emit(Instr::Store { base: addr, offset: ARRAY_DATA_OFFSET, src: v.clone() });
                v
            }
            _ => unreachable!("non-lvalue assignment was rejected"),
        }
    }

    // ---- names and field chains -------------------------------------------

    fn name_value(&mut self, expr: &Expr, _name: &Name) -> Value {
        let resolution = *self.attrs.names.get(&expr.id).expect("resolved name");
        let base = self.name_base_value(expr.id, resolution);
        self.chain_loads(expr.id, base)
    }

    fn name_base_value(
        &mut self,
        _id: NodeId,
        resolution: crate::wash::NameResolution,
    ) -> Value {
        match resolution.binding {
            Binding::Local(decl) => Value::Temp(self.locals[&decl]),
            Binding::Param(i) => Value::Temp(self.params[i]),
            Binding::Field(fr) => {
                let this = Value::Temp(self.this.expect("this"));
                let dst = self.temp();
                self.emit(Instr::Load { dst, base: this, offset: self.layout.field_offset(fr) });
                Value::Temp(dst)
            }
            Binding::StaticField(fr) => {
                let dst = self.temp();
                self.emit(Instr::Load {
                    dst,
                    base: Value::Name(layout::static_field_label(self.program, fr)),
                    offset: 0,
                });
                Value::Temp(dst)
            }
            Binding::Type(_) => unreachable!("type name in value position"),
        }
    }

    fn chain_loads(&mut self, id: NodeId, base: Value) -> Value {
        let chain = self.attrs.chains.get(&id).cloned().unwrap_or_default();
        self.chain_loads_links(&chain, base)
    }

    fn chain_loads_links(&mut self, links: &[crate::wash::ChainLink], base: Value) -> Value {
        let mut current = base;
        for link in links {
            self.null_check(&current);
            let dst = self.temp();
            match link {
                crate::wash::ChainLink::Field(fr) => {
                    self.emit(Instr::Load {
                        dst,
                        base: current,
                        offset: self.layout.field_offset(*fr),
                    });
                }
                crate::wash::ChainLink::ArrayLength => {
                    self.emit(Instr::Load {
                        dst,
                        base: current,
                        offset: ARRAY_LENGTH_OFFSET,
                    });
                }
            }
            current = Value::Temp(dst);
        }
        current
    }

    // ---- runtime checks ---------------------------------------------------

    fn null_check(&mut self, value: &Value) {
        // String literals and `this` cannot be null.
        if matches!(value, Value::Name(_)) {
            return;
        }
        if let (Value::Temp(t), Some(this)) = (value, self.this) {
            if *t == this {
                return;
            }
        }
        let is_null = self.temp();
        self.emit(Instr::Bin {
            dst: is_null,
            op: BinOp::Eq,
            lhs: value.clone(),
            rhs: Value::Const(0),
        });
        let lok = self.fresh_label();
        let err = self.err_label();
        self.emit(Instr::CJump {
            cond: Value::Temp(is_null),
            if_true: err,
            if_false: lok.clone(),
        });
        self.emit(Instr::Label(lok));
    }

    fn bounds_check(&mut self, arr: &Value, idx: &Value) {
        let err = self.err_label();

        let negative = self.temp();
        self.emit(Instr::Bin {
            dst: negative,
            op: BinOp::Lt,
            lhs: idx.clone(),
            rhs: Value::Const(0),
        });
        let lnonneg = self.fresh_label();
        self.emit(Instr::CJump {
            cond: Value::Temp(negative),
            if_true: err.clone(),
            if_false: lnonneg.clone(),
        });
        self.emit(Instr::Label(lnonneg));

        let len = self.temp();
        self.emit(Instr::Load { dst: len, base: arr.clone(), offset: ARRAY_LENGTH_OFFSET });
        let too_big = self.temp();
        self.emit(Instr::Bin {
            dst: too_big,
            op: BinOp::Ge,
            lhs: idx.clone(),
            rhs: Value::Temp(len),
        });
        let lok = self.fresh_label();
        self.emit(Instr::CJump {
            cond: Value::Temp(too_big),
            if_true: err,
            if_false: lok.clone(),
        });
        self.emit(Instr::Label(lok));
    }

    /// Address of element `idx`, before the fixed data offset is applied.
    fn element_address(&mut self, arr: &Value, idx: &Value) -> Value {
        let scaled = self.temp();
        self.emit(Instr::Bin {
            dst: scaled,
            op: BinOp::Mul,
            lhs: idx.clone(),
            rhs: Value::Const(WORD),
        });
        let addr = self.temp();
        self.emit(Instr::Bin {
            dst: addr,
            op: BinOp::Add,
            lhs: arr.clone(),
            rhs: Value::Temp(scaled),
        });
        Value::Temp(addr)
    }
}

fn comparison_op(op: BinaryOp) -> BinOp {
    match op {
        BinaryOp::Eq => BinOp::Eq,
        BinaryOp::Ne => BinOp::Ne,
        BinaryOp::Lt => BinOp::Lt,
        BinaryOp::Le => BinOp::Le,
        BinaryOp::Gt => BinOp::Gt,
        BinaryOp::Ge => BinOp::Ge,
        _ => unreachable!("not a comparison"),
    }
}

fn lower_op(op: BinaryOp) -> BinOp {
    match op {
        BinaryOp::Add => BinOp::Add,
        BinaryOp::Sub => BinOp::Sub,
        BinaryOp::Mul => BinOp::Mul,
        BinaryOp::Div => BinOp::Div,
        BinaryOp::Rem => BinOp::Rem,
        BinaryOp::EagerAnd => BinOp::And,
        BinaryOp::EagerOr => BinOp::Or,
        other => comparison_op(other),
    }
}
