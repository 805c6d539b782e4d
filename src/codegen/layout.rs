//! Layout: object field offsets, vtables and subtype-test columns, plus
//! the label mangling scheme shared by lowering and emission.
//!
//! Vtable slots are assigned globally per `(name, parameter types)`
//! signature, so an overriding method lands at the inherited slot by
//! construction and interface dispatch goes through the same table. Word 0
//! of every vtable points at the owner's subtype column; slot `s` lives at
//! byte offset `4 * (s + 1)`.

use std::collections::HashMap;

use crate::ast::{ExprKind, StmtKind};
use crate::common::consts::{ARRAY_HEADER, OBJECT_HEADER, WORD};
use crate::wash::hierarchy::Hierarchy;
use crate::wash::{Attributes, CtorRef, FieldRef, MethodRef, Program, Sig, Ty, TypeId};

/// Element type of a runtime array type, the key for array vtables and
/// subtype columns.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ElemKey {
    Boolean,
    Byte,
    Short,
    Int,
    Char,
    Ref(TypeId),
}

impl ElemKey {
    pub fn of(ty: &Ty) -> Option<ElemKey> {
        Some(match ty {
            Ty::Boolean => ElemKey::Boolean,
            Ty::Byte => ElemKey::Byte,
            Ty::Short => ElemKey::Short,
            Ty::Int => ElemKey::Int,
            Ty::Char => ElemKey::Char,
            Ty::Ref(id) => ElemKey::Ref(*id),
            _ => return None,
        })
    }

    fn key(&self, program: &Program) -> String {
        match self {
            ElemKey::Boolean => "Z".into(),
            ElemKey::Byte => "B".into(),
            ElemKey::Short => "S".into(),
            ElemKey::Int => "I".into(),
            ElemKey::Char => "C".into(),
            ElemKey::Ref(id) => mangle(&program.types[*id].name),
        }
    }
}

/// A column of the subtype test: a declared type or an array type named in
/// an `instanceof` or cast.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TestTarget {
    Class(TypeId),
    Array(ElemKey),
}

#[derive(Debug)]
pub struct Layout {
    /// Global vtable slot per instance-method signature.
    pub vtable_slots: HashMap<Sig, usize>,
    /// Slot index -> signature, for emitting vtables in order.
    pub slot_sigs: Vec<Sig>,
    /// Byte offset of every declared instance field; valid in the declaring
    /// class and every subclass, since inherited slots form a prefix.
    pub field_offsets: HashMap<FieldRef, i32>,
    /// Allocation size per class, header included.
    pub object_size: Vec<i32>,
    /// Ordered subtype-test columns.
    pub test_targets: Vec<TestTarget>,
    pub target_index: HashMap<TestTarget, usize>,
    /// Array element types that exist at runtime (`new T[n]` sites plus
    /// `char` for string backing stores).
    pub array_elems: Vec<ElemKey>,
}

impl Layout {
    pub fn build(program: &Program, hierarchy: &Hierarchy, attrs: &Attributes) -> Layout {
        // Global vtable slots over every declared instance method.
        let mut vtable_slots: HashMap<Sig, usize> = HashMap::new();
        let mut slot_sigs: Vec<Sig> = Vec::new();
        for info in &program.types {
            for method in &info.methods {
                if method.is_static() {
                    continue;
                }
                let sig = method.sig();
                if !vtable_slots.contains_key(&sig) {
                    vtable_slots.insert(sig.clone(), slot_sigs.len());
                    slot_sigs.push(sig);
                }
            }
        }

        // Field offsets from the hierarchical layout order.
        let mut field_offsets: HashMap<FieldRef, i32> = HashMap::new();
        let mut object_size = vec![0; program.types.len()];
        for id in 0..program.types.len() {
            let fields = &hierarchy.all_instance_fields[id];
            for (slot, fr) in fields.iter().enumerate() {
                field_offsets.insert(*fr, OBJECT_HEADER + WORD * slot as i32);
            }
            object_size[id] = OBJECT_HEADER + WORD * fields.len() as i32;
        }

        // Runtime array types and array test targets from the attribute
        // tables; `char[]` always exists because strings are backed by it.
        let mut array_elems: Vec<ElemKey> = vec![ElemKey::Char];
        let mut array_targets: Vec<ElemKey> = Vec::new();
        collect_array_uses(program, attrs, &mut array_elems, &mut array_targets);
        for elem in &array_targets {
            if !array_elems.contains(elem) {
                array_elems.push(elem.clone());
            }
        }

        let mut test_targets: Vec<TestTarget> =
            (0..program.types.len()).map(TestTarget::Class).collect();
        for elem in &array_elems {
            test_targets.push(TestTarget::Array(elem.clone()));
        }
        let target_index = test_targets
            .iter()
            .cloned()
            .enumerate()
            .map(|(i, t)| (t, i))
            .collect();

        Layout {
            vtable_slots,
            slot_sigs,
            field_offsets,
            object_size,
            test_targets,
            target_index,
            array_elems,
        }
    }

    pub fn slot_of(&self, program: &Program, method: MethodRef) -> usize {
        let sig = program.types[method.owner].methods[method.index].sig();
        self.vtable_slots[&sig]
    }

    pub fn field_offset(&self, fr: FieldRef) -> i32 {
        self.field_offsets[&fr]
    }

    /// Column index of a type used as an `instanceof`/cast target.
    pub fn target_column(&self, ty: &Ty) -> Option<usize> {
        let target = match ty {
            Ty::Ref(id) => TestTarget::Class(*id),
            Ty::Array(elem) => TestTarget::Array(ElemKey::of(elem)?),
            _ => return None,
        };
        self.target_index.get(&target).copied()
    }

    /// Is a value of runtime type `runtime` an instance of `target`?
    pub fn is_instance(
        &self,
        program: &Program,
        hierarchy: &Hierarchy,
        runtime: &TestTarget,
        target: &TestTarget,
    ) -> bool {
        match (runtime, target) {
            (TestTarget::Class(s), TestTarget::Class(t)) => hierarchy.is_subtype(*s, *t),
            (TestTarget::Class(_), TestTarget::Array(_)) => false,
            (TestTarget::Array(_), TestTarget::Class(t)) => {
                *t == program.well_known.object
                    || *t == program.well_known.cloneable
                    || *t == program.well_known.serializable
            }
            (TestTarget::Array(a), TestTarget::Array(b)) => match (a, b) {
                (ElemKey::Ref(s), ElemKey::Ref(t)) => hierarchy.is_subtype(*s, *t),
                _ => a == b,
            },
        }
    }
}

fn collect_array_uses(
    program: &Program,
    attrs: &Attributes,
    array_elems: &mut Vec<ElemKey>,
    array_targets: &mut Vec<ElemKey>,
) {
    use crate::ast::{Block, Expr, Stmt, TypeDeclNode};

    fn expr(e: &Expr, attrs: &Attributes, elems: &mut Vec<ElemKey>, targets: &mut Vec<ElemKey>) {
        match &e.kind {
            ExprKind::NewArray { len, .. } => {
                if let Some(elem_ty) = attrs.type_operands.get(&e.id) {
                    if let Some(key) = ElemKey::of(elem_ty) {
                        if !elems.contains(&key) {
                            elems.push(key);
                        }
                    }
                }
                expr(len, attrs, elems, targets);
            }
            ExprKind::InstanceOf { expr: operand, .. } | ExprKind::Cast { expr: operand, .. } => {
                if let Some(Ty::Array(elem_ty)) = attrs.type_operands.get(&e.id) {
                    if let Some(key) = ElemKey::of(elem_ty) {
                        if !targets.contains(&key) {
                            targets.push(key);
                        }
                    }
                }
                expr(operand, attrs, elems, targets);
            }
            ExprKind::FieldAccess { target, .. } => expr(target, attrs, elems, targets),
            ExprKind::ArrayAccess { array, index } => {
                expr(array, attrs, elems, targets);
                expr(index, attrs, elems, targets);
            }
            ExprKind::Call { recv, args, .. } => {
                if let Some(recv) = recv {
                    expr(recv, attrs, elems, targets);
                }
                for arg in args {
                    expr(arg, attrs, elems, targets);
                }
            }
            ExprKind::New { args, .. } => {
                for arg in args {
                    expr(arg, attrs, elems, targets);
                }
            }
            ExprKind::Unary { operand, .. } => expr(operand, attrs, elems, targets),
            ExprKind::Binary { lhs, rhs, .. } => {
                expr(lhs, attrs, elems, targets);
                expr(rhs, attrs, elems, targets);
            }
            ExprKind::Assign { lhs, rhs } => {
                expr(lhs, attrs, elems, targets);
                expr(rhs, attrs, elems, targets);
            }
            ExprKind::Literal(_) | ExprKind::This | ExprKind::Name(_) => {}
        }
    }

    fn block(b: &Block, attrs: &Attributes, elems: &mut Vec<ElemKey>, targets: &mut Vec<ElemKey>) {
        for stmt in &b.statements {
            walk_stmt(stmt, attrs, elems, targets);
        }
    }

    fn walk_stmt(s: &Stmt, attrs: &Attributes, elems: &mut Vec<ElemKey>, targets: &mut Vec<ElemKey>) {
        use crate::ast::ForInit;
        match &s.kind {
            StmtKind::Block(b) => block(b, attrs, elems, targets),
            StmtKind::Empty => {}
            StmtKind::Expr(e) => expr(e, attrs, elems, targets),
            StmtKind::If { cond, then_branch, else_branch } => {
                expr(cond, attrs, elems, targets);
                walk_stmt(then_branch, attrs, elems, targets);
                if let Some(else_branch) = else_branch {
                    walk_stmt(else_branch, attrs, elems, targets);
                }
            }
            StmtKind::While { cond, body } => {
                expr(cond, attrs, elems, targets);
                walk_stmt(body, attrs, elems, targets);
            }
            StmtKind::For { init, cond, update, body } => {
                match init.as_deref() {
                    Some(ForInit::Decl(decl)) => {
                        if let Some(init) = &decl.init {
                            expr(init, attrs, elems, targets);
                        }
                    }
                    Some(ForInit::Expr(e)) => expr(e, attrs, elems, targets),
                    None => {}
                }
                if let Some(cond) = cond {
                    expr(cond, attrs, elems, targets);
                }
                if let Some(update) = update {
                    expr(update, attrs, elems, targets);
                }
                walk_stmt(body, attrs, elems, targets);
            }
            StmtKind::Return(Some(e)) => expr(e, attrs, elems, targets),
            StmtKind::Return(None) => {}
            StmtKind::LocalVar(decl) => {
                if let Some(init) = &decl.init {
                    expr(init, attrs, elems, targets);
                }
            }
        }
    }

    for unit in &program.units {
        let class = match &unit.ty {
            TypeDeclNode::Class(class) => class,
            TypeDeclNode::Interface(_) => continue,
        };
        for field in &class.fields {
            if let Some(init) = &field.init {
                expr(init, attrs, array_elems, array_targets);
            }
        }
        for ctor in &class.constructors {
            block(&ctor.body, attrs, array_elems, array_targets);
        }
        for method in &class.methods {
            if let Some(body) = &method.body {
                block(body, attrs, array_elems, array_targets);
            }
        }
    }
}

// ---- label mangling -------------------------------------------------------

/// Canonical names become label-safe by replacing dots with `$`.
pub fn mangle(name: &str) -> String {
    name.replace('.', "$")
}

fn ty_label_key(program: &Program, ty: &Ty) -> String {
    match ty {
        Ty::Int => "I".into(),
        Ty::Short => "S".into(),
        Ty::Byte => "B".into(),
        Ty::Char => "C".into(),
        Ty::Boolean => "Z".into(),
        Ty::Void => "V".into(),
        Ty::Null => "0".into(),
        Ty::Ref(id) => mangle(&program.types[*id].name),
        Ty::Array(elem) => format!("A{}", ty_label_key(program, elem)),
    }
}

/// Code label of a declared method. Native methods use the runtime's
/// `NATIVE<canonical>.<name>` convention.
pub fn method_label(program: &Program, method: MethodRef) -> String {
    let info = &program.types[method.owner].methods[method.index];
    if info.is_native() {
        return format!("NATIVE{}.{}", program.types[method.owner].name, info.name);
    }
    let params: Vec<String> = info.params.iter().map(|t| ty_label_key(program, t)).collect();
    format!(
        "_{}${}__{}",
        mangle(&program.types[method.owner].name),
        info.name,
        params.join("_")
    )
}

pub fn ctor_label(program: &Program, ctor: CtorRef) -> String {
    let info = &program.types[ctor.owner].ctors[ctor.index];
    let params: Vec<String> = info.params.iter().map(|t| ty_label_key(program, t)).collect();
    format!("_{}$ctor__{}", mangle(&program.types[ctor.owner].name), params.join("_"))
}

pub fn static_field_label(program: &Program, fr: FieldRef) -> String {
    format!(
        "_field${}${}",
        mangle(&program.types[fr.owner].name),
        program.types[fr.owner].fields[fr.index].name
    )
}

pub fn init_label(program: &Program, id: TypeId) -> String {
    format!("_{}$static_init", mangle(&program.types[id].name))
}

pub fn vtable_label(program: &Program, id: TypeId) -> String {
    format!("_vtable${}", mangle(&program.types[id].name))
}

pub fn subtype_label(program: &Program, id: TypeId) -> String {
    format!("_subtype${}", mangle(&program.types[id].name))
}

pub fn array_vtable_label(program: &Program, elem: &ElemKey) -> String {
    format!("_vtable$arr${}", elem.key(program))
}

pub fn array_subtype_label(program: &Program, elem: &ElemKey) -> String {
    format!("_subtype$arr${}", elem.key(program))
}

pub fn string_object_label(unit: usize, index: usize) -> String {
    format!("_string${unit}_{index}")
}

pub fn string_chars_label(unit: usize, index: usize) -> String {
    format!("_chars${unit}_{index}")
}

/// `ARRAY_HEADER` re-exported for the lowering pass's address arithmetic.
pub const ARRAY_DATA_OFFSET: i32 = ARRAY_HEADER;
