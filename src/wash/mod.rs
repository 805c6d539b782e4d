//! The semantic analysis pipeline.
//!
//! Phases run in order over a shared, progressively enriched program model:
//!
//! - **enter**: canonical type index, import linking, declared-type resolution
//! - **hierarchy**: class-graph validation and contains sets
//! - **resolve**: name disambiguation (JLS 6.5 reclassification)
//! - **attr**: type checking and overload resolution
//! - **const_fold**: compile-time constant evaluation
//! - **flow**: reachability and definite assignment
//!
//! Each phase writes only its own attribute tables; earlier attributes are
//! never mutated. The driver stops the pipeline at the end of the first
//! phase that reported an error.

pub mod attr;
pub mod const_fold;
pub mod enter;
pub mod flow;
pub mod hierarchy;
pub mod resolve;

use std::collections::HashMap;

use crate::ast::{CompilationUnit, Modifier, NodeId};
use crate::common::consts::{
    JAVA_IO_SERIALIZABLE, JAVA_LANG_CLONEABLE, JAVA_LANG_OBJECT, JAVA_LANG_STRING,
};

/// Index of a declared type in the program arena. Because Joos has exactly
/// one type per compilation unit, a `TypeId` equals its unit index.
pub type TypeId = usize;

/// Semantic type of a declaration or expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Ty {
    Int,
    Short,
    Byte,
    Char,
    Boolean,
    Void,
    /// Type of the `null` literal, assignable to any reference type.
    Null,
    Ref(TypeId),
    Array(Box<Ty>),
}

impl Ty {
    pub fn is_numeric(&self) -> bool {
        matches!(self, Ty::Int | Ty::Short | Ty::Byte | Ty::Char)
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, Ty::Ref(_) | Ty::Array(_) | Ty::Null)
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, Ty::Int | Ty::Short | Ty::Byte | Ty::Char | Ty::Boolean)
    }

    /// Human-readable name for diagnostics.
    pub fn describe(&self, program: &Program) -> String {
        match self {
            Ty::Int => "int".into(),
            Ty::Short => "short".into(),
            Ty::Byte => "byte".into(),
            Ty::Char => "char".into(),
            Ty::Boolean => "boolean".into(),
            Ty::Void => "void".into(),
            Ty::Null => "null".into(),
            Ty::Ref(id) => program.types[*id].name.clone(),
            Ty::Array(elem) => format!("{}[]", elem.describe(program)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Class,
    Interface,
}

/// Semantic entry for one declared type. Edges to other types are id-valued;
/// the `Program` arena owns every entry.
#[derive(Debug)]
pub struct TypeInfo {
    pub id: TypeId,
    pub kind: TypeKind,
    pub package: String,
    pub simple_name: String,
    /// Canonical (package-qualified) name; the identity of the type.
    pub name: String,
    pub modifiers: Vec<Modifier>,
    /// Direct superclass for classes (at most one; `java.lang.Object` is
    /// implicit and filled in by the hierarchy phase), superinterfaces for
    /// interfaces.
    pub extends: Vec<TypeId>,
    pub implements: Vec<TypeId>,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
    pub ctors: Vec<CtorInfo>,
    /// Simple name -> imported type, from single-type imports.
    pub single_imports: HashMap<String, TypeId>,
    /// On-demand imported packages, lowest priority last (`java.lang`).
    pub on_demand: Vec<String>,
}

impl TypeInfo {
    pub fn is_class(&self) -> bool {
        self.kind == TypeKind::Class
    }

    pub fn is_abstract(&self) -> bool {
        self.modifiers.contains(&Modifier::Abstract)
    }

    pub fn is_final(&self) -> bool {
        self.modifiers.contains(&Modifier::Final)
    }
}

#[derive(Debug)]
pub struct FieldInfo {
    pub name: String,
    pub modifiers: Vec<Modifier>,
    pub ty: Ty,
    /// Declaration order within the class.
    pub index: usize,
    pub has_init: bool,
}

impl FieldInfo {
    pub fn is_static(&self) -> bool {
        self.modifiers.contains(&Modifier::Static)
    }

    pub fn is_final(&self) -> bool {
        self.modifiers.contains(&Modifier::Final)
    }

    pub fn is_protected(&self) -> bool {
        self.modifiers.contains(&Modifier::Protected)
    }
}

#[derive(Debug)]
pub struct MethodInfo {
    pub name: String,
    pub modifiers: Vec<Modifier>,
    pub ret: Ty,
    pub params: Vec<Ty>,
    /// Index into the AST method list of the owning type.
    pub index: usize,
    pub has_body: bool,
}

impl MethodInfo {
    pub fn is_static(&self) -> bool {
        self.modifiers.contains(&Modifier::Static)
    }

    pub fn is_abstract(&self) -> bool {
        self.modifiers.contains(&Modifier::Abstract)
    }

    pub fn is_final(&self) -> bool {
        self.modifiers.contains(&Modifier::Final)
    }

    pub fn is_native(&self) -> bool {
        self.modifiers.contains(&Modifier::Native)
    }

    pub fn is_protected(&self) -> bool {
        self.modifiers.contains(&Modifier::Protected)
    }

    pub fn is_public(&self) -> bool {
        self.modifiers.contains(&Modifier::Public)
    }

    pub fn sig(&self) -> Sig {
        (self.name.clone(), self.params.clone())
    }
}

#[derive(Debug)]
pub struct CtorInfo {
    pub modifiers: Vec<Modifier>,
    pub params: Vec<Ty>,
    /// Index into the AST constructor list; `None` for the implicit default
    /// constructor synthesized when a class declares none.
    pub index: Option<usize>,
}

impl CtorInfo {
    pub fn is_protected(&self) -> bool {
        self.modifiers.contains(&Modifier::Protected)
    }
}

/// Method identity within an inheritance frame: simple name plus parameter
/// types.
pub type Sig = (String, Vec<Ty>);

/// Reference to a declared method: owning type plus index into its method
/// list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodRef {
    pub owner: TypeId,
    pub index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldRef {
    pub owner: TypeId,
    pub index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CtorRef {
    pub owner: TypeId,
    pub index: usize,
}

/// Ids of the types every Joos program depends on, resolved once.
#[derive(Debug, Clone, Copy)]
pub struct WellKnown {
    pub object: TypeId,
    pub string: TypeId,
    pub cloneable: TypeId,
    pub serializable: TypeId,
}

/// The whole-program model: every compilation unit plus the arena of
/// semantic type entries, built by the enter phase and read-only afterwards.
#[derive(Debug)]
pub struct Program {
    pub units: Vec<CompilationUnit>,
    /// Index of the first user (non-stdlib) unit.
    pub user_start: usize,
    pub types: Vec<TypeInfo>,
    pub by_name: HashMap<String, TypeId>,
    pub packages: HashMap<String, Vec<TypeId>>,
    pub well_known: WellKnown,
}

impl Program {
    /// Resolve a simple or qualified type name as seen from `ctx`, in the
    /// Joos lookup order. Returns a message on failure or ambiguity.
    pub fn resolve_type_name(&self, ctx: TypeId, name: &str) -> Result<TypeId, String> {
        if name.contains('.') {
            let id = self
                .by_name
                .get(name)
                .copied()
                .ok_or_else(|| format!("fully qualified type '{name}' does not resolve"))?;
            // A strict prefix of a resolved qualified name must not itself
            // resolve to a type in the same environment.
            let parts: Vec<&str> = name.split('.').collect();
            for k in 1..parts.len() {
                let prefix = parts[..k].join(".");
                let clashes = if k == 1 {
                    self.resolve_simple_type_name(ctx, &prefix).is_ok()
                } else {
                    self.by_name.contains_key(&prefix)
                };
                if clashes {
                    return Err(format!(
                        "prefix '{prefix}' of qualified type '{name}' resolves to a type"
                    ));
                }
            }
            Ok(id)
        } else {
            self.resolve_simple_type_name(ctx, name)
        }
    }

    fn resolve_simple_type_name(&self, ctx: TypeId, name: &str) -> Result<TypeId, String> {
        self.try_resolve_simple(ctx, name)?
            .ok_or_else(|| format!("cannot resolve type '{name}'"))
    }

    /// Simple-name type lookup distinguishing "not a type" (`Ok(None)`)
    /// from a genuine on-demand ambiguity (`Err`), which the disambiguator
    /// must report rather than reinterpret as a package name.
    pub fn try_resolve_simple(&self, ctx: TypeId, name: &str) -> Result<Option<TypeId>, String> {
        let info = &self.types[ctx];

        // 1. the enclosing type itself
        if info.simple_name == name {
            return Ok(Some(ctx));
        }

        // 2. single-type imports
        if let Some(&id) = info.single_imports.get(name) {
            return Ok(Some(id));
        }

        // 3. same package
        if let Some(ids) = self.packages.get(&info.package) {
            if let Some(&id) = ids.iter().find(|&&id| self.types[id].simple_name == name) {
                return Ok(Some(id));
            }
        }

        // 4. on-demand imports; ambiguity between packages is an error
        let mut found: Option<TypeId> = None;
        for package in &info.on_demand {
            let qualified = format!("{package}.{name}");
            if let Some(&id) = self.by_name.get(&qualified) {
                match found {
                    Some(prev) if prev != id => {
                        return Err(format!(
                            "simple type '{name}' is ambiguous between '{}' and '{}'",
                            self.types[prev].name, self.types[id].name
                        ));
                    }
                    _ => found = Some(id),
                }
            }
        }
        Ok(found)
    }

    /// Resolve a syntactic type reference into a semantic type.
    pub fn resolve_type_ref(
        &self,
        ctx: TypeId,
        kind: &crate::ast::TypeRefKind,
    ) -> Result<Ty, String> {
        use crate::ast::TypeRefKind;
        Ok(match kind {
            TypeRefKind::Void => Ty::Void,
            TypeRefKind::Boolean => Ty::Boolean,
            TypeRefKind::Byte => Ty::Byte,
            TypeRefKind::Short => Ty::Short,
            TypeRefKind::Int => Ty::Int,
            TypeRefKind::Char => Ty::Char,
            TypeRefKind::Named(name) => Ty::Ref(self.resolve_type_name(ctx, name)?),
            TypeRefKind::Array(elem) => Ty::Array(Box::new(self.resolve_type_ref(ctx, elem)?)),
        })
    }

    pub fn same_package(&self, a: TypeId, b: TypeId) -> bool {
        self.types[a].package == self.types[b].package
    }

    pub fn lookup_well_known(by_name: &HashMap<String, TypeId>) -> Option<WellKnown> {
        Some(WellKnown {
            object: *by_name.get(JAVA_LANG_OBJECT)?,
            string: *by_name.get(JAVA_LANG_STRING)?,
            cloneable: *by_name.get(JAVA_LANG_CLONEABLE)?,
            serializable: *by_name.get(JAVA_IO_SERIALIZABLE)?,
        })
    }
}

/// Name classification produced by the disambiguator for a dotted name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// A local variable, identified by its declaring statement's node id.
    Local(NodeId),
    /// A parameter of the enclosing method/constructor, by index.
    Param(usize),
    /// An instance field reached through an implicit `this`.
    Field(FieldRef),
    StaticField(FieldRef),
    /// The name denotes a type (legal only as a call/field qualifier).
    Type(TypeId),
}

/// Resolution of the longest prefix of a dotted name; the remaining
/// `ids[consumed..]` are instance field accesses typed by the attr phase.
#[derive(Debug, Clone, Copy)]
pub struct NameResolution {
    pub binding: Binding,
    pub consumed: usize,
}

/// One step of a field-access chain, attached to `Name` suffixes and
/// `FieldAccess` expressions.
#[derive(Debug, Clone, Copy)]
pub enum ChainLink {
    Field(FieldRef),
    /// The read-only `length` pseudo-field of arrays.
    ArrayLength,
}

/// Compile-time constant value.
#[derive(Debug, Clone, PartialEq)]
pub enum Const {
    Int(i32),
    Bool(bool),
    Str(String),
    Null,
}

/// Analyser-populated statement attributes.
#[derive(Debug, Clone, Copy)]
pub struct StmtFlags {
    pub reachable: bool,
    pub completes_normally: bool,
}

/// Resolution of a method invocation.
#[derive(Debug, Clone, Copy)]
pub struct CallResolution {
    pub method: MethodRef,
    pub is_static: bool,
}

/// Parallel attribute tables keyed by node id. Each pass owns the tables it
/// writes; later passes read but never mutate earlier ones.
#[derive(Debug, Default)]
pub struct Attributes {
    /// resolve: dotted-name classification
    pub names: HashMap<NodeId, NameResolution>,
    /// resolve: declared type of each local variable declaration
    pub local_tys: HashMap<NodeId, Ty>,
    /// attr: static type of every expression
    pub expr_tys: HashMap<NodeId, Ty>,
    /// attr: field chains for name suffixes and field accesses
    pub chains: HashMap<NodeId, Vec<ChainLink>>,
    /// attr: chosen overload per invocation
    pub calls: HashMap<NodeId, CallResolution>,
    /// attr: chosen constructor per `new` expression
    pub ctor_calls: HashMap<NodeId, CtorRef>,
    /// attr: resolved target type of casts, instanceof and array creation
    pub type_operands: HashMap<NodeId, Ty>,
    /// const_fold: compile-time constant values
    pub consts: HashMap<NodeId, Const>,
    /// flow: reachability and completion flags
    pub stmt_flags: HashMap<NodeId, StmtFlags>,
}

impl Attributes {
    /// Constant value of an expression if it folded to a boolean.
    pub fn bool_const(&self, id: NodeId) -> Option<bool> {
        match self.consts.get(&id) {
            Some(Const::Bool(b)) => Some(*b),
            _ => None,
        }
    }
}
