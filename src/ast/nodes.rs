use std::fmt;

use crate::parser::span::Span;

/// Identity of a statement or expression node, unique within a program.
pub type NodeId = u32;

/// One parsed source file.
#[derive(Debug, Clone)]
pub struct CompilationUnit {
    /// File basename without extension, for the weeder's filename check.
    pub file_name: String,
    /// Dotted package name; empty for the default package.
    pub package: String,
    pub imports: Vec<ImportDecl>,
    pub ty: TypeDeclNode,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ImportDecl {
    /// Dotted name; the imported type for single imports, the package for
    /// on-demand imports.
    pub name: String,
    pub on_demand: bool,
    pub span: Span,
}

impl fmt::Display for ImportDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.on_demand {
            write!(f, "import {}.*;", self.name)
        } else {
            write!(f, "import {};", self.name)
        }
    }
}

#[derive(Debug, Clone)]
pub enum TypeDeclNode {
    Class(ClassDecl),
    Interface(InterfaceDecl),
}

impl TypeDeclNode {
    pub fn name(&self) -> &str {
        match self {
            TypeDeclNode::Class(c) => &c.name,
            TypeDeclNode::Interface(i) => &i.name,
        }
    }

    pub fn modifiers(&self) -> &[Modifier] {
        match self {
            TypeDeclNode::Class(c) => &c.modifiers,
            TypeDeclNode::Interface(i) => &i.modifiers,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            TypeDeclNode::Class(c) => c.span,
            TypeDeclNode::Interface(i) => i.span,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub modifiers: Vec<Modifier>,
    pub name: String,
    pub extends: Option<TypeRef>,
    pub implements: Vec<TypeRef>,
    pub fields: Vec<FieldDecl>,
    pub methods: Vec<MethodDecl>,
    pub constructors: Vec<ConstructorDecl>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct InterfaceDecl {
    pub modifiers: Vec<Modifier>,
    pub name: String,
    pub extends: Vec<TypeRef>,
    pub methods: Vec<MethodDecl>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    Public,
    Protected,
    Abstract,
    Static,
    Final,
    Native,
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Modifier::Public => "public",
            Modifier::Protected => "protected",
            Modifier::Abstract => "abstract",
            Modifier::Static => "static",
            Modifier::Final => "final",
            Modifier::Native => "native",
        };
        write!(f, "{s}")
    }
}

/// True if `modifier` appears in the list.
pub fn has_modifier(modifiers: &[Modifier], modifier: Modifier) -> bool {
    modifiers.contains(&modifier)
}

#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub modifiers: Vec<Modifier>,
    pub ty: TypeRef,
    pub name: String,
    pub init: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub modifiers: Vec<Modifier>,
    pub return_ty: TypeRef,
    pub name: String,
    pub params: Vec<Param>,
    /// Declared `throws` types, recorded but only checked for resolvability.
    pub throws: Vec<TypeRef>,
    /// Absent for abstract and native methods.
    pub body: Option<Block>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ConstructorDecl {
    pub modifiers: Vec<Modifier>,
    pub name: String,
    pub params: Vec<Param>,
    pub throws: Vec<TypeRef>,
    pub body: Block,
    /// True for the default constructor synthesized when a class declares none.
    pub implicit: bool,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub ty: TypeRef,
    pub name: String,
    pub span: Span,
}

/// A syntactic type reference, resolved to a semantic `Ty` by the wash
/// pipeline.
#[derive(Debug, Clone)]
pub struct TypeRef {
    pub kind: TypeRefKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRefKind {
    Void,
    Boolean,
    Byte,
    Short,
    Int,
    Char,
    /// Simple or dotted type name.
    Named(String),
    Array(Box<TypeRefKind>),
}

impl fmt::Display for TypeRefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRefKind::Void => write!(f, "void"),
            TypeRefKind::Boolean => write!(f, "boolean"),
            TypeRefKind::Byte => write!(f, "byte"),
            TypeRefKind::Short => write!(f, "short"),
            TypeRefKind::Int => write!(f, "int"),
            TypeRefKind::Char => write!(f, "char"),
            TypeRefKind::Named(name) => write!(f, "{name}"),
            TypeRefKind::Array(elem) => write!(f, "{elem}[]"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Block {
    pub statements: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Stmt {
    pub id: NodeId,
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    Block(Block),
    Empty,
    Expr(Expr),
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    For {
        init: Option<Box<ForInit>>,
        cond: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
    },
    Return(Option<Expr>),
    LocalVar(LocalVarDecl),
}

#[derive(Debug, Clone)]
pub struct LocalVarDecl {
    /// Identity of the declaration, the key for definite-assignment and
    /// binding tables.
    pub id: NodeId,
    pub ty: TypeRef,
    pub name: String,
    pub init: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ForInit {
    Decl(LocalVarDecl),
    Expr(Expr),
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub id: NodeId,
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Literal(Literal),
    This,
    /// A possibly-qualified name, classified later by the disambiguator.
    Name(Name),
    /// Field access through a computed receiver (`foo().x`, `this.x`).
    FieldAccess {
        target: Box<Expr>,
        name: String,
    },
    ArrayAccess {
        array: Box<Expr>,
        index: Box<Expr>,
    },
    /// Method invocation; `recv` is absent for an unqualified call.
    Call {
        recv: Option<Box<Expr>>,
        name: String,
        args: Vec<Expr>,
    },
    New {
        ty: TypeRef,
        args: Vec<Expr>,
    },
    NewArray {
        elem: TypeRef,
        len: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    InstanceOf {
        expr: Box<Expr>,
        ty: TypeRef,
    },
    Cast {
        ty: TypeRef,
        expr: Box<Expr>,
    },
    Assign {
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

/// Dotted name as written in the source, before disambiguation.
#[derive(Debug, Clone)]
pub struct Name {
    pub ids: Vec<String>,
    pub span: Span,
}

impl Name {
    pub fn dotted(&self) -> String {
        self.ids.join(".")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Magnitude of a decimal literal. The weeder enforces the `[0, 2^31]`
    /// range and that `2^31` appears only under unary minus.
    Int(u64),
    Bool(bool),
    Char(char),
    Str(String),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Minus,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    /// Short-circuit `&&`.
    And,
    /// Short-circuit `||`.
    Or,
    /// Eager `&`.
    EagerAnd,
    /// Eager `|`.
    EagerOr,
}

impl BinaryOp {
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge | BinaryOp::Eq | BinaryOp::Ne
        )
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::EagerAnd => "&",
            BinaryOp::EagerOr => "|",
        };
        write!(f, "{s}")
    }
}
