//! Canonical three-address IR.
//!
//! Method bodies lower into flat instruction lists over an unbounded pool
//! of temporaries; expressions produce a (statements, value) pair, so no
//! nested statement forms exist and every instruction maps onto a small
//! number of x86 tiles.

use std::fmt;

/// A virtual register. Parameters occupy the first ids of a function.
pub type Temp = u32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Const(i32),
    Temp(Temp),
    /// Address of an assembly label (static field, vtable, string literal,
    /// function).
    Name(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Const(v) => write!(f, "{v}"),
            Value::Temp(t) => write!(f, "t{t}"),
            Value::Name(n) => write!(f, "{n}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    /// Bitwise and/or, used for the eager boolean operators.
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinOp {
    pub fn is_comparison(&self) -> bool {
        matches!(self, BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge)
    }

    /// x86 condition-code suffix for comparison operators.
    pub fn cc(&self) -> &'static str {
        match self {
            BinOp::Eq => "e",
            BinOp::Ne => "ne",
            BinOp::Lt => "l",
            BinOp::Le => "le",
            BinOp::Gt => "g",
            BinOp::Ge => "ge",
            _ => unreachable!("not a comparison"),
        }
    }
}

/// Width adjustment for narrowing casts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtKind {
    /// Sign-extend the low byte.
    Byte,
    /// Sign-extend the low 16 bits.
    Short,
    /// Zero-extend the low 16 bits.
    Char,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallTarget {
    /// Direct call: static methods, constructors, runtime helpers.
    Label(String),
    /// Virtual dispatch through the receiver's vtable slot.
    Virtual { recv: Value, slot: usize },
}

#[derive(Debug, Clone)]
pub enum Instr {
    Label(String),
    Move { dst: Temp, src: Value },
    Bin { dst: Temp, op: BinOp, lhs: Value, rhs: Value },
    /// dst = mem[base + offset]
    Load { dst: Temp, base: Value, offset: i32 },
    /// mem[base + offset] = src
    Store { base: Value, offset: i32, src: Value },
    Jump(String),
    /// Branch on a boolean value; both successor labels are explicit.
    CJump { cond: Value, if_true: String, if_false: String },
    Call { dst: Option<Temp>, target: CallTarget, args: Vec<Value> },
    Return(Option<Value>),
    Ext { dst: Temp, src: Value, kind: ExtKind },
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instr::Label(l) => write!(f, "{l}:"),
            Instr::Move { dst, src } => write!(f, "  t{dst} <- {src}"),
            Instr::Bin { dst, op, lhs, rhs } => write!(f, "  t{dst} <- {lhs} {op:?} {rhs}"),
            Instr::Load { dst, base, offset } => write!(f, "  t{dst} <- [{base} + {offset}]"),
            Instr::Store { base, offset, src } => write!(f, "  [{base} + {offset}] <- {src}"),
            Instr::Jump(l) => write!(f, "  jump {l}"),
            Instr::CJump { cond, if_true, if_false } => {
                write!(f, "  cjump {cond} ? {if_true} : {if_false}")
            }
            Instr::Call { dst, target, args } => {
                write!(f, "  ")?;
                if let Some(dst) = dst {
                    write!(f, "t{dst} <- ")?;
                }
                match target {
                    CallTarget::Label(l) => write!(f, "call {l}(")?,
                    CallTarget::Virtual { recv, slot } => {
                        write!(f, "call [{recv}.vtable+{slot}](")?
                    }
                }
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            Instr::Return(None) => write!(f, "  return"),
            Instr::Return(Some(v)) => write!(f, "  return {v}"),
            Instr::Ext { dst, src, kind } => write!(f, "  t{dst} <- ext{kind:?}({src})"),
        }
    }
}

/// One lowered function: a method, constructor or static initializer.
#[derive(Debug)]
pub struct IrFunction {
    pub label: String,
    /// Parameters occupy temps `0..num_params`, receiver first for
    /// instance methods and constructors.
    pub num_params: usize,
    pub body: Vec<Instr>,
    pub next_temp: Temp,
}

/// A string literal's emitted data: the String object and its backing
/// char array.
#[derive(Debug, Clone)]
pub struct StringLit {
    pub object_label: String,
    pub chars_label: String,
    pub value: String,
}

/// Everything lowered from one compilation unit.
#[derive(Debug)]
pub struct IrUnit {
    /// Index of the source unit (also its type id).
    pub unit: usize,
    pub class_name: String,
    pub is_class: bool,
    pub functions: Vec<IrFunction>,
    /// Label of the static-field initializer function, called from
    /// `_start`; `None` for interfaces.
    pub init_label: Option<String>,
    /// Static field data labels, each a zero-initialized word.
    pub static_fields: Vec<String>,
    pub strings: Vec<StringLit>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instr_display() {
        let i = Instr::Bin { dst: 3, op: BinOp::Add, lhs: Value::Temp(1), rhs: Value::Const(2) };
        assert_eq!(i.to_string(), "  t3 <- t1 Add 2");
        let c = Instr::CJump {
            cond: Value::Temp(0),
            if_true: ".L1".into(),
            if_false: ".L2".into(),
        };
        assert_eq!(c.to_string(), "  cjump t0 ? .L1 : .L2");
    }

    #[test]
    fn comparison_condition_codes() {
        assert_eq!(BinOp::Eq.cc(), "e");
        assert_eq!(BinOp::Ge.cc(), "ge");
        assert!(BinOp::Lt.is_comparison());
        assert!(!BinOp::Add.is_comparison());
    }
}
