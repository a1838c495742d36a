//! Expression VM opcodes (§4.5).

use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Func {
    Int,
    Double,
    Abs,
    Round,
    Rand,
    Srand,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Ceil,
    Floor,
    Exp,
    Log,
    Log10,
    Sqrt,
}

impl Func {
    pub fn from_name(name: &str) -> Option<Func> {
        Some(match name {
            "int" => Func::Int,
            "double" => Func::Double,
            "abs" => Func::Abs,
            "round" => Func::Round,
            "rand" => Func::Rand,
            "srand" => Func::Srand,
            "sin" => Func::Sin,
            "cos" => Func::Cos,
            "tan" => Func::Tan,
            "asin" => Func::Asin,
            "acos" => Func::Acos,
            "atan" => Func::Atan,
            "sinh" => Func::Sinh,
            "cosh" => Func::Cosh,
            "tanh" => Func::Tanh,
            "ceil" => Func::Ceil,
            "floor" => Func::Floor,
            "exp" => Func::Exp,
            "log" => Func::Log,
            "log10" => Func::Log10,
            "sqrt" => Func::Sqrt,
            _ => return None,
        })
    }

    pub fn arity(self) -> usize {
        match self {
            Func::Rand | Func::Srand => 0,
            _ => 1,
        }
    }
}

/// Flat opcode stream emitted by [`super::compiler::compile`]. Jump
/// targets are absolute indices into this vector, patched after the
/// target's position is known ("backpatching"), which is the concrete
/// encoding this crate uses for the spec's `LEFT(skipN) … RIGHT` lazy
/// operator shape (see DESIGN.md).
#[derive(Debug, Clone)]
pub enum Opcode {
    PushInt(i64),
    PushDouble(f64),
    PushStr(Rc<str>),
    PushVar(Rc<str>),
    PushCmd(Rc<str>),

    Neg,
    Pos,
    Not,
    BitNot,

    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,

    Shl,
    Shr,
    RotL,
    RotR,

    Lt,
    Le,
    Gt,
    Ge,
    NumEq,
    NumNe,

    StrEq,
    StrNe,
    StrIn,
    StrNi,

    BitAnd,
    BitXor,
    BitOr,

    /// Normalise top-of-stack truthiness to an integer `0`/`1`.
    ToBool,

    Jump(usize),
    /// Pop; if falsy, jump to target.
    JumpIfFalse(usize),
    /// Pop; if truthy, jump to target.
    JumpIfTrue(usize),

    Call(Func, usize),
}
