//! Instruction set for Quill function bodies
//!
//! Control flow owns its branches as nested instruction lists; there are
//! no jump offsets to compute or patch.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One executable step in a lowered function body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Op {
    /// Push a literal, still in its source spelling, onto the operand stack.
    Push(String),

    /// Read a variable from the current frame.
    LoadVar(String),

    /// Pop a value into a variable in the current frame.
    StoreVar(String),

    /// Call a builtin, user-defined function, or extern function.
    Call(String),

    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,

    // Comparison
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,

    /// Boolean negation.
    Not,

    /// Pop a bool and run one of the two branches.
    If { then_ops: Vec<Op>, else_ops: Vec<Op> },

    /// Run `condition`, pop a bool, run `body` and repeat while true.
    /// The condition list is re-executed before every iteration.
    Loop { condition: Vec<Op>, body: Vec<Op> },

    /// Return from the enclosing function call.
    Return,
}

impl Op {
    /// Map an operator lexeme to its instruction.
    pub fn from_symbol(symbol: &str) -> Option<Op> {
        match symbol {
            "+" => Some(Op::Add),
            "-" => Some(Op::Sub),
            "*" => Some(Op::Mul),
            "/" => Some(Op::Div),
            "==" => Some(Op::Eq),
            "!=" => Some(Op::Ne),
            "<" => Some(Op::Lt),
            ">" => Some(Op::Gt),
            "<=" => Some(Op::Le),
            ">=" => Some(Op::Ge),
            "!" => Some(Op::Not),
            _ => None,
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Push(literal) => write!(f, "push {}", literal),
            Op::LoadVar(name) => write!(f, "load_var {}", name),
            Op::StoreVar(name) => write!(f, "store_var {}", name),
            Op::Call(name) => write!(f, "call {}", name),
            Op::Add => write!(f, "+"),
            Op::Sub => write!(f, "-"),
            Op::Mul => write!(f, "*"),
            Op::Div => write!(f, "/"),
            Op::Eq => write!(f, "=="),
            Op::Ne => write!(f, "!="),
            Op::Lt => write!(f, "<"),
            Op::Gt => write!(f, ">"),
            Op::Le => write!(f, "<="),
            Op::Ge => write!(f, ">="),
            Op::Not => write!(f, "!"),
            Op::If { .. } => write!(f, "if"),
            Op::Loop { .. } => write!(f, "loop"),
            Op::Return => write!(f, "return"),
        }
    }
}
