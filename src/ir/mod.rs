//! Three-address intermediate representation.
//!
//! The IR is the form between the AST and stack bytecode. Instructions are
//! immutable once created; optimization passes emit fresh sequences rather
//! than mutating in place.
//!
//! # Structure
//!
//! ```text
//! Vec<Inst>            linear program (pre-CFG)
//! Cfg
//! └── BasicBlocks
//!     └── Instructions
//! ```

pub mod cfg;
pub mod lower;

pub use cfg::{BasicBlock, BlockId, Cfg};

use serde::{Deserialize, Serialize};
use std::fmt;

/// A value name in the IR.
///
/// Temporaries are compiler-generated and assigned exactly once by the
/// builder; user names come from `let` targets and may be redefined.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Name {
    /// User-visible variable from the source program.
    User(String),
    /// Compiler-generated temporary.
    Temp(u32),
}

impl Name {
    /// Create a user-variable name.
    pub fn user(name: impl Into<String>) -> Self {
        Name::User(name.into())
    }

    /// Is this a compiler-generated temporary?
    pub fn is_temp(&self) -> bool {
        matches!(self, Name::Temp(_))
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Name::User(s) => write!(f, "{}", s),
            Name::Temp(n) => write!(f, "%t{}", n),
        }
    }
}

/// An instruction operand.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operand {
    /// Numeric literal.
    Imm(i64),
    /// Variable or temporary reference.
    Var(Name),
}

impl Operand {
    /// Get as immediate if applicable.
    pub fn as_imm(&self) -> Option<i64> {
        match self {
            Operand::Imm(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as variable name if applicable.
    pub fn as_var(&self) -> Option<&Name> {
        match self {
            Operand::Var(n) => Some(n),
            _ => None,
        }
    }

    /// Is this an immediate?
    pub fn is_imm(&self) -> bool {
        matches!(self, Operand::Imm(_))
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Imm(v) => write!(f, "{}", v),
            Operand::Var(n) => write!(f, "{}", n),
        }
    }
}

/// IR opcodes.
///
/// `FloorDiv` is the type-specialized division emitted by the feedback
/// optimizer; with the all-integer value model it shares floor semantics
/// with `Div`. The three annotation opcodes carry profile hints and have
/// no execution effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Op {
    Const,
    Mov,
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Shl,
    Shr,
    Print,
    Call,
    Return,
    HotAnnotation,
    BranchHint,
    InlineCandidate,
}

impl Op {
    /// Is this a two-operand arithmetic operation?
    pub fn is_binary(self) -> bool {
        matches!(
            self,
            Op::Add | Op::Sub | Op::Mul | Op::Div | Op::FloorDiv | Op::Shl | Op::Shr
        )
    }

    /// Is this a profiling annotation?
    pub fn is_annotation(self) -> bool {
        matches!(self, Op::HotAnnotation | Op::BranchHint | Op::InlineCandidate)
    }

    /// Evaluate a binary operation on two literals.
    ///
    /// Division by zero yields 0 rather than failing; division is floor
    /// division so that `x / 2` and `x >> 1` agree for all integers.
    pub fn eval(self, a: i64, b: i64) -> Option<i64> {
        Some(match self {
            Op::Add => a.wrapping_add(b),
            Op::Sub => a.wrapping_sub(b),
            Op::Mul => a.wrapping_mul(b),
            Op::Div | Op::FloorDiv => {
                if b == 0 {
                    0
                } else {
                    a.div_euclid(b)
                }
            }
            Op::Shl => a.wrapping_shl(b as u32),
            Op::Shr => a.wrapping_shr(b as u32),
            _ => return None,
        })
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Op::Const => "const",
            Op::Mov => "mov",
            Op::Add => "+",
            Op::Sub => "-",
            Op::Mul => "*",
            Op::Div => "/",
            Op::FloorDiv => "//",
            Op::Shl => "<<",
            Op::Shr => ">>",
            Op::Print => "print",
            Op::Call => "call",
            Op::Return => "return",
            Op::HotAnnotation => "hot_annotation",
            Op::BranchHint => "branch_hint",
            Op::InlineCandidate => "inline_candidate",
        };
        write!(f, "{}", name)
    }
}

/// A three-address instruction.
///
/// Every instruction with a `dest` defines that name at that point in
/// program order; `print` never has a dest. For `Call`, `a` holds the
/// callee name and `b` the single argument (two-argument builtins are
/// expanded structurally by the builder).
#[derive(Debug, Clone, PartialEq)]
pub struct Inst {
    pub op: Op,
    pub dest: Option<Name>,
    pub a: Option<Operand>,
    pub b: Option<Operand>,
}

impl Inst {
    /// Create `dest = <literal>`.
    pub fn constant(dest: Name, value: i64) -> Self {
        Self {
            op: Op::Const,
            dest: Some(dest),
            a: Some(Operand::Imm(value)),
            b: None,
        }
    }

    /// Create `dest = src`. A literal source is folded into a `const`.
    pub fn mov(dest: Name, src: Operand) -> Self {
        match src {
            Operand::Imm(v) => Self::constant(dest, v),
            src => Self {
                op: Op::Mov,
                dest: Some(dest),
                a: Some(src),
                b: None,
            },
        }
    }

    /// Create `dest = a <op> b`.
    pub fn binary(op: Op, dest: Name, a: Operand, b: Operand) -> Self {
        Self {
            op,
            dest: Some(dest),
            a: Some(a),
            b: Some(b),
        }
    }

    /// Create `print value`.
    pub fn print(value: Operand) -> Self {
        Self {
            op: Op::Print,
            dest: None,
            a: Some(value),
            b: None,
        }
    }

    /// Create `dest = call callee(arg)`.
    pub fn call(dest: Name, callee: Name, arg: Operand) -> Self {
        Self {
            op: Op::Call,
            dest: Some(dest),
            a: Some(Operand::Var(callee)),
            b: Some(arg),
        }
    }

    /// Create `return value`.
    pub fn ret(value: Operand) -> Self {
        Self {
            op: Op::Return,
            dest: None,
            a: Some(value),
            b: None,
        }
    }

    /// Create a profiling annotation carrying a name payload.
    pub fn annotation(op: Op, name: Name) -> Self {
        debug_assert!(op.is_annotation());
        Self {
            op,
            dest: None,
            a: Some(Operand::Var(name)),
            b: None,
        }
    }

    /// The name this instruction defines, if any.
    pub fn def(&self) -> Option<&Name> {
        self.dest.as_ref()
    }

    /// Names this instruction reads as values.
    ///
    /// For `Call` the `a` slot is the callee, not a data dependency, and
    /// annotation payloads are labels rather than values.
    pub fn uses(&self) -> Vec<&Name> {
        if self.op.is_annotation() {
            return Vec::new();
        }
        let slots = if self.op == Op::Call {
            [None, self.b.as_ref()]
        } else {
            [self.a.as_ref(), self.b.as_ref()]
        };
        slots
            .into_iter()
            .flatten()
            .filter_map(|op| op.as_var())
            .collect()
    }
}

impl fmt::Display for Inst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let none = Operand::Imm(0);
        let a = self.a.as_ref().unwrap_or(&none);
        match self.op {
            Op::Const | Op::Mov => {
                if let Some(dest) = &self.dest {
                    write!(f, "{} = {}", dest, a)
                } else {
                    write!(f, "{} {}", self.op, a)
                }
            }
            Op::Print => write!(f, "print {}", a),
            Op::Return => write!(f, "return {}", a),
            Op::Call => {
                let arg = self.b.as_ref().unwrap_or(&none);
                if let Some(dest) = &self.dest {
                    write!(f, "{} = call {}({})", dest, a, arg)
                } else {
                    write!(f, "call {}({})", a, arg)
                }
            }
            op if op.is_annotation() => write!(f, "{} {}", op, a),
            op => {
                let b = self.b.as_ref().unwrap_or(&none);
                if let Some(dest) = &self.dest {
                    write!(f, "{} = {} {} {}", dest, a, op, b)
                } else {
                    write!(f, "{} {} {}", a, op, b)
                }
            }
        }
    }
}
