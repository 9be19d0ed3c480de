//! Bytecode emission.
//!
//! Lowers linear three-address IR to stack bytecode: operands become
//! `LOAD_CONST` / `LOAD_VAR` pushes, arithmetic becomes `BINARY_*`, and
//! a destination becomes a trailing `STORE_VAR`. Profiling annotations
//! survive as `PROFILE_ANNOTATION` markers so the instruction stream
//! stays inspectable after feedback-directed passes.

use crate::ir::{Inst, Name, Op, Operand};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stack machine opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BytecodeOp {
    LoadConst,
    LoadVar,
    StoreVar,
    BinaryAdd,
    BinarySub,
    BinaryMul,
    BinaryDiv,
    BinaryFloorDiv,
    BinaryShl,
    BinaryShr,
    Print,
    CallFunction,
    Return,
    ProfileAnnotation,
}

impl fmt::Display for BytecodeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BytecodeOp::LoadConst => "LOAD_CONST",
            BytecodeOp::LoadVar => "LOAD_VAR",
            BytecodeOp::StoreVar => "STORE_VAR",
            BytecodeOp::BinaryAdd => "BINARY_ADD",
            BytecodeOp::BinarySub => "BINARY_SUB",
            BytecodeOp::BinaryMul => "BINARY_MUL",
            BytecodeOp::BinaryDiv => "BINARY_DIV",
            BytecodeOp::BinaryFloorDiv => "BINARY_FLOOR_DIV",
            BytecodeOp::BinaryShl => "BINARY_SHL",
            BytecodeOp::BinaryShr => "BINARY_SHR",
            BytecodeOp::Print => "PRINT",
            BytecodeOp::CallFunction => "CALL_FUNCTION",
            BytecodeOp::Return => "RETURN",
            BytecodeOp::ProfileAnnotation => "PROFILE_ANNOTATION",
        };
        write!(f, "{}", name)
    }
}

/// A bytecode instruction argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BytecodeArg {
    Imm(i64),
    Name(Name),
    /// Free-form payload carried by profile annotations.
    Note(String),
}

/// One bytecode instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BytecodeInst {
    pub op: BytecodeOp,
    pub arg: Option<BytecodeArg>,
}

impl BytecodeInst {
    fn plain(op: BytecodeOp) -> Self {
        Self { op, arg: None }
    }

    fn with_imm(op: BytecodeOp, v: i64) -> Self {
        Self {
            op,
            arg: Some(BytecodeArg::Imm(v)),
        }
    }

    fn with_name(op: BytecodeOp, name: Name) -> Self {
        Self {
            op,
            arg: Some(BytecodeArg::Name(name)),
        }
    }
}

impl fmt::Display for BytecodeInst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.arg {
            Some(BytecodeArg::Imm(v)) => write!(f, "{} {}", self.op, v),
            Some(BytecodeArg::Name(n)) => write!(f, "{} {}", self.op, n),
            Some(BytecodeArg::Note(s)) => write!(f, "{} {}", self.op, s),
            None => write!(f, "{}", self.op),
        }
    }
}

/// Emit stack bytecode for a linear IR program.
pub fn emit(insts: &[Inst]) -> Vec<BytecodeInst> {
    let mut code = Vec::new();
    for ins in insts {
        emit_inst(ins, &mut code);
    }
    code
}

fn emit_inst(ins: &Inst, code: &mut Vec<BytecodeInst>) {
    if ins.op.is_annotation() {
        let payload = match ins.a.as_ref().and_then(|a| a.as_var()) {
            Some(name) => format!("{}:{}", ins.op, name),
            None => ins.op.to_string(),
        };
        code.push(BytecodeInst {
            op: BytecodeOp::ProfileAnnotation,
            arg: Some(BytecodeArg::Note(payload)),
        });
        return;
    }

    match ins.op {
        Op::Const => {
            if let Some(Operand::Imm(v)) = &ins.a {
                code.push(BytecodeInst::with_imm(BytecodeOp::LoadConst, *v));
                store(ins, code);
            }
        }
        Op::Mov => {
            push_operand(ins.a.as_ref(), code);
            store(ins, code);
        }
        Op::Print => {
            push_operand(ins.a.as_ref(), code);
            code.push(BytecodeInst::plain(BytecodeOp::Print));
        }
        Op::Return => {
            push_operand(ins.a.as_ref(), code);
            code.push(BytecodeInst::plain(BytecodeOp::Return));
        }
        Op::Call => {
            push_operand(ins.b.as_ref(), code);
            code.push(BytecodeInst::with_imm(BytecodeOp::LoadConst, 1));
            if let Some(callee) = ins.a.as_ref().and_then(|a| a.as_var()) {
                code.push(BytecodeInst::with_name(
                    BytecodeOp::CallFunction,
                    callee.clone(),
                ));
            }
            store(ins, code);
        }
        op if op.is_binary() => {
            push_operand(ins.a.as_ref(), code);
            push_operand(ins.b.as_ref(), code);
            code.push(BytecodeInst::plain(binary_op(op)));
            store(ins, code);
        }
        _ => {}
    }
}

fn binary_op(op: Op) -> BytecodeOp {
    match op {
        Op::Add => BytecodeOp::BinaryAdd,
        Op::Sub => BytecodeOp::BinarySub,
        Op::Mul => BytecodeOp::BinaryMul,
        Op::Div => BytecodeOp::BinaryDiv,
        Op::FloorDiv => BytecodeOp::BinaryFloorDiv,
        Op::Shl => BytecodeOp::BinaryShl,
        Op::Shr => BytecodeOp::BinaryShr,
        _ => unreachable!("not a binary op: {:?}", op),
    }
}

fn push_operand(operand: Option<&Operand>, code: &mut Vec<BytecodeInst>) {
    match operand {
        Some(Operand::Imm(v)) => code.push(BytecodeInst::with_imm(BytecodeOp::LoadConst, *v)),
        Some(Operand::Var(name)) => {
            code.push(BytecodeInst::with_name(BytecodeOp::LoadVar, name.clone()))
        }
        None => {}
    }
}

fn store(ins: &Inst, code: &mut Vec<BytecodeInst>) {
    if let Some(dest) = &ins.dest {
        code.push(BytecodeInst::with_name(BytecodeOp::StoreVar, dest.clone()));
    }
}
