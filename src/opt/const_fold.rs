//! Constant folding and algebraic simplification.
//!
//! Folding replaces arithmetic on two literals with a `const` holding the
//! computed value. Division by a literal zero folds to 0, matching the VM.

use crate::ir::{Inst, Op, Operand};

/// Fold arithmetic instructions whose operands are both literals.
pub fn const_fold(insts: &[Inst]) -> Vec<Inst> {
    insts
        .iter()
        .map(|ins| {
            if ins.op.is_binary() {
                if let (Some(dest), Some(a), Some(b)) = (
                    ins.dest.as_ref(),
                    ins.a.as_ref().and_then(Operand::as_imm),
                    ins.b.as_ref().and_then(Operand::as_imm),
                ) {
                    if let Some(val) = ins.op.eval(a, b) {
                        return Inst::constant(dest.clone(), val);
                    }
                }
            }
            ins.clone()
        })
        .collect()
}

/// Apply identity and annihilation rules.
///
/// `x+0`, `0+x`, `x*1`, `1*x` become moves; `x*0`, `0*x` become `const 0`.
/// No rule fires for subtraction or division.
pub fn algebraic_simplify(insts: &[Inst]) -> Vec<Inst> {
    insts
        .iter()
        .map(|ins| simplify(ins).unwrap_or_else(|| ins.clone()))
        .collect()
}

fn simplify(ins: &Inst) -> Option<Inst> {
    let dest = ins.dest.clone()?;
    let a = ins.a.clone()?;
    let b = ins.b.clone()?;
    match ins.op {
        Op::Add => {
            if b.as_imm() == Some(0) {
                return Some(Inst::mov(dest, a));
            }
            if a.as_imm() == Some(0) {
                return Some(Inst::mov(dest, b));
            }
            None
        }
        Op::Mul => {
            if a.as_imm() == Some(0) || b.as_imm() == Some(0) {
                return Some(Inst::constant(dest, 0));
            }
            if b.as_imm() == Some(1) {
                return Some(Inst::mov(dest, a));
            }
            if a.as_imm() == Some(1) {
                return Some(Inst::mov(dest, b));
            }
            None
        }
        _ => None,
    }
}
