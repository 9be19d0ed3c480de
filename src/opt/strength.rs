//! Strength reduction.
//!
//! Rewrites expensive arithmetic with cheap equivalents when the right
//! operand is a known power of two:
//!
//! * `x * 2`  becomes `x + x`
//! * `x * 4`  becomes `x << 2`
//! * `x / 2`  becomes `x >> 1`
//!
//! Division is floor division over signed integers, so the arithmetic
//! right shift is exact for negative operands too.

use crate::ir::{Cfg, Inst, Op, Operand};

/// Reduce multiplies and divides by small powers of two, per block.
pub fn strength_reduction(cfg: &mut Cfg) {
    for block in cfg.blocks.iter_mut() {
        for ins in block.insts.iter_mut() {
            if let Some(reduced) = reduce(ins) {
                *ins = reduced;
            }
        }
    }
}

fn reduce(ins: &Inst) -> Option<Inst> {
    let dest = ins.dest.clone()?;
    let a = ins.a.clone()?;
    let b = ins.b.as_ref().and_then(Operand::as_imm)?;
    match (ins.op, b) {
        (Op::Mul, 2) => Some(Inst::binary(Op::Add, dest, a.clone(), a)),
        (Op::Mul, 4) => Some(Inst::binary(Op::Shl, dest, a, Operand::Imm(2))),
        (Op::Div, 2) => Some(Inst::binary(Op::Shr, dest, a, Operand::Imm(1))),
        _ => None,
    }
}
