//! Copy propagation over the CFG.
//!
//! Within each block, a `mov` records that its destination currently
//! equals its source; later operands read through the record. Moves into
//! temporaries are elided outright once recorded (temporaries are
//! single-assignment, the value is reachable through the source). Moves
//! into user variables stay, since the variable is observable state, but
//! their reads still forward. Any redefinition of a name drops its record
//! and every record whose value reads that name.

use crate::ir::{Cfg, Inst, Name, Op, Operand};
use std::collections::HashMap;

/// Propagate and elide copies, block-locally.
pub fn copy_propagation(cfg: &mut Cfg) {
    for block in cfg.blocks.iter_mut() {
        block.insts = run_block(&block.insts);
    }
}

fn run_block(insts: &[Inst]) -> Vec<Inst> {
    let mut copies: HashMap<Name, Operand> = HashMap::new();
    let mut out = Vec::with_capacity(insts.len());

    for ins in insts {
        match ins.op {
            Op::Mov => {
                let (dest, src) = match (ins.dest.clone(), ins.a.clone()) {
                    (Some(d), Some(s)) => (d, s),
                    _ => {
                        out.push(ins.clone());
                        continue;
                    }
                };
                let src = resolve(src, &copies);
                invalidate(&dest, &mut copies);
                copies.insert(dest.clone(), src.clone());
                if matches!(dest, Name::User(_)) {
                    out.push(Inst::mov(dest, src));
                }
            }
            Op::Const => {
                let dest = ins.dest.clone();
                if let (Some(dest), Some(Operand::Imm(v))) = (&dest, &ins.a) {
                    invalidate(dest, &mut copies);
                    copies.insert(dest.clone(), Operand::Imm(*v));
                }
                out.push(ins.clone());
            }
            op if op.is_annotation() => out.push(ins.clone()),
            Op::Call => {
                let b = ins.b.clone().map(|b| resolve(b, &copies));
                if let Some(dest) = &ins.dest {
                    invalidate(dest, &mut copies);
                }
                out.push(Inst {
                    op: Op::Call,
                    dest: ins.dest.clone(),
                    a: ins.a.clone(),
                    b,
                });
            }
            op => {
                let a = ins.a.clone().map(|a| resolve(a, &copies));
                let b = ins.b.clone().map(|b| resolve(b, &copies));
                if let Some(dest) = &ins.dest {
                    invalidate(dest, &mut copies);
                }
                out.push(Inst {
                    op,
                    dest: ins.dest.clone(),
                    a,
                    b,
                });
            }
        }
    }

    out
}

fn resolve(operand: Operand, copies: &HashMap<Name, Operand>) -> Operand {
    match &operand {
        Operand::Var(name) => copies.get(name).cloned().unwrap_or(operand),
        Operand::Imm(_) => operand,
    }
}

/// Drop the record for `dest` and every record reading `dest`.
fn invalidate(dest: &Name, copies: &mut HashMap<Name, Operand>) {
    copies.remove(dest);
    copies.retain(|_, v| v.as_var() != Some(dest));
}
