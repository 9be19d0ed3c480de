//! Constant propagation.
//!
//! Maintains a map from name to known literal value, fed by `const`
//! definitions and moves of constants, and substitutes known values into
//! the operands of later instructions. When substitution resolves both
//! operands of an arithmetic instruction, the instruction folds to a
//! `const` at the point of use, so one pipeline run reaches a fixed
//! point. A non-constant redefinition invalidates the map entry.
//!
//! The global variant applies the same analysis per basic block; it sees
//! the shift operators introduced by strength reduction.

use crate::ir::{Cfg, Inst, Name, Op, Operand};
use std::collections::HashMap;

/// Propagate constants through a linear instruction sequence.
pub fn const_propagation(insts: &[Inst]) -> Vec<Inst> {
    propagate(insts)
}

/// Propagate constants block-locally across a CFG.
pub fn global_const_propagation(cfg: &mut Cfg) {
    for block in cfg.blocks.iter_mut() {
        block.insts = propagate(&block.insts);
    }
}

fn propagate(insts: &[Inst]) -> Vec<Inst> {
    let mut consts: HashMap<Name, i64> = HashMap::new();
    let mut out = Vec::with_capacity(insts.len());

    for ins in insts {
        match ins.op {
            Op::Const => {
                if let (Some(dest), Some(v)) =
                    (ins.dest.as_ref(), ins.a.as_ref().and_then(Operand::as_imm))
                {
                    consts.insert(dest.clone(), v);
                }
                out.push(ins.clone());
            }
            Op::Mov => {
                let dest = match ins.dest.clone() {
                    Some(d) => d,
                    None => {
                        out.push(ins.clone());
                        continue;
                    }
                };
                let src = subst(ins.a.clone(), &consts);
                match src {
                    Some(Operand::Imm(v)) => {
                        consts.insert(dest.clone(), v);
                        out.push(Inst::constant(dest, v));
                    }
                    src => {
                        consts.remove(&dest);
                        out.push(Inst {
                            op: Op::Mov,
                            dest: Some(dest),
                            a: src,
                            b: None,
                        });
                    }
                }
            }
            op if op.is_binary() => {
                let a = subst(ins.a.clone(), &consts);
                let b = subst(ins.b.clone(), &consts);
                let dest = ins.dest.clone();
                // both operands resolved: fold at the point of use
                if let (Some(dest), Some(Operand::Imm(av)), Some(Operand::Imm(bv))) =
                    (dest.clone(), a.as_ref(), b.as_ref())
                {
                    if let Some(val) = op.eval(*av, *bv) {
                        consts.insert(dest.clone(), val);
                        out.push(Inst::constant(dest, val));
                        continue;
                    }
                }
                if let Some(dest) = &dest {
                    consts.remove(dest);
                }
                out.push(Inst { op, dest, a, b });
            }
            Op::Print | Op::Return => {
                out.push(Inst {
                    op: ins.op,
                    dest: None,
                    a: subst(ins.a.clone(), &consts),
                    b: None,
                });
            }
            Op::Call => {
                // `a` is the callee name, never a value; only the argument
                // participates in propagation
                if let Some(dest) = &ins.dest {
                    consts.remove(dest);
                }
                out.push(Inst {
                    op: Op::Call,
                    dest: ins.dest.clone(),
                    a: ins.a.clone(),
                    b: subst(ins.b.clone(), &consts),
                });
            }
            _ => out.push(ins.clone()),
        }
    }

    out
}

fn subst(operand: Option<Operand>, consts: &HashMap<Name, i64>) -> Option<Operand> {
    match operand {
        Some(Operand::Var(name)) => match consts.get(&name) {
            Some(&v) => Some(Operand::Imm(v)),
            None => Some(Operand::Var(name)),
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp(n: u32) -> Operand {
        Operand::Var(Name::Temp(n))
    }

    #[test]
    fn test_substitutes_and_folds_at_use() {
        let insts = vec![
            Inst::constant(Name::Temp(0), 12),
            Inst::binary(Op::Add, Name::Temp(1), Operand::Imm(2), temp(0)),
            Inst::mov(Name::user("x"), temp(1)),
            Inst::print(Operand::Var(Name::user("x"))),
        ];
        let out = const_propagation(&insts);
        assert_eq!(out[1], Inst::constant(Name::Temp(1), 14));
        assert_eq!(out[2], Inst::constant(Name::user("x"), 14));
        assert_eq!(out[3], Inst::print(Operand::Imm(14)));
    }

    #[test]
    fn test_redefinition_invalidates_entry() {
        let insts = vec![
            Inst::constant(Name::user("x"), 1),
            Inst::binary(
                Op::Add,
                Name::user("x"),
                Operand::Var(Name::user("y")),
                Operand::Imm(1),
            ),
            Inst::print(Operand::Var(Name::user("x"))),
        ];
        let out = const_propagation(&insts);
        // x was redefined by a non-constant instruction; the print must
        // not see the stale literal
        assert_eq!(out[2], Inst::print(Operand::Var(Name::user("x"))));
    }

    #[test]
    fn test_call_argument_substituted_callee_untouched() {
        let insts = vec![
            Inst::constant(Name::user("n"), 5),
            Inst::call(
                Name::Temp(0),
                Name::user("factorial"),
                Operand::Var(Name::user("n")),
            ),
        ];
        let out = const_propagation(&insts);
        assert_eq!(
            out[1],
            Inst {
                op: Op::Call,
                dest: Some(Name::Temp(0)),
                a: Some(Operand::Var(Name::user("factorial"))),
                b: Some(Operand::Imm(5)),
            }
        );
    }

    #[test]
    fn test_idempotent_on_own_output() {
        let insts = vec![
            Inst::constant(Name::Temp(0), 12),
            Inst::binary(Op::Add, Name::Temp(1), Operand::Imm(2), temp(0)),
            Inst::mov(Name::user("x"), temp(1)),
        ];
        let once = const_propagation(&insts);
        let twice = const_propagation(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_global_variant_folds_shifts() {
        let insts = vec![
            Inst::constant(Name::Temp(0), 3),
            Inst::binary(Op::Shl, Name::Temp(1), temp(0), Operand::Imm(2)),
        ];
        let mut cfg = Cfg::build(insts);
        global_const_propagation(&mut cfg);
        assert_eq!(cfg.flatten()[1], Inst::constant(Name::Temp(1), 12));
    }
}
