//! Common subexpression elimination.
//!
//! Tracks arithmetic instructions by `(op, a, b)` and rewrites later
//! duplicates as a `mov` from the first result. Only expressions whose
//! destination is a temporary and whose variable operands are themselves
//! temporaries are eligible; temporaries are single-assignment, so an
//! earlier result is still live and still holds the same value. User
//! variables can be reassigned between the two sites, which would make
//! reuse unsound.

use crate::ir::{Inst, Name, Op, Operand};
use std::collections::HashMap;

/// Eliminate duplicate arithmetic over temporaries.
pub fn cse(insts: &[Inst]) -> Vec<Inst> {
    let mut seen: HashMap<(Op, Operand, Operand), Name> = HashMap::new();
    let mut out = Vec::with_capacity(insts.len());

    for ins in insts {
        if let Some((key, dest)) = key(ins) {
            match seen.get(&key) {
                Some(prev) => {
                    out.push(Inst::mov(dest, Operand::Var(prev.clone())));
                }
                None => {
                    seen.insert(key, dest);
                    out.push(ins.clone());
                }
            }
        } else {
            out.push(ins.clone());
        }
    }

    out
}

fn key(ins: &Inst) -> Option<((Op, Operand, Operand), Name)> {
    if !ins.op.is_binary() {
        return None;
    }
    let dest = match &ins.dest {
        Some(dest @ Name::Temp(_)) => dest.clone(),
        _ => return None,
    };
    let a = ins.a.clone()?;
    let b = ins.b.clone()?;
    if !eligible(&a) || !eligible(&b) {
        return None;
    }
    Some(((ins.op, a, b), dest))
}

fn eligible(operand: &Operand) -> bool {
    match operand {
        Operand::Imm(_) => true,
        Operand::Var(Name::Temp(_)) => true,
        Operand::Var(Name::User(_)) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp(n: u32) -> Operand {
        Operand::Var(Name::Temp(n))
    }

    #[test]
    fn test_duplicate_becomes_mov() {
        let insts = vec![
            Inst::binary(Op::Add, Name::Temp(0), Operand::Imm(2), Operand::Imm(3)),
            Inst::binary(Op::Add, Name::Temp(1), Operand::Imm(2), Operand::Imm(3)),
        ];
        let out = cse(&insts);
        assert_eq!(out[0], insts[0]);
        assert_eq!(out[1], Inst::mov(Name::Temp(1), temp(0)));
    }

    #[test]
    fn test_user_variable_operands_are_not_reused() {
        // x may be reassigned between the two sites
        let x = Operand::Var(Name::user("x"));
        let insts = vec![
            Inst::binary(Op::Mul, Name::Temp(0), x.clone(), Operand::Imm(2)),
            Inst::binary(Op::Mul, Name::Temp(1), x.clone(), Operand::Imm(2)),
        ];
        let out = cse(&insts);
        assert_eq!(out, insts);
    }

    #[test]
    fn test_user_destination_is_not_a_candidate() {
        let insts = vec![
            Inst::binary(Op::Add, Name::user("x"), Operand::Imm(1), Operand::Imm(2)),
            Inst::binary(Op::Add, Name::Temp(0), Operand::Imm(1), Operand::Imm(2)),
        ];
        let out = cse(&insts);
        // the user-dest instruction is neither recorded nor rewritten
        assert_eq!(out, insts);
    }

    #[test]
    fn test_operand_order_matters() {
        let insts = vec![
            Inst::binary(Op::Sub, Name::Temp(0), Operand::Imm(5), Operand::Imm(3)),
            Inst::binary(Op::Sub, Name::Temp(1), Operand::Imm(3), Operand::Imm(5)),
        ];
        let out = cse(&insts);
        assert_eq!(out, insts);
    }

    #[test]
    fn test_chained_temp_expressions() {
        let insts = vec![
            Inst::binary(Op::Add, Name::Temp(0), Operand::Imm(1), Operand::Imm(1)),
            Inst::binary(Op::Mul, Name::Temp(1), temp(0), Operand::Imm(4)),
            Inst::binary(Op::Mul, Name::Temp(2), temp(0), Operand::Imm(4)),
        ];
        let out = cse(&insts);
        assert_eq!(out[2], Inst::mov(Name::Temp(2), temp(1)));
    }
}
