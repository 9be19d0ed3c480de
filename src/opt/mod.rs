//! Optimization passes over the three-address IR.
//!
//! The local pipeline works on the linear instruction sequence; the
//! global pipeline builds a CFG, runs block-aware passes, and flattens
//! back. Passes never mutate their input in place; each one consumes a
//! sequence and emits a fresh one.

mod const_fold;
mod const_prop;
mod copy_prop;
mod cse;
mod dead_code;
mod strength;

pub use const_fold::{algebraic_simplify, const_fold};
pub use const_prop::{const_propagation, global_const_propagation};
pub use copy_prop::copy_propagation;
pub use cse::cse;
pub use dead_code::{dead_code_elim, global_dead_code_elim};
pub use strength::strength_reduction;

use crate::ir::{Cfg, Inst};

/// Run the local pipeline once, in its fixed order.
///
/// One run reaches a fixed point: propagation folds resolved arithmetic
/// at the point of use, so nothing a second run could fold remains.
pub fn optimize(insts: Vec<Inst>) -> Vec<Inst> {
    let passes: [(&str, fn(&[Inst]) -> Vec<Inst>); 5] = [
        ("const_fold", const_fold),
        ("const_propagation", const_propagation),
        ("algebraic_simplify", algebraic_simplify),
        ("cse", cse),
        ("dead_code_elim", dead_code_elim),
    ];

    let mut insts = insts;
    for (name, pass) in passes {
        let before = insts.len();
        insts = pass(&insts);
        if insts.len() != before {
            log::debug!("{}: {} -> {} instructions", name, before, insts.len());
        }
    }
    insts
}

/// Run the CFG-based pipeline on top of the local one.
pub fn optimize_global(insts: Vec<Inst>) -> Vec<Inst> {
    let mut cfg = Cfg::build(optimize(insts));
    strength_reduction(&mut cfg);
    global_const_propagation(&mut cfg);
    copy_propagation(&mut cfg);
    global_dead_code_elim(&mut cfg);
    log::debug!("global pipeline left {} instructions", cfg.inst_count());
    cfg.flatten()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Name, Op, Operand};

    #[test]
    fn test_local_pipeline_collapses_constant_expression() {
        // let x = 2 + 3 * 4; print(x)
        let insts = vec![
            Inst::binary(Op::Mul, Name::Temp(0), Operand::Imm(3), Operand::Imm(4)),
            Inst::binary(
                Op::Add,
                Name::Temp(1),
                Operand::Imm(2),
                Operand::Var(Name::Temp(0)),
            ),
            Inst::mov(Name::user("x"), Operand::Var(Name::Temp(1))),
            Inst::print(Operand::Var(Name::user("x"))),
        ];
        let out = optimize(insts);
        assert!(out.contains(&Inst::constant(Name::user("x"), 14)));
        assert!(out.contains(&Inst::print(Operand::Imm(14))));
        // the intermediate temporaries are dead once x is a known constant
        assert!(!out.iter().any(|i| i.op.is_binary()));
    }

    #[test]
    fn test_local_pipeline_is_idempotent() {
        let insts = vec![
            Inst::binary(Op::Mul, Name::Temp(0), Operand::Imm(3), Operand::Imm(4)),
            Inst::binary(
                Op::Add,
                Name::Temp(1),
                Operand::Imm(2),
                Operand::Var(Name::Temp(0)),
            ),
            Inst::mov(Name::user("x"), Operand::Var(Name::Temp(1))),
            Inst::print(Operand::Var(Name::user("x"))),
        ];
        let once = optimize(insts);
        let twice = optimize(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_global_pipeline_strength_reduces() {
        let insts = vec![
            Inst::binary(
                Op::Mul,
                Name::Temp(0),
                Operand::Var(Name::user("x")),
                Operand::Imm(4),
            ),
            Inst::mov(Name::user("y"), Operand::Var(Name::Temp(0))),
            Inst::print(Operand::Var(Name::user("y"))),
        ];
        let out = optimize_global(insts);
        assert!(out
            .iter()
            .any(|i| i.op == Op::Shl && i.b == Some(Operand::Imm(2))));
    }
}
