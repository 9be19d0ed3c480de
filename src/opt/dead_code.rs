//! Dead code elimination.
//!
//! Liveness seeds from the variables that `print` instructions read and
//! closes backwards over each kept definition's operands. Instructions
//! with no destination always survive, as do profiling annotations. A
//! program whose prints read only literals (or that has no prints at
//! all) yields no roots; elimination then keeps everything rather than
//! guess at what is observable.
//!
//! The global variant builds the dependency map across the whole CFG and
//! then filters each block with the shared live set.

use crate::ir::{Cfg, Inst, Name, Op};
use std::collections::{HashMap, HashSet};

/// Remove definitions no `print` transitively depends on.
pub fn dead_code_elim(insts: &[Inst]) -> Vec<Inst> {
    match live_set(insts.iter()) {
        Some(live) => insts.iter().filter(|i| keep(i, &live)).cloned().collect(),
        None => insts.to_vec(),
    }
}

/// CFG-wide elimination with a single live set over all blocks.
pub fn global_dead_code_elim(cfg: &mut Cfg) {
    let live = match live_set(cfg.iter_blocks().flat_map(|b| b.insts.iter())) {
        Some(live) => live,
        None => return,
    };
    for block in cfg.blocks.iter_mut() {
        block.insts.retain(|i| keep(i, &live));
    }
}

/// Close liveness backwards from print roots. `None` means no roots
/// exist and the caller must keep everything.
fn live_set<'a>(insts: impl Iterator<Item = &'a Inst>) -> Option<HashSet<Name>> {
    let mut deps: HashMap<Name, Vec<Name>> = HashMap::new();
    let mut roots: Vec<Name> = Vec::new();

    for ins in insts {
        if ins.op == Op::Print {
            roots.extend(ins.uses().into_iter().cloned());
        }
        if let Some(dest) = ins.def() {
            // every definition of a live name is retained, so every
            // definition's operands must be live too
            deps.entry(dest.clone())
                .or_default()
                .extend(ins.uses().into_iter().cloned());
        }
    }

    if roots.is_empty() {
        return None;
    }

    let mut live: HashSet<Name> = HashSet::new();
    let mut worklist = roots;
    while let Some(name) = worklist.pop() {
        if !live.insert(name.clone()) {
            continue;
        }
        if let Some(uses) = deps.get(&name) {
            worklist.extend(uses.iter().cloned());
        }
    }
    Some(live)
}

fn keep(ins: &Inst, live: &HashSet<Name>) -> bool {
    if ins.op.is_annotation() {
        return true;
    }
    match ins.def() {
        Some(dest) => live.contains(dest),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Operand;

    fn temp(n: u32) -> Operand {
        Operand::Var(Name::Temp(n))
    }

    #[test]
    fn test_unused_definition_is_removed() {
        let insts = vec![
            Inst::constant(Name::user("x"), 1),
            Inst::constant(Name::user("y"), 2),
            Inst::print(Operand::Var(Name::user("x"))),
        ];
        let out = dead_code_elim(&insts);
        assert_eq!(out, vec![insts[0].clone(), insts[2].clone()]);
    }

    #[test]
    fn test_liveness_is_transitive() {
        let insts = vec![
            Inst::constant(Name::Temp(0), 3),
            Inst::binary(Op::Add, Name::Temp(1), temp(0), Operand::Imm(1)),
            Inst::mov(Name::user("x"), temp(1)),
            Inst::constant(Name::Temp(2), 99),
            Inst::print(Operand::Var(Name::user("x"))),
        ];
        let out = dead_code_elim(&insts);
        assert_eq!(out.len(), 4);
        assert!(!out.iter().any(|i| i.def() == Some(&Name::Temp(2))));
    }

    #[test]
    fn test_redefined_name_keeps_every_definitions_operands() {
        // x is defined twice; keeping both definitions requires keeping
        // the operand chain of each, not just the last one
        let insts = vec![
            Inst::binary(
                Op::Add,
                Name::Temp(0),
                Operand::Var(Name::user("u")),
                Operand::Imm(1),
            ),
            Inst::mov(Name::user("x"), temp(0)),
            Inst::print(Operand::Var(Name::user("x"))),
            Inst::constant(Name::user("x"), 7),
            Inst::print(Operand::Var(Name::user("x"))),
        ];
        let out = dead_code_elim(&insts);
        assert_eq!(out, insts);
    }

    #[test]
    fn test_no_roots_keeps_everything() {
        let insts = vec![
            Inst::constant(Name::user("x"), 1),
            Inst::print(Operand::Imm(5)),
        ];
        let out = dead_code_elim(&insts);
        assert_eq!(out, insts);
    }

    #[test]
    fn test_annotations_survive() {
        let insts = vec![
            Inst::constant(Name::user("x"), 1),
            Inst::annotation(Op::HotAnnotation, Name::user("entry")),
            Inst::print(Operand::Var(Name::user("x"))),
        ];
        let out = dead_code_elim(&insts);
        assert_eq!(out, insts);
    }

    #[test]
    fn test_global_elimination_spans_blocks() {
        let insts = vec![
            Inst::constant(Name::user("x"), 1),
            Inst::constant(Name::user("dead"), 2),
            Inst::print(Operand::Var(Name::user("x"))),
        ];
        let mut cfg = Cfg::build(insts);
        global_dead_code_elim(&mut cfg);
        let out = cfg.flatten();
        assert_eq!(out.len(), 2);
        assert!(!out.iter().any(|i| i.def() == Some(&Name::user("dead"))));
    }
}
