//! Tiered compilation and profile-guided optimization.
//!
//! Call counts drive tier selection: cold code stays unoptimized, warm
//! code gets the local pipeline, hot code gets the full pipeline plus
//! feedback-directed rewrites drawn from [`Profiler`](crate::profile::Profiler)
//! suggestions.

use crate::ir::{Inst, Name, Op, Operand};
use crate::opt;
use crate::profile::{BranchLean, Profiler, Suggestions, ValueKind};
use std::fmt;

/// Compilation tiers, coldest to hottest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    Interpret,
    Baseline,
    Optimizing,
}

impl Tier {
    /// Select a tier from a function's observed call count.
    pub fn for_call_count(calls: u64) -> Self {
        if calls >= 1000 {
            Tier::Optimizing
        } else if calls >= 100 {
            Tier::Baseline
        } else {
            Tier::Interpret
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tier::Interpret => "interpret",
            Tier::Baseline => "baseline",
            Tier::Optimizing => "optimizing",
        };
        write!(f, "{}", name)
    }
}

/// Applies profile-guided rewrites to already-optimized IR.
pub struct FeedbackOptimizer {
    suggestions: Suggestions,
}

impl FeedbackOptimizer {
    pub fn new(profiler: &Profiler) -> Self {
        Self {
            suggestions: profiler.suggestions(),
        }
    }

    /// Run the feedback pipeline: type specialization, hot-path and
    /// inline annotations, branch hints.
    pub fn apply(&self, insts: Vec<Inst>) -> Vec<Inst> {
        let insts = self.specialize_for_types(insts);
        let insts = self.annotate_hot_paths(insts);
        let insts = self.annotate_branches(insts);
        self.annotate_inline_candidates(insts)
    }

    /// Replace generic division with the integer-specialized form when
    /// both operands are variables the profile shows to be int-stable.
    fn specialize_for_types(&self, insts: Vec<Inst>) -> Vec<Inst> {
        if self.suggestions.type_specialization.is_empty() {
            return insts;
        }
        insts
            .into_iter()
            .map(|ins| {
                if ins.op == Op::Div
                    && self.is_stable_int(ins.a.as_ref())
                    && self.is_stable_int(ins.b.as_ref())
                {
                    log::debug!("specializing division to integer form: {}", ins);
                    return Inst { op: Op::FloorDiv, ..ins };
                }
                ins
            })
            .collect()
    }

    fn is_stable_int(&self, operand: Option<&Operand>) -> bool {
        match operand.and_then(|o| o.as_var()) {
            Some(Name::User(name)) => {
                self.suggestions.type_specialization.get(name) == Some(&ValueKind::Int)
            }
            _ => false,
        }
    }

    /// Mark definitions of hot names so later passes can treat them
    /// specially.
    fn annotate_hot_paths(&self, insts: Vec<Inst>) -> Vec<Inst> {
        if self.suggestions.hot_blocks.is_empty() {
            return insts;
        }
        let mut out = Vec::with_capacity(insts.len());
        for ins in insts {
            if let Some(Name::User(dest)) = ins.def() {
                if self.suggestions.hot_blocks.contains(dest) {
                    out.push(Inst::annotation(Op::HotAnnotation, Name::user(dest.clone())));
                }
            }
            out.push(ins);
        }
        out
    }

    /// Emit branch direction hints at the head of the program.
    fn annotate_branches(&self, insts: Vec<Inst>) -> Vec<Inst> {
        if self.suggestions.branch_hints.is_empty() {
            return insts;
        }
        let mut out = Vec::with_capacity(insts.len() + self.suggestions.branch_hints.len());
        for (branch, lean) in &self.suggestions.branch_hints {
            let taken = match lean {
                BranchLean::LikelyTaken => 1,
                BranchLean::LikelyNotTaken => 0,
            };
            out.push(Inst {
                op: Op::BranchHint,
                dest: None,
                a: Some(Operand::Var(Name::user(branch))),
                b: Some(Operand::Imm(taken)),
            });
        }
        out.extend(insts);
        out
    }

    /// Mark calls to hot functions as inline candidates.
    fn annotate_inline_candidates(&self, insts: Vec<Inst>) -> Vec<Inst> {
        if self.suggestions.inline_candidates.is_empty() {
            return insts;
        }
        let mut out = Vec::with_capacity(insts.len());
        for ins in insts {
            if ins.op == Op::Call {
                if let Some(Name::User(callee)) = ins.a.as_ref().and_then(|a| a.as_var()) {
                    if self.suggestions.inline_candidates.contains(callee) {
                        out.push(Inst::annotation(
                            Op::InlineCandidate,
                            Name::user(callee.clone()),
                        ));
                    }
                }
            }
            out.push(ins);
        }
        out
    }
}

/// Dispatches compilation through the tier ladder.
#[derive(Default)]
pub struct TieredCompiler {
    pub profiler: Profiler,
}

impl TieredCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// The tier `function` has earned so far.
    pub fn tier_for(&self, function: &str) -> Tier {
        Tier::for_call_count(self.profiler.call_count(function))
    }

    /// Compile `insts` at the tier `function`'s call count warrants.
    pub fn compile(&self, insts: Vec<Inst>, function: &str) -> Vec<Inst> {
        let tier = self.tier_for(function);
        log::debug!("compiling `{}` at tier {}", function, tier);
        match tier {
            Tier::Interpret => insts,
            Tier::Baseline => opt::optimize(insts),
            Tier::Optimizing => {
                let insts = opt::optimize_global(insts);
                FeedbackOptimizer::new(&self.profiler).apply(insts)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::Profiler;

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(Tier::for_call_count(0), Tier::Interpret);
        assert_eq!(Tier::for_call_count(99), Tier::Interpret);
        assert_eq!(Tier::for_call_count(100), Tier::Baseline);
        assert_eq!(Tier::for_call_count(999), Tier::Baseline);
        assert_eq!(Tier::for_call_count(1000), Tier::Optimizing);
        assert_eq!(Tier::for_call_count(1500), Tier::Optimizing);
    }

    #[test]
    fn test_division_specializes_for_stable_ints() {
        let mut profiler = Profiler::new();
        for _ in 0..100 {
            profiler.record_type_observation("a", ValueKind::Int);
            profiler.record_type_observation("b", ValueKind::Int);
        }
        let insts = vec![Inst::binary(
            Op::Div,
            Name::Temp(0),
            Operand::Var(Name::user("a")),
            Operand::Var(Name::user("b")),
        )];
        let out = FeedbackOptimizer::new(&profiler).apply(insts);
        assert_eq!(out[0].op, Op::FloorDiv);
    }

    #[test]
    fn test_division_stays_generic_without_profile() {
        let profiler = Profiler::new();
        let insts = vec![Inst::binary(
            Op::Div,
            Name::Temp(0),
            Operand::Var(Name::user("a")),
            Operand::Var(Name::user("b")),
        )];
        let out = FeedbackOptimizer::new(&profiler).apply(insts);
        assert_eq!(out[0].op, Op::Div);
    }

    #[test]
    fn test_hot_definition_gets_annotation() {
        let mut profiler = Profiler::new();
        for _ in 0..1000 {
            profiler.record_block_execution("x");
        }
        let insts = vec![Inst::constant(Name::user("x"), 1)];
        let out = FeedbackOptimizer::new(&profiler).apply(insts.clone());
        assert_eq!(out[0], Inst::annotation(Op::HotAnnotation, Name::user("x")));
        assert_eq!(out[1], insts[0]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_hot_call_gets_inline_annotation() {
        let mut profiler = Profiler::new();
        for _ in 0..100 {
            profiler.record_function_call("factorial");
        }
        let insts = vec![Inst::call(
            Name::Temp(0),
            Name::user("factorial"),
            Operand::Var(Name::user("n")),
        )];
        let out = FeedbackOptimizer::new(&profiler).apply(insts);
        assert_eq!(
            out[0],
            Inst::annotation(Op::InlineCandidate, Name::user("factorial"))
        );
        assert_eq!(out[1].op, Op::Call);
    }

    #[test]
    fn test_branch_hints_prepend_with_direction() {
        let mut profiler = Profiler::new();
        for _ in 0..10 {
            profiler.record_branch("loop", true);
        }
        let insts = vec![Inst::constant(Name::user("x"), 1)];
        let out = FeedbackOptimizer::new(&profiler).apply(insts);
        assert_eq!(out[0].op, Op::BranchHint);
        assert_eq!(out[0].b, Some(Operand::Imm(1)));
    }

    #[test]
    fn test_tiered_compiler_dispatch() {
        let mut compiler = TieredCompiler::new();
        assert_eq!(compiler.tier_for("main"), Tier::Interpret);

        for _ in 0..100 {
            compiler.profiler.record_function_call("main");
        }
        assert_eq!(compiler.tier_for("main"), Tier::Baseline);

        for _ in 0..900 {
            compiler.profiler.record_function_call("main");
        }
        assert_eq!(compiler.tier_for("main"), Tier::Optimizing);

        // interpret tier returns the program untouched
        let insts = vec![Inst::binary(
            Op::Add,
            Name::Temp(0),
            Operand::Imm(1),
            Operand::Imm(2),
        )];
        let cold = TieredCompiler::new();
        assert_eq!(cold.compile(insts.clone(), "main"), insts);
    }
}
