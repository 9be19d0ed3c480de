//! Runtime profiling for tiered compilation.
//!
//! The profiler accumulates type observations per variable, branch
//! outcomes, block execution counts, and function call counts, then
//! distills them into [`Suggestions`] the feedback optimizer consumes.
//! All maps are insertion-ordered so reports and suggestion sets come
//! out in a stable order.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Runtime value kinds the profiler distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Int,
    Float,
}

impl ValueKind {
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Int => "int",
            ValueKind::Float => "float",
        }
    }
}

/// Observed kinds and observation count for one variable.
#[derive(Debug, Clone, Default)]
pub struct TypeProfile {
    observed: IndexSet<ValueKind>,
    pub count: u64,
}

impl TypeProfile {
    pub fn record(&mut self, kind: ValueKind) {
        self.observed.insert(kind);
        self.count += 1;
    }

    /// One kind ever observed?
    pub fn is_monomorphic(&self) -> bool {
        self.observed.len() == 1
    }

    /// First kind observed, if any.
    pub fn primary(&self) -> Option<ValueKind> {
        self.observed.first().copied()
    }
}

/// Taken / not-taken counters for one branch site.
#[derive(Debug, Clone, Copy, Default)]
pub struct BranchProfile {
    pub taken: u64,
    pub not_taken: u64,
}

impl BranchProfile {
    pub fn record(&mut self, taken: bool) {
        if taken {
            self.taken += 1;
        } else {
            self.not_taken += 1;
        }
    }

    /// Fraction of executions that took the branch; 0.5 when unobserved.
    pub fn taken_ratio(&self) -> f64 {
        let total = self.taken + self.not_taken;
        if total == 0 {
            0.5
        } else {
            self.taken as f64 / total as f64
        }
    }
}

/// Execution count for one basic block.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockProfile {
    pub executions: u64,
}

/// Hotness and stability thresholds.
#[derive(Debug, Clone, Copy)]
pub struct Thresholds {
    pub hot_block: u64,
    pub hot_function: u64,
    pub type_stable: u64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            hot_block: 1000,
            hot_function: 100,
            type_stable: 100,
        }
    }
}

/// A branch direction hint derived from profile data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BranchLean {
    LikelyTaken,
    LikelyNotTaken,
}

/// Distilled optimization suggestions.
#[derive(Debug, Clone, Default)]
pub struct Suggestions {
    /// Type-stable variables and their single observed kind.
    pub type_specialization: IndexMap<String, ValueKind>,
    pub hot_blocks: Vec<String>,
    pub hot_functions: Vec<String>,
    pub branch_hints: IndexMap<String, BranchLean>,
    /// Hot functions worth inlining. Every built-in is small, so this
    /// currently mirrors `hot_functions`.
    pub inline_candidates: Vec<String>,
}

/// Accumulates runtime feedback across VM executions.
#[derive(Debug, Default)]
pub struct Profiler {
    types: IndexMap<String, TypeProfile>,
    branches: IndexMap<String, BranchProfile>,
    blocks: IndexMap<String, BlockProfile>,
    functions: IndexMap<String, u64>,
    pub thresholds: Thresholds,
}

impl Profiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_type_observation(&mut self, var: &str, kind: ValueKind) {
        self.types.entry(var.to_string()).or_default().record(kind);
    }

    pub fn record_branch(&mut self, branch: &str, taken: bool) {
        self.branches
            .entry(branch.to_string())
            .or_default()
            .record(taken);
    }

    pub fn record_block_execution(&mut self, block: &str) {
        self.blocks.entry(block.to_string()).or_default().executions += 1;
    }

    pub fn record_function_call(&mut self, function: &str) {
        *self.functions.entry(function.to_string()).or_default() += 1;
    }

    /// Total recorded calls to `function`.
    pub fn call_count(&self, function: &str) -> u64 {
        self.functions.get(function).copied().unwrap_or(0)
    }

    /// Variables observed often enough with a single kind.
    pub fn type_stable_variables(&self) -> IndexMap<String, ValueKind> {
        self.types
            .iter()
            .filter(|(_, p)| p.is_monomorphic() && p.count >= self.thresholds.type_stable)
            .filter_map(|(name, p)| Some((name.clone(), p.primary()?)))
            .collect()
    }

    pub fn hot_blocks(&self) -> Vec<String> {
        self.blocks
            .iter()
            .filter(|(_, p)| p.executions >= self.thresholds.hot_block)
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn hot_functions(&self) -> Vec<String> {
        self.functions
            .iter()
            .filter(|(_, &count)| count >= self.thresholds.hot_function)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Distill all profile data into suggestions.
    pub fn suggestions(&self) -> Suggestions {
        let mut branch_hints = IndexMap::new();
        for (branch, profile) in &self.branches {
            let ratio = profile.taken_ratio();
            if ratio > 0.8 {
                branch_hints.insert(branch.clone(), BranchLean::LikelyTaken);
            } else if ratio < 0.2 {
                branch_hints.insert(branch.clone(), BranchLean::LikelyNotTaken);
            }
        }

        let hot_functions = self.hot_functions();
        Suggestions {
            type_specialization: self.type_stable_variables(),
            hot_blocks: self.hot_blocks(),
            inline_candidates: hot_functions.clone(),
            hot_functions,
            branch_hints,
        }
    }

    /// Human-readable dump of everything the profiler has seen.
    pub fn report(&self) -> String {
        let mut out = String::from("=== Runtime Profile Report ===\n");

        out.push_str("\n--- Type Profiles ---\n");
        for (var, profile) in &self.types {
            let kinds: Vec<&str> = profile.observed.iter().map(|k| k.name()).collect();
            let _ = writeln!(out, "  {}: {} (count: {})", var, kinds.join(", "), profile.count);
        }

        out.push_str("\n--- Hot Blocks ---\n");
        for block in self.hot_blocks() {
            let executions = self.blocks[&block].executions;
            let _ = writeln!(out, "  {}: {} executions", block, executions);
        }

        out.push_str("\n--- Branch Profiles ---\n");
        for (branch, profile) in &self.branches {
            let _ = writeln!(out, "  {}: {:.1}% taken", branch, profile.taken_ratio() * 100.0);
        }

        out.push_str("\n--- Optimization Suggestions ---\n");
        let suggestions = self.suggestions();
        let stable: Vec<&str> = suggestions
            .type_specialization
            .keys()
            .map(String::as_str)
            .collect();
        let _ = writeln!(out, "  Type specialization: [{}]", stable.join(", "));
        let _ = writeln!(
            out,
            "  Inline candidates: [{}]",
            suggestions.inline_candidates.join(", ")
        );

        out
    }

    /// Discard all collected data.
    pub fn reset(&mut self) {
        self.types.clear();
        self.branches.clear();
        self.blocks.clear();
        self.functions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_stability_requires_threshold() {
        let mut profiler = Profiler::new();
        for _ in 0..99 {
            profiler.record_type_observation("x", ValueKind::Int);
        }
        assert!(profiler.type_stable_variables().is_empty());
        profiler.record_type_observation("x", ValueKind::Int);
        assert_eq!(
            profiler.type_stable_variables().get("x"),
            Some(&ValueKind::Int)
        );
    }

    #[test]
    fn test_polymorphic_variable_is_not_stable() {
        let mut profiler = Profiler::new();
        for _ in 0..200 {
            profiler.record_type_observation("x", ValueKind::Int);
        }
        profiler.record_type_observation("x", ValueKind::Float);
        assert!(profiler.type_stable_variables().is_empty());
    }

    #[test]
    fn test_hot_block_threshold() {
        let mut profiler = Profiler::new();
        for _ in 0..999 {
            profiler.record_block_execution("entry");
        }
        assert!(profiler.hot_blocks().is_empty());
        profiler.record_block_execution("entry");
        assert_eq!(profiler.hot_blocks(), vec!["entry".to_string()]);
    }

    #[test]
    fn test_hot_function_threshold() {
        let mut profiler = Profiler::new();
        for _ in 0..100 {
            profiler.record_function_call("factorial");
        }
        assert_eq!(profiler.call_count("factorial"), 100);
        assert_eq!(profiler.hot_functions(), vec!["factorial".to_string()]);
    }

    #[test]
    fn test_branch_hints_at_ratio_extremes() {
        let mut profiler = Profiler::new();
        for i in 0..100 {
            profiler.record_branch("loop", i < 90);
            profiler.record_branch("error", i < 10);
            profiler.record_branch("even", i % 2 == 0);
        }
        let suggestions = profiler.suggestions();
        assert_eq!(suggestions.branch_hints.get("loop"), Some(&BranchLean::LikelyTaken));
        assert_eq!(
            suggestions.branch_hints.get("error"),
            Some(&BranchLean::LikelyNotTaken)
        );
        assert!(!suggestions.branch_hints.contains_key("even"));
    }

    #[test]
    fn test_unobserved_branch_ratio_is_half() {
        assert_eq!(BranchProfile::default().taken_ratio(), 0.5);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut profiler = Profiler::new();
        profiler.record_function_call("factorial");
        profiler.record_block_execution("entry");
        profiler.reset();
        assert_eq!(profiler.call_count("factorial"), 0);
        assert!(profiler.hot_blocks().is_empty());
    }

    #[test]
    fn test_report_mentions_sections() {
        let mut profiler = Profiler::new();
        for _ in 0..1000 {
            profiler.record_block_execution("entry");
        }
        let report = profiler.report();
        assert!(report.contains("Runtime Profile Report"));
        assert!(report.contains("entry: 1000 executions"));
    }
}
