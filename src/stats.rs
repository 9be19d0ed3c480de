//! Compilation statistics.
//!
//! Tracks metrics during compilation for verbose output.

use std::time::{Duration, Instant};

/// Compilation statistics.
#[derive(Debug, Default)]
pub struct CompileStats {
    /// Time spent parsing
    pub parse_time: Duration,
    /// Time spent lowering to IR
    pub lower_time: Duration,
    /// Time spent in optimization
    pub opt_time: Duration,
    /// Time spent emitting bytecode
    pub emit_time: Duration,
    /// Time spent executing
    pub exec_time: Duration,

    /// Number of IR instructions before optimization
    pub num_insts_before: usize,
    /// Number of IR instructions after optimization
    pub num_insts_after: usize,
    /// Number of bytecode instructions emitted
    pub num_bytecode: usize,
}

impl CompileStats {
    /// Create a new stats tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Display statistics.
    pub fn display(&self) {
        eprintln!("\n=== Compilation Statistics ===");
        eprintln!(
            "Instructions: {} → {} ({:.1}% reduction)",
            self.num_insts_before,
            self.num_insts_after,
            if self.num_insts_before > 0 {
                100.0 * (1.0 - (self.num_insts_after as f64 / self.num_insts_before as f64))
            } else {
                0.0
            }
        );
        eprintln!("Bytecode:     {} instructions", self.num_bytecode);
        eprintln!();
        eprintln!("=== Timing ===");
        eprintln!("Parsing:      {:?}", self.parse_time);
        eprintln!("Lowering:     {:?}", self.lower_time);
        eprintln!("Optimization: {:?}", self.opt_time);
        eprintln!("Emission:     {:?}", self.emit_time);
        eprintln!("Execution:    {:?}", self.exec_time);
    }
}

/// Timer helper for measuring phase durations.
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Stop the timer and return elapsed duration.
    pub fn stop(&self) -> Duration {
        self.start.elapsed()
    }
}
