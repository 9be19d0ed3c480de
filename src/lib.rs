//! Tiered optimizing compiler and stack VM for a small imperative language.
//!
//! Source programs are parsed, lowered to three-address IR, optimized by
//! local and CFG-based pipelines, emitted as stack bytecode, and executed
//! on a small VM. A runtime profiler feeds a tier ladder (interpret,
//! baseline, optimizing) and profile-guided rewrites.

pub mod builtins;
pub mod emit;
pub mod ir;
pub mod opt;
pub mod parser;
pub mod profile;
pub mod stats;
pub mod tier;
pub mod vm;

pub use tier::{Tier, TieredCompiler};

use anyhow::Result;

/// Compile source to unoptimized IR.
pub fn compile(source: &str) -> Result<Vec<ir::Inst>> {
    let program = parser::parse(source)?;
    Ok(ir::lower::lower(&program))
}

/// Compile source through the full optimization pipeline.
pub fn compile_optimized(source: &str) -> Result<Vec<ir::Inst>> {
    Ok(opt::optimize_global(compile(source)?))
}

/// Compile, optimize, and execute source, returning printed values.
pub fn run(source: &str) -> Result<Vec<i64>> {
    let insts = compile_optimized(source)?;
    let code = emit::emit(&insts);
    let mut machine = vm::Vm::new(vm::CaptureSink::default());
    machine.run(&code)?;
    Ok(machine.into_sink().values)
}
