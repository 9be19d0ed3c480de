//! mvmc CLI
//!
//! Compiles and runs programs in a small imperative language on a stack
//! VM, with tiered optimization.
//!
//! # Usage
//!
//! ```bash
//! # Compile and run (default)
//! mvmc program.mv
//!
//! # Inspect the optimized IR
//! mvmc program.mv --emit opt
//!
//! # Run at a forced tier with a profile report
//! mvmc program.mv --tier baseline --profile-report
//!
//! # Let call counts climb the tier ladder across repeated runs
//! mvmc program.mv --runs 1500 -v
//! ```

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use mvmc::stats::{CompileStats, Timer};
use mvmc::tier::{FeedbackOptimizer, Tier};
use mvmc::vm::{StdoutSink, Vm};
use mvmc::{emit, ir, opt, parser, profile};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EmitType {
    /// Unoptimized IR
    Ir,
    /// Optimized IR
    Opt,
    /// Stack bytecode
    Bytecode,
    /// Execute on the VM (default)
    Run,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TierArg {
    Interpret,
    Baseline,
    Optimizing,
}

impl From<TierArg> for Tier {
    fn from(arg: TierArg) -> Self {
        match arg {
            TierArg::Interpret => Tier::Interpret,
            TierArg::Baseline => Tier::Baseline,
            TierArg::Optimizing => Tier::Optimizing,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "mvmc",
    version,
    about = "Tiered optimizing compiler and stack VM for a small imperative language"
)]
struct Args {
    /// Input source file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output type
    #[arg(long, value_enum, default_value = "run")]
    emit: EmitType,

    /// Force a compilation tier instead of the default (optimizing)
    #[arg(long, value_enum)]
    tier: Option<TierArg>,

    /// Execute the program this many times, letting the profiler drive
    /// tier promotion; output is shown for the first run only
    #[arg(long, default_value_t = 1)]
    runs: u64,

    /// Print a runtime profile report after execution
    #[arg(long)]
    profile_report: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug"))
            .init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
            .init();
    }

    let source = std::fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;

    let mut stats = CompileStats::new();

    let timer = Timer::start();
    let program = parser::parse(&source)
        .with_context(|| format!("Failed to parse {}", args.input.display()))?;
    stats.parse_time = timer.stop();

    let timer = Timer::start();
    let insts = ir::lower::lower(&program);
    stats.lower_time = timer.stop();
    stats.num_insts_before = insts.len();

    for ins in &insts {
        log::debug!("ir: {}", ins);
    }

    if matches!(args.emit, EmitType::Ir) {
        for ins in &insts {
            println!("{}", ins);
        }
        return Ok(());
    }

    if args.runs > 1 && args.tier.is_none() && matches!(args.emit, EmitType::Run) {
        return tiered_run(insts, args.runs, args.profile_report);
    }

    let tier = args.tier.map(Tier::from).unwrap_or(Tier::Optimizing);
    let timer = Timer::start();
    let insts = match tier {
        Tier::Interpret => insts,
        Tier::Baseline => opt::optimize(insts),
        Tier::Optimizing => opt::optimize_global(insts),
    };
    stats.opt_time = timer.stop();
    stats.num_insts_after = insts.len();

    for ins in &insts {
        log::debug!("opt: {}", ins);
    }

    if matches!(args.emit, EmitType::Opt) {
        for ins in &insts {
            println!("{}", ins);
        }
        return Ok(());
    }

    let timer = Timer::start();
    let code = emit::emit(&insts);
    stats.emit_time = timer.stop();
    stats.num_bytecode = code.len();

    if matches!(args.emit, EmitType::Bytecode) {
        for ins in &code {
            println!("{}", ins);
        }
        return Ok(());
    }

    let mut profiler = profile::Profiler::new();
    let mut machine = Vm::new(StdoutSink);
    let timer = Timer::start();
    if args.profile_report {
        machine.run_with_profiler(&code, &mut profiler)?;
    } else {
        machine.run(&code)?;
    }
    stats.exec_time = timer.stop();

    if args.profile_report {
        // re-emit through the feedback pipeline so the report reflects
        // what the profile would change
        let feedback = FeedbackOptimizer::new(&profiler);
        let refined = feedback.apply(insts);
        if args.verbose {
            eprintln!("\n=== Feedback-Directed IR ===");
            for ins in &refined {
                eprintln!("{}", ins);
            }
        }
        eprint!("{}", profiler.report());
    }

    if args.verbose {
        stats.display();
    }

    Ok(())
}

/// Execute repeatedly, promoting through the tier ladder as the call
/// count crosses each threshold. The program is recompiled at every
/// promotion; output is printed for the first run only.
fn tiered_run(insts: Vec<ir::Inst>, runs: u64, profile_report: bool) -> Result<()> {
    let mut compiler = mvmc::TieredCompiler::new();
    let mut tier = compiler.tier_for("main");
    let mut code = emit::emit(&compiler.compile(insts.clone(), "main"));

    let mut first = Vm::new(StdoutSink);
    let mut warm = Vm::new(mvmc::vm::CaptureSink::default());

    for run in 0..runs {
        compiler.profiler.record_function_call("main");
        let earned = compiler.tier_for("main");
        if earned != tier {
            eprintln!("tier promotion at call {}: {} -> {}", run + 1, tier, earned);
            tier = earned;
            code = emit::emit(&compiler.compile(insts.clone(), "main"));
        }
        if run == 0 {
            first.run_with_profiler(&code, &mut compiler.profiler)?;
        } else {
            warm.run_with_profiler(&code, &mut compiler.profiler)?;
        }
    }

    if profile_report {
        eprint!("{}", compiler.profiler.report());
    }
    eprintln!("final tier after {} runs: {}", runs, tier);
    Ok(())
}
