//! Stack virtual machine.
//!
//! Executes the bytecode produced by [`emit`](crate::emit::emit).
//! Reading an unassigned variable yields 0 and division by zero yields
//! 0; both are language rules, not faults. Popping an empty stack is the
//! one fatal condition, since only malformed bytecode can cause it.

use crate::builtins;
use crate::emit::{BytecodeArg, BytecodeInst, BytecodeOp};
use crate::ir::Name;
use crate::profile::{Profiler, ValueKind};
use indexmap::IndexMap;
use thiserror::Error;

/// Fatal execution errors.
#[derive(Debug, Error, PartialEq)]
pub enum VmError {
    #[error("stack underflow at pc {pc} while executing {op}")]
    StackUnderflow { pc: usize, op: String },
    #[error("malformed operand at pc {pc} for {op}")]
    MalformedOperand { pc: usize, op: String },
}

/// Destination for `PRINT` output.
pub trait OutputSink {
    fn print(&mut self, value: i64);
}

/// Prints each value on its own line to stdout.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn print(&mut self, value: i64) {
        println!("{}", value);
    }
}

/// Collects printed values; used by tests and the library entry points.
#[derive(Debug, Default)]
pub struct CaptureSink {
    pub values: Vec<i64>,
}

impl OutputSink for CaptureSink {
    fn print(&mut self, value: i64) {
        self.values.push(value);
    }
}

/// Execution state of the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmState {
    Running,
    Halted,
}

/// The virtual machine. Variables persist across `run` calls so a
/// program can be re-executed against warm state during profiling.
pub struct Vm<S: OutputSink> {
    stack: Vec<i64>,
    vars: IndexMap<Name, i64>,
    sink: S,
    /// Halted once the program runs off the end or executes `RETURN`.
    pub state: VmState,
    /// Value of the last executed `RETURN`, if any.
    pub returned: Option<i64>,
}

impl Default for Vm<StdoutSink> {
    fn default() -> Self {
        Self::new(StdoutSink)
    }
}

impl<S: OutputSink> Vm<S> {
    pub fn new(sink: S) -> Self {
        Self {
            stack: Vec::new(),
            vars: IndexMap::new(),
            sink,
            state: VmState::Running,
            returned: None,
        }
    }

    /// Execute `code` to completion.
    pub fn run(&mut self, code: &[BytecodeInst]) -> Result<(), VmError> {
        self.execute(code, None)
    }

    /// Execute `code`, feeding runtime observations to `profiler`.
    pub fn run_with_profiler(
        &mut self,
        code: &[BytecodeInst],
        profiler: &mut Profiler,
    ) -> Result<(), VmError> {
        self.execute(code, Some(profiler))
    }

    /// Current value of a variable, if assigned.
    pub fn var(&self, name: &Name) -> Option<i64> {
        self.vars.get(name).copied()
    }

    /// Consume the machine and take back its sink.
    pub fn into_sink(self) -> S {
        self.sink
    }

    fn execute(
        &mut self,
        code: &[BytecodeInst],
        mut profiler: Option<&mut Profiler>,
    ) -> Result<(), VmError> {
        self.state = VmState::Running;
        if let Some(p) = profiler.as_deref_mut() {
            p.record_block_execution("entry");
        }

        let mut pc = 0;
        while pc < code.len() {
            let ins = &code[pc];
            match ins.op {
                BytecodeOp::LoadConst => {
                    let v = match &ins.arg {
                        Some(BytecodeArg::Imm(v)) => *v,
                        _ => return Err(self.malformed(pc, ins)),
                    };
                    self.stack.push(v);
                }
                BytecodeOp::LoadVar => {
                    let name = self.name_arg(pc, ins)?;
                    self.stack.push(self.vars.get(&name).copied().unwrap_or(0));
                }
                BytecodeOp::StoreVar => {
                    let name = self.name_arg(pc, ins)?;
                    let v = self.pop(pc, ins)?;
                    if let Some(p) = profiler.as_deref_mut() {
                        if let Name::User(var) = &name {
                            p.record_type_observation(var, ValueKind::Int);
                        }
                    }
                    self.vars.insert(name, v);
                }
                BytecodeOp::BinaryAdd
                | BytecodeOp::BinarySub
                | BytecodeOp::BinaryMul
                | BytecodeOp::BinaryDiv
                | BytecodeOp::BinaryFloorDiv
                | BytecodeOp::BinaryShl
                | BytecodeOp::BinaryShr => {
                    let b = self.pop(pc, ins)?;
                    let a = self.pop(pc, ins)?;
                    self.stack.push(binary(ins.op, a, b));
                }
                BytecodeOp::Print => {
                    let v = self.pop(pc, ins)?;
                    self.sink.print(v);
                }
                BytecodeOp::CallFunction => {
                    let name = self.name_arg(pc, ins)?;
                    let argc = self.pop(pc, ins)? as usize;
                    let mut args = Vec::with_capacity(argc);
                    for _ in 0..argc {
                        args.push(self.pop(pc, ins)?);
                    }
                    args.reverse();
                    let callee = name.to_string();
                    if let Some(p) = profiler.as_deref_mut() {
                        p.record_function_call(&callee);
                    }
                    self.stack.push(builtins::eval(&callee, &args));
                }
                BytecodeOp::Return => {
                    self.returned = Some(self.pop(pc, ins)?);
                    self.state = VmState::Halted;
                    return Ok(());
                }
                BytecodeOp::ProfileAnnotation => {}
            }
            pc += 1;
        }
        self.state = VmState::Halted;
        Ok(())
    }

    fn pop(&mut self, pc: usize, ins: &BytecodeInst) -> Result<i64, VmError> {
        self.stack.pop().ok_or_else(|| VmError::StackUnderflow {
            pc,
            op: ins.op.to_string(),
        })
    }

    fn name_arg(&self, pc: usize, ins: &BytecodeInst) -> Result<Name, VmError> {
        match &ins.arg {
            Some(BytecodeArg::Name(name)) => Ok(name.clone()),
            _ => Err(self.malformed(pc, ins)),
        }
    }

    fn malformed(&self, pc: usize, ins: &BytecodeInst) -> VmError {
        VmError::MalformedOperand {
            pc,
            op: ins.op.to_string(),
        }
    }
}

fn binary(op: BytecodeOp, a: i64, b: i64) -> i64 {
    match op {
        BytecodeOp::BinaryAdd => a.wrapping_add(b),
        BytecodeOp::BinarySub => a.wrapping_sub(b),
        BytecodeOp::BinaryMul => a.wrapping_mul(b),
        BytecodeOp::BinaryDiv | BytecodeOp::BinaryFloorDiv => {
            if b == 0 {
                0
            } else {
                a.div_euclid(b)
            }
        }
        BytecodeOp::BinaryShl => a.wrapping_shl(b as u32),
        BytecodeOp::BinaryShr => a.wrapping_shr(b as u32),
        _ => unreachable!("not a binary opcode: {:?}", op),
    }
}
