//! Execution core implementation.
//!
//! One core drives one thread through fetch, decode and execute, one phase
//! transition per call to [`ExecutionCore::step`].

use crate::interpreter::decode::decode;
use crate::interpreter::fault::{ExecutionFault, Fault, ThreadFault};
use crate::interpreter::instruction::Instruction;
use crate::interpreter::program::ProgramStore;
use crate::interpreter::state::{ThreadContext, ThreadId};
use crate::interpreter::timing::MemoryRequest;
use crate::interpreter::traits::{ExecuteResult, Executor, MemoryPort};

/// Core execution status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoreStatus {
    /// Next step fetches the word at PC.
    #[default]
    Fetching,
    /// Next step decodes the fetched word.
    Decoding { word: u16 },
    /// Next step executes the decoded instruction.
    Executing { instr: Instruction },
    /// Waiting for the memory response to `instr`.
    Requesting { instr: Instruction },
    /// Terminal. Either `RET` executed or a fault was raised.
    Retired,
}

/// Result of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    /// Word fetched.
    Fetched,
    /// Word decoded.
    Decoded,
    /// Instruction executed; PC updated.
    Executed,
    /// Memory request submitted.
    Issued(MemoryRequest),
    /// Still waiting for a memory response.
    Stalled,
    /// Memory response applied; PC advanced.
    Resumed,
    /// `RET` executed.
    Retired,
    /// The thread raised a fault and retired.
    Faulted(ThreadFault),
    /// Already retired; nothing to do.
    Idle,
}

/// Per-thread execution core.
///
/// Owns the thread's context. The program store, executor and memory are
/// shared and passed into every step.
#[derive(Debug, Clone)]
pub struct ExecutionCore {
    ctx: ThreadContext,
    status: CoreStatus,
    fault: Option<ThreadFault>,
}

impl ExecutionCore {
    /// Create a core for `id`, fetching from PC 0.
    pub fn new(id: ThreadId, block_dim: u32) -> Self {
        Self {
            ctx: ThreadContext::new(id, block_dim),
            status: CoreStatus::Fetching,
            fault: None,
        }
    }

    /// Thread identity.
    pub fn id(&self) -> ThreadId {
        self.ctx.id()
    }

    /// Current status.
    pub fn status(&self) -> CoreStatus {
        self.status
    }

    /// Thread context (registers, PC, counters).
    pub fn context(&self) -> &ThreadContext {
        &self.ctx
    }

    /// Mutable thread context, for test setup.
    pub fn context_mut(&mut self) -> &mut ThreadContext {
        &mut self.ctx
    }

    /// True once the thread has retired, normally or through a fault.
    pub fn is_retired(&self) -> bool {
        matches!(self.status, CoreStatus::Retired)
    }

    /// Fault that retired this thread, if any.
    pub fn fault(&self) -> Option<&ThreadFault> {
        self.fault.as_ref()
    }

    /// Perform one state transition.
    pub fn step<E, M>(&mut self, program: &ProgramStore, executor: &mut E, memory: &mut M) -> StepResult
    where
        E: Executor,
        M: MemoryPort,
    {
        match self.status {
            CoreStatus::Retired => StepResult::Idle,

            CoreStatus::Fetching => match program.fetch(self.ctx.pc()) {
                Ok(word) => {
                    self.status = CoreStatus::Decoding { word };
                    StepResult::Fetched
                }
                Err(e) => self.raise(e.into()),
            },

            CoreStatus::Decoding { word } => match decode(word) {
                Ok(instr) => {
                    self.status = CoreStatus::Executing { instr };
                    StepResult::Decoded
                }
                Err(source) => self.raise(
                    ExecutionFault::IllegalInstruction {
                        pc: self.ctx.pc(),
                        source,
                    }
                    .into(),
                ),
            },

            CoreStatus::Executing { instr } => self.execute(instr, program, executor, memory),

            CoreStatus::Requesting { instr } => match memory.take_response(self.ctx.id()) {
                Some(response) => {
                    if let Err(fault) = executor.complete(&instr, response, &mut self.ctx) {
                        return self.raise(fault);
                    }
                    self.ctx.advance_pc();
                    self.status = CoreStatus::Fetching;
                    StepResult::Resumed
                }
                None => {
                    self.ctx.record_stall(1);
                    StepResult::Stalled
                }
            },
        }
    }

    fn execute<E, M>(
        &mut self,
        instr: Instruction,
        program: &ProgramStore,
        executor: &mut E,
        memory: &mut M,
    ) -> StepResult
    where
        E: Executor,
        M: MemoryPort,
    {
        log::trace!("{} pc {}: {}", self.ctx.id(), self.ctx.pc(), instr);
        self.ctx.stats.instructions += 1;

        let result = match executor.execute(&instr, &mut self.ctx) {
            Ok(r) => r,
            Err(fault) => return self.raise(fault),
        };

        match result {
            ExecuteResult::Continue => {
                self.ctx.advance_pc();
                self.status = CoreStatus::Fetching;
                StepResult::Executed
            }

            ExecuteResult::Branch { target } => {
                if target < 0 {
                    return self.raise(
                        ExecutionFault::ProgramCounterOutOfRange {
                            pc: target,
                            len: program.len(),
                        }
                        .into(),
                    );
                }
                // Targets past the end fault on the next fetch
                self.ctx.set_pc(u32::try_from(target).unwrap_or(u32::MAX));
                self.ctx.stats.branches_taken += 1;
                self.status = CoreStatus::Fetching;
                StepResult::Executed
            }

            ExecuteResult::Request { address, kind } => {
                let request = match memory.request(self.ctx.id(), address, kind) {
                    Ok(r) => r,
                    Err(fault) => return self.raise(fault.into()),
                };
                if let Err(fault) = memory.submit(request) {
                    return self.raise(fault.into());
                }
                self.ctx.stats.memory_requests += 1;
                self.status = CoreStatus::Requesting { instr };
                StepResult::Issued(request)
            }

            ExecuteResult::Retire => {
                log::debug!("{} retired after {} instructions", self.ctx.id(), self.ctx.stats.instructions);
                self.ctx.retired = true;
                self.status = CoreStatus::Retired;
                StepResult::Retired
            }
        }
    }

    /// Retire the thread with `fault`.
    fn raise(&mut self, fault: Fault) -> StepResult {
        let tf = ThreadFault {
            thread: self.ctx.id(),
            pc: self.ctx.pc(),
            fault,
        };
        log::debug!("{}", tf);
        self.ctx.retired = true;
        self.status = CoreStatus::Retired;
        self.fault = Some(tf);
        StepResult::Faulted(tf)
    }

    /// Step until the thread retires or `max_steps` transitions have been
    /// made. The memory is not ticked, so this only terminates on memory
    /// instructions when `memory` answers without a clock.
    pub fn run<E, M>(
        &mut self,
        program: &ProgramStore,
        executor: &mut E,
        memory: &mut M,
        max_steps: usize,
    ) -> StepResult
    where
        E: Executor,
        M: MemoryPort,
    {
        let mut last = StepResult::Idle;
        for _ in 0..max_steps {
            last = self.step(program, executor, memory);
            if self.is_retired() {
                break;
            }
        }
        last
    }
}
