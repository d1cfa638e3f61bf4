//! Grid coordinator implementation.
//!
//! The engine owns one execution core per launched thread, the shared
//! program store and the memory model, and advances all of them in lockstep
//! cycles.

use thiserror::Error;

use crate::interpreter::core::{ExecutionCore, StepResult};
use crate::interpreter::execute::SimtExecutor;
use crate::interpreter::fault::ThreadFault;
use crate::interpreter::program::ProgramStore;
use crate::interpreter::state::{ThreadId, ThreadStats};
use crate::interpreter::timing::{ChannelMemory, MemoryStats};

/// Engine execution status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineStatus {
    /// Launched, no cycle run yet.
    #[default]
    Ready,
    /// At least one thread is active.
    Running,
    /// Every thread has retired.
    Done,
    /// A fatal fault stopped the run.
    Aborted,
}

/// Engine-level failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("block dimension must be at least one thread")]
    ZeroBlockDim,

    #[error("run aborted: {0}")]
    Aborted(#[source] ThreadFault),

    #[error("no global completion after {cycles} cycles ({active} threads still active)")]
    CycleLimit { cycles: u64, active: usize },
}

/// Shape of a launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchConfig {
    /// Number of blocks.
    pub blocks: u32,
    /// Threads per full block; the value of `%blockDim`.
    pub block_dim: u32,
    /// Total threads spawned. The last block may be partial.
    pub threads: u32,
}

impl LaunchConfig {
    /// `blocks` full blocks of `block_dim` threads.
    pub fn grid(blocks: u32, block_dim: u32) -> Self {
        Self {
            blocks,
            block_dim,
            threads: blocks.saturating_mul(block_dim),
        }
    }

    /// `threads` threads in blocks of `block_dim`; the last block holds the
    /// remainder.
    pub fn for_threads(threads: u32, block_dim: u32) -> Self {
        Self {
            blocks: if block_dim == 0 { 0 } else { threads.div_ceil(block_dim) },
            block_dim,
            threads,
        }
    }

    /// Thread identities in launch order.
    pub fn thread_ids(&self) -> impl Iterator<Item = ThreadId> + '_ {
        (0..self.blocks)
            .flat_map(move |b| (0..self.block_dim).map(move |t| ThreadId::new(b, t)))
            .take(self.threads as usize)
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Cycles until global completion.
    pub cycles: u64,
    /// Threads launched.
    pub threads: usize,
    /// Faults raised, ordered by thread.
    pub faults: Vec<ThreadFault>,
    /// Instructions executed over all threads.
    pub instructions: u64,
    /// Stall cycles over all threads.
    pub stall_cycles: u64,
    /// Memory model counters.
    pub memory: MemoryStats,
}

impl RunReport {
    /// Fault of the lowest faulting thread.
    pub fn first_fault(&self) -> Option<&ThreadFault> {
        self.faults.first()
    }

    /// True when no thread faulted.
    pub fn is_clean(&self) -> bool {
        self.faults.is_empty()
    }
}

/// Thread/block scheduler driving a grid of execution cores.
///
/// One cycle steps every core once in thread order and then ticks the memory,
/// so the memory cycle always equals the engine cycle.
pub struct GridEngine {
    program: ProgramStore,
    memory: ChannelMemory,
    executor: SimtExecutor,
    /// Cores in block-major thread order.
    cores: Vec<ExecutionCore>,
    launch: LaunchConfig,
    status: EngineStatus,
    cycles: u64,
    abort: Option<ThreadFault>,
}

impl GridEngine {
    /// Spawn one core per thread of `launch`.
    pub fn new(program: ProgramStore, memory: ChannelMemory, launch: LaunchConfig) -> Result<Self, EngineError> {
        if launch.block_dim == 0 {
            return Err(EngineError::ZeroBlockDim);
        }
        let cores: Vec<_> = launch
            .thread_ids()
            .map(|id| ExecutionCore::new(id, launch.block_dim))
            .collect();

        log::debug!(
            "launching {} threads in {} blocks of {} ({} instructions)",
            cores.len(),
            launch.blocks,
            launch.block_dim,
            program.len()
        );

        let status = if cores.is_empty() { EngineStatus::Done } else { EngineStatus::Ready };

        Ok(Self {
            program,
            memory,
            executor: SimtExecutor::new(),
            cores,
            launch,
            status,
            cycles: 0,
            abort: None,
        })
    }

    /// Get the engine status.
    pub fn status(&self) -> EngineStatus {
        self.status
    }

    /// True once every thread has retired.
    pub fn is_done(&self) -> bool {
        self.status == EngineStatus::Done
    }

    /// Cycles executed.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Launch shape.
    pub fn launch(&self) -> &LaunchConfig {
        &self.launch
    }

    /// Shared program store.
    pub fn program(&self) -> &ProgramStore {
        &self.program
    }

    /// Memory model.
    pub fn memory(&self) -> &ChannelMemory {
        &self.memory
    }

    /// Memory model, for pre-loading data.
    pub fn memory_mut(&mut self) -> &mut ChannelMemory {
        &mut self.memory
    }

    /// Consume the engine and return the memory model.
    pub fn into_memory(self) -> ChannelMemory {
        self.memory
    }

    /// Executor (instruction mix counters).
    pub fn executor(&self) -> &SimtExecutor {
        &self.executor
    }

    /// All cores in thread order.
    pub fn cores(&self) -> &[ExecutionCore] {
        &self.cores
    }

    /// Core of a given thread.
    pub fn core(&self, id: ThreadId) -> Option<&ExecutionCore> {
        self.cores
            .binary_search_by_key(&id, ExecutionCore::id)
            .ok()
            .map(|i| &self.cores[i])
    }

    /// Threads not yet retired.
    pub fn active_threads(&self) -> usize {
        self.cores.iter().filter(|c| !c.is_retired()).count()
    }

    /// Faults raised so far, ordered by thread.
    pub fn faults(&self) -> Vec<ThreadFault> {
        self.cores.iter().filter_map(|c| c.fault().copied()).collect()
    }

    /// Fault of the lowest faulting thread.
    pub fn first_fault(&self) -> Option<ThreadFault> {
        self.cores.iter().find_map(|c| c.fault().copied())
    }

    /// Fatal fault that aborted the run.
    pub fn abort_fault(&self) -> Option<&ThreadFault> {
        self.abort.as_ref()
    }

    /// Per-thread counters in thread order.
    pub fn thread_stats(&self) -> Vec<(ThreadId, ThreadStats)> {
        self.cores.iter().map(|c| (c.id(), c.context().stats)).collect()
    }

    /// Run one cycle: step every core once, then tick the memory.
    pub fn step(&mut self) {
        if matches!(self.status, EngineStatus::Done | EngineStatus::Aborted) {
            return;
        }
        self.status = EngineStatus::Running;

        for core in &mut self.cores {
            if let StepResult::Faulted(fault) = core.step(&self.program, &mut self.executor, &mut self.memory) {
                if fault.fault.is_fatal() {
                    log::warn!("cycle {}: aborting run: {}", self.cycles, fault);
                    self.abort = Some(fault);
                    self.status = EngineStatus::Aborted;
                    return;
                }
            }
        }

        self.memory.tick();
        self.cycles += 1;

        if self.cores.iter().all(ExecutionCore::is_retired) {
            log::info!("all {} threads retired after {} cycles", self.cores.len(), self.cycles);
            self.status = EngineStatus::Done;
        }
    }

    /// Run until every thread retires.
    ///
    /// Fails when a fatal fault aborts the run or when `max_cycles` pass
    /// without global completion.
    pub fn run(&mut self, max_cycles: u64) -> Result<RunReport, EngineError> {
        while !self.is_done() {
            if let Some(fault) = self.abort {
                return Err(EngineError::Aborted(fault));
            }
            if self.cycles >= max_cycles {
                return Err(EngineError::CycleLimit {
                    cycles: self.cycles,
                    active: self.active_threads(),
                });
            }
            self.step();
        }
        Ok(self.report())
    }

    /// Summary of the run so far.
    pub fn report(&self) -> RunReport {
        let (instructions, stall_cycles) = self.cores.iter().fold((0, 0), |(i, s), c| {
            let stats = &c.context().stats;
            (i + stats.instructions, s + stats.stall_cycles)
        });
        RunReport {
            cycles: self.cycles,
            threads: self.cores.len(),
            faults: self.faults(),
            instructions,
            stall_cycles,
            memory: self.memory.stats(),
        }
    }
}
