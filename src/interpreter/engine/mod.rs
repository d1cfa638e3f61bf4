//! Thread/block scheduler.
//!
//! The `GridEngine` spawns one execution core per `(block, thread)` pair of a
//! launch, binds the special registers and advances the whole population one
//! transition per cycle until every thread has retired.
//!
//! # Execution Model
//!
//! Threads do not run in lockstep; they only meet at the memory channels.
//! Each cycle:
//!
//! 1. Every active core makes one state transition, in thread order.
//!    Memory requests issued here join their channel's arbiter.
//! 2. The memory model ticks: due requests complete, one waiting request per
//!    channel is admitted.
//!
//! A thread-local fault retires only the faulting thread. A memory fault
//! aborts the run at the end of the current core's step.
//!
//! # Example
//!
//! ```
//! use simt_emu::interpreter::engine::{GridEngine, LaunchConfig};
//! use simt_emu::interpreter::program::ProgramStore;
//! use simt_emu::interpreter::timing::{ChannelMemory, MemoryConfig};
//!
//! let program = ProgramStore::from_words(vec![0xF000]); // RET
//! let memory = ChannelMemory::new(MemoryConfig::data_memory()).unwrap();
//! let mut engine = GridEngine::new(program, memory, LaunchConfig::grid(2, 4)).unwrap();
//!
//! let report = engine.run(1_000).unwrap();
//! assert!(engine.is_done());
//! assert_eq!(report.threads, 8);
//! assert_eq!(report.cycles, 3);
//! ```

mod coordinator;

pub use coordinator::{EngineError, EngineStatus, GridEngine, LaunchConfig, RunReport};
