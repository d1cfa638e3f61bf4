//! Per-thread execution core.
//!
//! The `ExecutionCore` ties together the program store, decoder and executor
//! to run a single SIMT thread. It makes one state transition per step and
//! suspends on memory instructions until the memory answers.
//!
//! # Execution Model
//!
//! ```text
//! Fetching -> Decoding -> Executing -+-> Fetching      (ALU, CMP, CONST, NOP, BRn)
//!                                    +-> Requesting    (LDR, STR)
//!                                    +-> Retired       (RET)
//! Requesting -> Fetching             (response applied, PC + 1)
//! any phase  -> Retired              (fault)
//! ```
//!
//! # Example
//!
//! ```
//! use simt_emu::interpreter::core::{ExecutionCore, StepResult};
//! use simt_emu::interpreter::execute::SimtExecutor;
//! use simt_emu::interpreter::program::ProgramStore;
//! use simt_emu::interpreter::state::ThreadId;
//! use simt_emu::interpreter::timing::{ChannelMemory, MemoryConfig};
//!
//! let program = ProgramStore::from_words(vec![0xF000]); // RET
//! let mut executor = SimtExecutor::new();
//! let mut memory = ChannelMemory::new(MemoryConfig::data_memory()).unwrap();
//! let mut core = ExecutionCore::new(ThreadId::new(0, 0), 1);
//!
//! assert_eq!(core.step(&program, &mut executor, &mut memory), StepResult::Fetched);
//! assert_eq!(core.step(&program, &mut executor, &mut memory), StepResult::Decoded);
//! assert_eq!(core.step(&program, &mut executor, &mut memory), StepResult::Retired);
//! assert!(core.is_retired());
//! ```

mod interpreter;

pub use interpreter::{CoreStatus, ExecutionCore, StepResult};
