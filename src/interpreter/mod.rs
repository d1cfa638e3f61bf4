//! SIMT core interpreter.
//!
//! A cycle-accurate golden reference for a small 16-bit SIMT processor:
//! many threads run one shared program, each with its own registers, and
//! meet only at a multi-channel data memory.
//!
//! # Architecture
//!
//! The interpreter is organized into several submodules:
//!
//! - [`instruction`]: Opcodes, registers and the instruction enum
//! - [`decode`]: Word-to-instruction decoder
//! - [`program`]: Shared instruction memory and its file formats
//! - [`state`]: Per-thread registers, program counter and counters
//! - [`execute`]: Execution units (scalar ALU, control, memory)
//! - [`core`]: Per-thread fetch/decode/execute/request state machine
//! - [`engine`]: Thread/block scheduler driving a grid of cores
//! - [`timing`]: Multi-channel memory with arbitration and latency
//! - [`fault`]: Fault taxonomy
//!
//! # Example
//!
//! ```
//! use simt_emu::interpreter::{GridEngine, LaunchConfig, ProgramStore};
//! use simt_emu::interpreter::timing::{ChannelMemory, MemoryConfig};
//!
//! let program = ProgramStore::from_words(vec![0xF000]); // RET
//! let memory = ChannelMemory::new(MemoryConfig::data_memory()).unwrap();
//! let mut engine = GridEngine::new(program, memory, LaunchConfig::grid(1, 4)).unwrap();
//!
//! engine.run(100).unwrap();  // Run until every thread retires
//! ```

pub mod traits;
pub mod fault;
pub mod instruction;
pub mod decode;
pub mod program;
pub mod state;
pub mod execute;
pub mod core;
pub mod engine;
pub mod timing;
pub mod test_runner;

// Re-export key types for convenience
pub use traits::{ExecuteResult, Executor, MemoryPort};

// Fault types
pub use fault::{ArithmeticFault, DecodeError, ExecutionFault, Fault, MemoryFault, ThreadFault};

// Instruction types
pub use instruction::{AluOp, Instruction, Opcode, Reg};
pub use decode::decode;
pub use program::{ProgramError, ProgramStore};

// State types
pub use state::{RegisterFile, ThreadContext, ThreadId, ThreadStats};

// Execute types
pub use execute::{ControlUnit, MemoryUnit, ScalarAlu, SimtExecutor};

// Core types
pub use core::{CoreStatus, ExecutionCore, StepResult};

// Engine types
pub use engine::{EngineError, EngineStatus, GridEngine, LaunchConfig, RunReport};

// Timing types
pub use timing::{ChannelMapping, ChannelMemory, MemoryConfig, MemoryStats};

// Test harness
pub use test_runner::{TestResult, TestRunner};
