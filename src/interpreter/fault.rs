//! Fault taxonomy for the SIMT core.
//!
//! Faults fall into two classes:
//!
//! - **Thread-local**: decode, execution and arithmetic faults. The faulting
//!   thread retires immediately with the fault recorded; no other thread is
//!   affected because register files and PCs are never shared.
//! - **Fatal**: memory faults. An out-of-range address means the addressing
//!   logic or the memory configuration is wrong, so the whole run aborts.

use std::fmt;

use thiserror::Error;

use crate::interpreter::state::ThreadId;

/// Errors produced while decoding a 16-bit instruction word.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// The top nibble does not name a defined opcode.
    #[error("unknown opcode 0b{opcode:04b} in word 0x{word:04X}")]
    UnknownOpcode {
        /// The opcode nibble.
        opcode: u8,
        /// The full instruction word.
        word: u16,
    },
}

/// Faults raised while executing an instruction.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionFault {
    /// The fetched word does not decode to a defined instruction.
    #[error("illegal instruction at pc {pc}: {source}")]
    IllegalInstruction {
        /// Program counter of the offending word.
        pc: u32,
        /// Underlying decode failure.
        #[source]
        source: DecodeError,
    },

    /// An instruction tried to write one of the special registers (13-15).
    #[error("write to read-only register {reg}")]
    WriteToReadOnlyRegister {
        /// Register index.
        reg: u8,
    },

    /// Fetch past the end of the program store, or a branch below index 0.
    #[error("program counter {pc} outside program of {len} instructions")]
    ProgramCounterOutOfRange {
        /// The offending program counter (may be negative for branches).
        pc: i64,
        /// Length of the program store.
        len: usize,
    },
}

/// Arithmetic faults.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticFault {
    /// `DIV` with a zero divisor.
    #[error("division by zero")]
    DivisionByZero,
}

/// Memory faults. These abort the run.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MemoryFault {
    /// Address outside `0..2^addr_bits`.
    #[error("address {address} out of range (memory has {size} words)")]
    AddressOutOfRange {
        /// Requested address, as computed from the register value.
        address: i64,
        /// Number of addressable words.
        size: usize,
    },
}

/// Any fault a thread can raise.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Execution(#[from] ExecutionFault),
    #[error(transparent)]
    Arithmetic(#[from] ArithmeticFault),
    #[error(transparent)]
    Memory(#[from] MemoryFault),
}

impl Fault {
    /// True for faults that must abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Fault::Memory(_))
    }
}

/// A fault tagged with the thread that raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadFault {
    /// Faulting thread.
    pub thread: ThreadId,
    /// Program counter of the faulting instruction.
    pub pc: u32,
    /// The fault itself.
    pub fault: Fault,
}

impl fmt::Display for ThreadFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "thread {} at pc {}: {}", self.thread, self.pc, self.fault)
    }
}

impl std::error::Error for ThreadFault {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.fault)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_display() {
        let e = DecodeError::UnknownOpcode { opcode: 0xA, word: 0xA123 };
        let text = e.to_string();
        assert!(text.contains("1010"));
        assert!(text.contains("A123"));
    }

    #[test]
    fn test_illegal_instruction_wraps_decode_error() {
        let source = DecodeError::UnknownOpcode { opcode: 0xB, word: 0xB000 };
        let fault = ExecutionFault::IllegalInstruction { pc: 7, source };
        assert!(fault.to_string().starts_with("illegal instruction at pc 7"));
        assert!(std::error::Error::source(&fault).is_some());
    }

    #[test]
    fn test_only_memory_faults_are_fatal() {
        assert!(!Fault::from(ArithmeticFault::DivisionByZero).is_fatal());
        assert!(!Fault::from(ExecutionFault::WriteToReadOnlyRegister { reg: 13 }).is_fatal());
        assert!(Fault::from(MemoryFault::AddressOutOfRange { address: 256, size: 256 }).is_fatal());
    }

    #[test]
    fn test_thread_fault_display() {
        let tf = ThreadFault {
            thread: ThreadId::new(1, 2),
            pc: 4,
            fault: ArithmeticFault::DivisionByZero.into(),
        };
        assert_eq!(tf.to_string(), "thread 1.2 at pc 4: division by zero");
    }
}
