//! Per-thread register file.
//!
//! Each thread owns:
//!
//! - **General purpose**: 13 × 32-bit signed registers (R0-R12)
//! - **Special**: `%blockIdx` (13), `%blockDim` (14), `%threadIdx` (15),
//!   bound at spawn and read-only afterwards
//! - **Negative flag**: written only by `CMP`, read only by `BRn`
//!
//! Arithmetic wraps at 32 bits; narrowing to the memory word width happens
//! at store time, not here.

use std::fmt;

use crate::interpreter::fault::ExecutionFault;
use crate::interpreter::instruction::{Reg, NUM_GENERAL_REGS};

/// Register file of a single thread.
#[derive(Clone, PartialEq, Eq)]
pub struct RegisterFile {
    general: [i32; NUM_GENERAL_REGS],
    block_idx: i32,
    block_dim: i32,
    thread_idx: i32,
    negative: bool,
}

impl RegisterFile {
    /// Create a register file with zeroed general registers and the given
    /// special register bindings.
    pub const fn new(block_idx: i32, block_dim: i32, thread_idx: i32) -> Self {
        Self {
            general: [0; NUM_GENERAL_REGS],
            block_idx,
            block_dim,
            thread_idx,
            negative: false,
        }
    }

    /// Read any register, general or special.
    #[inline]
    pub fn read(&self, reg: Reg) -> i32 {
        match reg {
            Reg::BLOCK_IDX => self.block_idx,
            Reg::BLOCK_DIM => self.block_dim,
            Reg::THREAD_IDX => self.thread_idx,
            r => self.general[r.index() as usize],
        }
    }

    /// Write a general purpose register.
    ///
    /// Writing `%blockIdx`, `%blockDim` or `%threadIdx` is rejected and leaves
    /// the file untouched.
    #[inline]
    pub fn write(&mut self, reg: Reg, value: i32) -> Result<(), ExecutionFault> {
        if reg.is_special() {
            return Err(ExecutionFault::WriteToReadOnlyRegister { reg: reg.index() });
        }
        self.general[reg.index() as usize] = value;
        Ok(())
    }

    /// Current value of the negative flag.
    #[inline]
    pub fn negative(&self) -> bool {
        self.negative
    }

    /// Set the negative flag. Only `CMP` should call this.
    #[inline]
    pub fn set_negative(&mut self, negative: bool) {
        self.negative = negative;
    }

    /// General purpose registers (for debugging/display).
    pub fn general(&self) -> &[i32; NUM_GENERAL_REGS] {
        &self.general
    }
}

impl fmt::Debug for RegisterFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RegisterFile {{ blockIdx: {}, blockDim: {}, threadIdx: {}, n: {}",
            self.block_idx, self.block_dim, self.thread_idx, self.negative
        )?;
        // Only show non-zero general registers
        for (i, v) in self.general.iter().enumerate().filter(|(_, v)| **v != 0) {
            write!(f, ", R{}: {}", i, v)?;
        }
        write!(f, " }}")
    }
}
