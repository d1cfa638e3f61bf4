//! Per-thread processor state.
//!
//! | Register | Index | Width | Access |
//! |----------|-------|-------|--------|
//! | R0-R12 | 0-12 | 32-bit signed | read/write |
//! | `%blockIdx` | 13 | 32-bit | read-only |
//! | `%blockDim` | 14 | 32-bit | read-only |
//! | `%threadIdx` | 15 | 32-bit | read-only |
//! | negative flag | - | 1 bit | written by `CMP` |
//!
//! # Example
//!
//! ```
//! use simt_emu::interpreter::instruction::Reg;
//! use simt_emu::interpreter::state::{ThreadContext, ThreadId};
//!
//! let mut ctx = ThreadContext::new(ThreadId::new(0, 5), 16);
//! ctx.regs.write(Reg::new(0), 42).unwrap();
//! assert_eq!(ctx.regs.read(Reg::THREAD_IDX), 5);
//! ```

mod registers;
mod context;

pub use registers::RegisterFile;
pub use context::{ThreadContext, ThreadId, ThreadStats};
