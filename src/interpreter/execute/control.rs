//! Control unit execution.
//!
//! - **Branch**: `BRn` jumps to `PC + 1 + offset` when the negative flag is
//!   set and falls through otherwise
//! - **Return**: `RET` retires the thread

use crate::interpreter::state::ThreadContext;
use crate::interpreter::traits::ExecuteResult;

/// Control unit for branches and thread retirement.
pub struct ControlUnit;

impl ControlUnit {
    /// Target of a branch at `pc` with the given offset.
    ///
    /// Computed in 64 bits; the result may be negative or past the end of the
    /// program, which the core reports.
    #[inline]
    pub fn branch_target(pc: u32, offset: i16) -> i64 {
        pc as i64 + 1 + offset as i64
    }

    /// Execute `BRn offset`.
    pub fn branch_if_negative(offset: i16, ctx: &ThreadContext) -> ExecuteResult {
        if ctx.regs.negative() {
            ExecuteResult::Branch {
                target: Self::branch_target(ctx.pc(), offset),
            }
        } else {
            ExecuteResult::Continue
        }
    }
}
