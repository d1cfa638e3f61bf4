//! Memory unit execution.
//!
//! Handles `LDR`/`STR` between registers and the external memory.
//!
//! # Addressing
//!
//! The effective address is the full 32-bit value of the address register,
//! taken as signed. Range checks happen when the request is built against a
//! concrete [`MemoryPort`](crate::interpreter::traits::MemoryPort); negative
//! values are always out of range.
//!
//! # Word Width
//!
//! Stores carry the raw register bits and are truncated by the memory.
//! Loads return a zero-extended word.

use crate::interpreter::fault::{ExecutionFault, Fault};
use crate::interpreter::instruction::Reg;
use crate::interpreter::state::ThreadContext;
use crate::interpreter::timing::{MemoryResponse, RequestKind};
use crate::interpreter::traits::ExecuteResult;

/// Memory unit for load/store operations.
pub struct MemoryUnit;

impl MemoryUnit {
    /// Effective address held in `addr`.
    #[inline]
    pub fn effective_address(addr: Reg, ctx: &ThreadContext) -> i64 {
        ctx.regs.read(addr) as i64
    }

    /// Issue `LDR dest, [addr]`.
    ///
    /// A special destination faults here, before any request is issued.
    pub fn load(dest: Reg, addr: Reg, ctx: &ThreadContext) -> Result<ExecuteResult, Fault> {
        if dest.is_special() {
            return Err(ExecutionFault::WriteToReadOnlyRegister { reg: dest.index() }.into());
        }
        Ok(ExecuteResult::Request {
            address: Self::effective_address(addr, ctx),
            kind: RequestKind::Read,
        })
    }

    /// Issue `STR [addr], data`.
    pub fn store(addr: Reg, data: Reg, ctx: &ThreadContext) -> ExecuteResult {
        ExecuteResult::Request {
            address: Self::effective_address(addr, ctx),
            kind: RequestKind::Write {
                value: ctx.regs.read(data) as u32,
            },
        }
    }

    /// Complete an `LDR` by writing the returned word to `dest`.
    pub fn complete_load(
        dest: Reg,
        response: MemoryResponse,
        ctx: &mut ThreadContext,
    ) -> Result<(), Fault> {
        if let MemoryResponse::Data(word) = response {
            ctx.regs.write(dest, word as i32)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::state::ThreadId;

    #[test]
    fn test_load_uses_register_value() {
        let mut ctx = ThreadContext::new(ThreadId::default(), 1);
        ctx.regs.write(Reg::new(3), 17).unwrap();
        assert_eq!(
            MemoryUnit::load(Reg::new(0), Reg::new(3), &ctx),
            Ok(ExecuteResult::Request { address: 17, kind: RequestKind::Read })
        );
    }

    #[test]
    fn test_load_to_special_register_faults_at_issue() {
        let ctx = ThreadContext::new(ThreadId::default(), 1);
        assert_eq!(
            MemoryUnit::load(Reg::THREAD_IDX, Reg::new(0), &ctx),
            Err(Fault::Execution(ExecutionFault::WriteToReadOnlyRegister { reg: 15 }))
        );
    }

    #[test]
    fn test_negative_address_is_passed_through() {
        let mut ctx = ThreadContext::new(ThreadId::default(), 1);
        ctx.regs.write(Reg::new(3), -4).unwrap();
        assert_eq!(MemoryUnit::effective_address(Reg::new(3), &ctx), -4);
    }

    #[test]
    fn test_store_carries_raw_bits() {
        let mut ctx = ThreadContext::new(ThreadId::default(), 1);
        ctx.regs.write(Reg::new(0), 2).unwrap();
        ctx.regs.write(Reg::new(1), -1).unwrap();
        assert_eq!(
            MemoryUnit::store(Reg::new(0), Reg::new(1), &ctx),
            ExecuteResult::Request {
                address: 2,
                kind: RequestKind::Write { value: 0xFFFF_FFFF },
            }
        );
    }

    #[test]
    fn test_complete_load() {
        let mut ctx = ThreadContext::new(ThreadId::default(), 1);
        MemoryUnit::complete_load(Reg::new(5), MemoryResponse::Data(200), &mut ctx).unwrap();
        assert_eq!(ctx.regs.read(Reg::new(5)), 200);

        let err = MemoryUnit::complete_load(Reg::BLOCK_IDX, MemoryResponse::Data(1), &mut ctx)
            .unwrap_err();
        assert_eq!(err, Fault::Execution(ExecutionFault::WriteToReadOnlyRegister { reg: 13 }));
    }
}
