//! Core traits for the interpreter.
//!
//! These traits define the seams between the thread cores and the rest of the
//! system:
//!
//! - `Executor`: applies one decoded instruction to a thread context
//! - `MemoryPort`: the request/response interface to the memory model
//!
//! Cores are generic over both, so tests can drive a core against a scripted
//! memory or swap in an instrumented executor.

use super::fault::{Fault, MemoryFault};
use super::instruction::Instruction;
use super::state::{ThreadContext, ThreadId};
use super::timing::{MemoryRequest, MemoryResponse, RequestKind};

/// Result of executing one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecuteResult {
    /// Continue with the next instruction (PC + 1).
    Continue,

    /// Continue at the given instruction index.
    Branch {
        /// Target program counter. Not range-checked; a negative value is
        /// reported as out of range by the core.
        target: i64,
    },

    /// Issue a memory request and wait for its response.
    Request {
        /// Effective address as computed from the register. Not range-checked.
        address: i64,
        /// Read or write.
        kind: RequestKind,
    },

    /// The thread has retired (`RET`).
    Retire,
}

/// Trait for executing decoded instructions.
///
/// # Example
///
/// ```
/// use simt_emu::interpreter::execute::SimtExecutor;
/// use simt_emu::interpreter::instruction::{Instruction, Reg};
/// use simt_emu::interpreter::state::{ThreadContext, ThreadId};
/// use simt_emu::interpreter::traits::{ExecuteResult, Executor};
///
/// let mut executor = SimtExecutor::new();
/// let mut ctx = ThreadContext::new(ThreadId::new(0, 5), 16);
///
/// let add = Instruction::add(Reg::new(0), Reg::THREAD_IDX, Reg::THREAD_IDX);
/// assert_eq!(executor.execute(&add, &mut ctx), Ok(ExecuteResult::Continue));
/// assert_eq!(ctx.regs.read(Reg::new(0)), 10);
/// ```
pub trait Executor {
    /// Execute `instr` against `ctx`.
    ///
    /// Register effects are applied immediately. Control flow and memory
    /// traffic are reported through the result; the caller updates the PC
    /// and submits requests. A fault leaves the context unchanged.
    fn execute(&mut self, instr: &Instruction, ctx: &mut ThreadContext) -> Result<ExecuteResult, Fault>;

    /// Apply the response to a request previously returned from `execute`.
    fn complete(
        &mut self,
        instr: &Instruction,
        response: MemoryResponse,
        ctx: &mut ThreadContext,
    ) -> Result<(), Fault>;
}

/// Request/response interface to a memory model.
///
/// A thread submits at most one request and then polls for its response on
/// later cycles. Responses are keyed by requester, so each thread only ever
/// sees its own.
pub trait MemoryPort {
    /// Submit a request. Out-of-range addresses are rejected immediately.
    fn submit(&mut self, request: MemoryRequest) -> Result<(), MemoryFault>;

    /// Take the completed response for `requester`, if one is ready.
    fn take_response(&mut self, requester: ThreadId) -> Option<MemoryResponse>;

    /// Number of addressable words.
    fn size(&self) -> usize;

    /// Range-check an effective address and build the request for it.
    fn request(
        &self,
        requester: ThreadId,
        address: i64,
        kind: RequestKind,
    ) -> Result<MemoryRequest, MemoryFault> {
        let size = self.size();
        match u32::try_from(address) {
            Ok(a) if (a as usize) < size => Ok(MemoryRequest { requester, address: a, kind }),
            _ => Err(MemoryFault::AddressOutOfRange { address, size }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execute_result_variants() {
        let r = ExecuteResult::Branch { target: 4 };
        assert!(matches!(r, ExecuteResult::Branch { target: 4 }));

        let r = ExecuteResult::Request { address: -1, kind: RequestKind::Read };
        assert!(matches!(r, ExecuteResult::Request { address: -1, .. }));
        assert_ne!(ExecuteResult::Continue, ExecuteResult::Retire);
    }

    struct Fixed(usize);

    impl MemoryPort for Fixed {
        fn submit(&mut self, _request: MemoryRequest) -> Result<(), MemoryFault> {
            Ok(())
        }

        fn take_response(&mut self, _requester: ThreadId) -> Option<MemoryResponse> {
            None
        }

        fn size(&self) -> usize {
            self.0
        }
    }

    #[test]
    fn test_request_range_check() {
        let port = Fixed(256);
        let id = ThreadId::new(0, 0);

        let req = port.request(id, 255, RequestKind::Read).unwrap();
        assert_eq!(req, MemoryRequest::read(id, 255));

        assert_eq!(
            port.request(id, 256, RequestKind::Read),
            Err(MemoryFault::AddressOutOfRange { address: 256, size: 256 })
        );
        assert_eq!(
            port.request(id, -3, RequestKind::Write { value: 1 }),
            Err(MemoryFault::AddressOutOfRange { address: -3, size: 256 })
        );
    }
}
