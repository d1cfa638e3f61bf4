//! Execution units for SIMT instructions.
//!
//! Each unit handles one category of instructions:
//!
//! | Unit | Instructions |
//! |------|--------------|
//! | Scalar ALU | `ADD`, `SUB`, `MUL`, `DIV`, `CMP`, `CONST` |
//! | Memory | `LDR`, `STR` |
//! | Control | `BRn`, `RET` |
//!
//! [`SimtExecutor`] dispatches a decoded instruction to the right unit and
//! keeps an instruction-mix histogram.

mod alu;
mod control;
mod memory;

pub use alu::ScalarAlu;
pub use control::ControlUnit;
pub use memory::MemoryUnit;

use crate::interpreter::fault::Fault;
use crate::interpreter::instruction::{Instruction, Opcode};
use crate::interpreter::state::ThreadContext;
use crate::interpreter::timing::MemoryResponse;
use crate::interpreter::traits::{ExecuteResult, Executor};

/// Executor for the 16-bit SIMT instruction set.
///
/// Stateless apart from counters; one executor can serve every thread.
#[derive(Debug, Clone, Default)]
pub struct SimtExecutor {
    /// Executed instructions, indexed by opcode nibble.
    counts: [u64; 16],
}

impl SimtExecutor {
    /// Create a new executor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of executed instructions with the given opcode.
    pub fn count(&self, opcode: Opcode) -> u64 {
        self.counts[opcode.bits() as usize]
    }

    /// Total executed instructions.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Non-zero opcode counts, in opcode order.
    pub fn mix(&self) -> Vec<(Opcode, u64)> {
        (0..16u8)
            .filter_map(|n| Opcode::from_nibble(n).map(|op| (op, self.counts[n as usize])))
            .filter(|(_, c)| *c > 0)
            .collect()
    }

    /// Reset counters.
    pub fn reset_stats(&mut self) {
        self.counts = [0; 16];
    }
}

impl Executor for SimtExecutor {
    fn execute(&mut self, instr: &Instruction, ctx: &mut ThreadContext) -> Result<ExecuteResult, Fault> {
        self.counts[instr.opcode().bits() as usize] += 1;

        match *instr {
            Instruction::Nop => Ok(ExecuteResult::Continue),
            Instruction::Alu { op, dest, src1, src2 } => {
                ScalarAlu::execute(op, dest, src1, src2, ctx)?;
                Ok(ExecuteResult::Continue)
            }
            Instruction::Cmp { src1, src2 } => {
                ScalarAlu::compare(src1, src2, ctx);
                Ok(ExecuteResult::Continue)
            }
            Instruction::Const { dest, imm } => {
                ScalarAlu::constant(dest, imm, ctx)?;
                Ok(ExecuteResult::Continue)
            }
            Instruction::Brn { offset, .. } => Ok(ControlUnit::branch_if_negative(offset, ctx)),
            Instruction::Ldr { dest, addr } => MemoryUnit::load(dest, addr, ctx),
            Instruction::Str { addr, data } => Ok(MemoryUnit::store(addr, data, ctx)),
            Instruction::Ret => Ok(ExecuteResult::Retire),
        }
    }

    fn complete(
        &mut self,
        instr: &Instruction,
        response: MemoryResponse,
        ctx: &mut ThreadContext,
    ) -> Result<(), Fault> {
        match *instr {
            Instruction::Ldr { dest, .. } => MemoryUnit::complete_load(dest, response, ctx),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::fault::{ArithmeticFault, ExecutionFault};
    use crate::interpreter::instruction::Reg;
    use crate::interpreter::state::ThreadId;
    use crate::interpreter::timing::RequestKind;

    fn ctx() -> ThreadContext {
        ThreadContext::new(ThreadId::new(0, 5), 16)
    }

    #[test]
    fn test_global_index_computation() {
        // MUL R0, %blockIdx, %blockDim ; ADD R0, R0, %threadIdx
        let mut executor = SimtExecutor::new();
        let mut ctx = ctx();
        let prog = [
            Instruction::mul(Reg::new(0), Reg::BLOCK_IDX, Reg::BLOCK_DIM),
            Instruction::add(Reg::new(0), Reg::new(0), Reg::THREAD_IDX),
        ];
        for instr in &prog {
            assert_eq!(executor.execute(instr, &mut ctx), Ok(ExecuteResult::Continue));
        }
        assert_eq!(ctx.regs.read(Reg::new(0)), 5);
        assert_eq!(executor.count(Opcode::Mul), 1);
        assert_eq!(executor.count(Opcode::Add), 1);
        assert_eq!(executor.total(), 2);
    }

    #[test]
    fn test_cmp_then_branch() {
        let mut executor = SimtExecutor::new();
        let mut ctx = ctx();
        ctx.set_pc(3);
        ctx.regs.write(Reg::new(0), 3).unwrap();
        ctx.regs.write(Reg::new(1), 4).unwrap();

        let cmp = Instruction::Cmp { src1: Reg::new(0), src2: Reg::new(1) };
        executor.execute(&cmp, &mut ctx).unwrap();
        assert_eq!(
            executor.execute(&Instruction::brn(-4), &mut ctx),
            Ok(ExecuteResult::Branch { target: 0 })
        );

        let cmp = Instruction::Cmp { src1: Reg::new(1), src2: Reg::new(0) };
        executor.execute(&cmp, &mut ctx).unwrap();
        assert_eq!(
            executor.execute(&Instruction::brn(-4), &mut ctx),
            Ok(ExecuteResult::Continue)
        );
    }

    #[test]
    fn test_branch_does_not_touch_flag() {
        let mut executor = SimtExecutor::new();
        let mut ctx = ctx();
        ctx.regs.set_negative(true);
        executor.execute(&Instruction::brn(0), &mut ctx).unwrap();
        executor.execute(&Instruction::add(Reg::new(0), Reg::new(0), Reg::new(0)), &mut ctx).unwrap();
        assert!(ctx.regs.negative());
    }

    #[test]
    fn test_memory_instructions_issue_requests() {
        let mut executor = SimtExecutor::new();
        let mut ctx = ctx();
        ctx.regs.write(Reg::new(2), 40).unwrap();
        ctx.regs.write(Reg::new(3), 7).unwrap();

        let ldr = Instruction::Ldr { dest: Reg::new(1), addr: Reg::new(2) };
        assert_eq!(
            executor.execute(&ldr, &mut ctx),
            Ok(ExecuteResult::Request { address: 40, kind: RequestKind::Read })
        );
        executor.complete(&ldr, MemoryResponse::Data(9), &mut ctx).unwrap();
        assert_eq!(ctx.regs.read(Reg::new(1)), 9);

        let st = Instruction::Str { addr: Reg::new(2), data: Reg::new(3) };
        assert_eq!(
            executor.execute(&st, &mut ctx),
            Ok(ExecuteResult::Request { address: 40, kind: RequestKind::Write { value: 7 } })
        );
        executor.complete(&st, MemoryResponse::WriteAck, &mut ctx).unwrap();
    }

    #[test]
    fn test_faults_propagate() {
        let mut executor = SimtExecutor::new();
        let mut ctx = ctx();
        assert_eq!(
            executor.execute(&Instruction::div(Reg::new(0), Reg::new(1), Reg::new(2)), &mut ctx),
            Err(Fault::Arithmetic(ArithmeticFault::DivisionByZero))
        );
        assert_eq!(
            executor.execute(&Instruction::Const { dest: Reg::BLOCK_IDX, imm: 1 }, &mut ctx),
            Err(Fault::Execution(ExecutionFault::WriteToReadOnlyRegister { reg: 13 }))
        );
    }

    #[test]
    fn test_nop_and_ret() {
        let mut executor = SimtExecutor::new();
        let mut ctx = ctx();
        assert_eq!(executor.execute(&Instruction::Nop, &mut ctx), Ok(ExecuteResult::Continue));
        assert_eq!(executor.execute(&Instruction::Ret, &mut ctx), Ok(ExecuteResult::Retire));
        assert_eq!(
            executor.mix(),
            vec![(Opcode::Nop, 1), (Opcode::Ret, 1)]
        );
        executor.reset_stats();
        assert_eq!(executor.total(), 0);
    }
}
