//! Scalar ALU execution unit.
//!
//! Integer arithmetic on 32-bit signed registers.
//!
//! # Operations
//!
//! - **Arithmetic**: add, sub, mul (wrapping), div (truncating, traps on zero)
//! - **Compare**: cmp (sets the negative flag from `src1 - src2`)
//! - **Constant**: const (zero-extended 8-bit immediate)

use crate::interpreter::fault::{ArithmeticFault, Fault};
use crate::interpreter::instruction::{AluOp, Reg};
use crate::interpreter::state::ThreadContext;

/// Scalar ALU execution unit.
pub struct ScalarAlu;

impl ScalarAlu {
    /// Compute `a <op> b`.
    ///
    /// `DIV` truncates toward zero; `i32::MIN / -1` wraps to `i32::MIN`.
    #[inline]
    pub fn apply(op: AluOp, a: i32, b: i32) -> Result<i32, ArithmeticFault> {
        Ok(match op {
            AluOp::Add => a.wrapping_add(b),
            AluOp::Sub => a.wrapping_sub(b),
            AluOp::Mul => a.wrapping_mul(b),
            AluOp::Div => {
                if b == 0 {
                    return Err(ArithmeticFault::DivisionByZero);
                }
                a.wrapping_div(b)
            }
        })
    }

    /// Execute `dest = src1 <op> src2`.
    ///
    /// Operands are read before the destination is written, so `dest` may
    /// alias a source. Arithmetic faults are raised before the write-back
    /// check.
    pub fn execute(
        op: AluOp,
        dest: Reg,
        src1: Reg,
        src2: Reg,
        ctx: &mut ThreadContext,
    ) -> Result<(), Fault> {
        let a = ctx.regs.read(src1);
        let b = ctx.regs.read(src2);
        let result = Self::apply(op, a, b)?;
        ctx.regs.write(dest, result)?;
        Ok(())
    }

    /// Execute `CMP src1, src2`: negative flag = `(src1 - src2) < 0`.
    pub fn compare(src1: Reg, src2: Reg, ctx: &mut ThreadContext) {
        let diff = ctx.regs.read(src1).wrapping_sub(ctx.regs.read(src2));
        ctx.regs.set_negative(diff < 0);
    }

    /// Execute `CONST dest, #imm`.
    pub fn constant(dest: Reg, imm: u8, ctx: &mut ThreadContext) -> Result<(), Fault> {
        ctx.regs.write(dest, imm as i32)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::fault::ExecutionFault;
    use crate::interpreter::state::ThreadId;

    fn ctx() -> ThreadContext {
        ThreadContext::new(ThreadId::new(0, 5), 16)
    }

    #[test]
    fn test_wrapping_arithmetic() {
        assert_eq!(ScalarAlu::apply(AluOp::Add, i32::MAX, 1), Ok(i32::MIN));
        assert_eq!(ScalarAlu::apply(AluOp::Sub, i32::MIN, 1), Ok(i32::MAX));
        assert_eq!(ScalarAlu::apply(AluOp::Mul, 0x1_0000, 0x1_0000), Ok(0));
        assert_eq!(ScalarAlu::apply(AluOp::Mul, -3, 7), Ok(-21));
    }

    #[test]
    fn test_division() {
        assert_eq!(ScalarAlu::apply(AluOp::Div, 7, 2), Ok(3));
        assert_eq!(ScalarAlu::apply(AluOp::Div, -7, 2), Ok(-3));
        assert_eq!(ScalarAlu::apply(AluOp::Div, i32::MIN, -1), Ok(i32::MIN));
        assert_eq!(
            ScalarAlu::apply(AluOp::Div, 1, 0),
            Err(ArithmeticFault::DivisionByZero)
        );
    }

    #[test]
    fn test_execute_reads_before_write() {
        let mut ctx = ctx();
        ctx.regs.write(Reg::new(1), 6).unwrap();
        ScalarAlu::execute(AluOp::Mul, Reg::new(1), Reg::new(1), Reg::THREAD_IDX, &mut ctx)
            .unwrap();
        assert_eq!(ctx.regs.read(Reg::new(1)), 30);
    }

    #[test]
    fn test_execute_special_dest_faults() {
        let mut ctx = ctx();
        let err = ScalarAlu::execute(AluOp::Add, Reg::BLOCK_DIM, Reg::new(0), Reg::new(0), &mut ctx)
            .unwrap_err();
        assert_eq!(err, Fault::Execution(ExecutionFault::WriteToReadOnlyRegister { reg: 14 }));
        assert_eq!(ctx.regs.read(Reg::BLOCK_DIM), 16);
    }

    #[test]
    fn test_div_by_zero_leaves_dest() {
        let mut ctx = ctx();
        ctx.regs.write(Reg::new(2), 99).unwrap();
        let err = ScalarAlu::execute(AluOp::Div, Reg::new(2), Reg::new(2), Reg::new(3), &mut ctx)
            .unwrap_err();
        assert_eq!(err, Fault::Arithmetic(ArithmeticFault::DivisionByZero));
        assert_eq!(ctx.regs.read(Reg::new(2)), 99);
    }

    #[test]
    fn test_compare_sets_negative_flag() {
        let mut ctx = ctx();
        ctx.regs.write(Reg::new(0), 3).unwrap();
        ctx.regs.write(Reg::new(1), 4).unwrap();

        ScalarAlu::compare(Reg::new(0), Reg::new(1), &mut ctx);
        assert!(ctx.regs.negative());

        ScalarAlu::compare(Reg::new(1), Reg::new(0), &mut ctx);
        assert!(!ctx.regs.negative());

        // Equal operands clear the flag
        ScalarAlu::compare(Reg::new(0), Reg::new(0), &mut ctx);
        assert!(!ctx.regs.negative());
    }

    #[test]
    fn test_compare_wraps() {
        let mut ctx = ctx();
        ctx.regs.write(Reg::new(0), i32::MIN).unwrap();
        ctx.regs.write(Reg::new(1), 1).unwrap();
        // i32::MIN - 1 wraps to i32::MAX
        ScalarAlu::compare(Reg::new(0), Reg::new(1), &mut ctx);
        assert!(!ctx.regs.negative());
    }

    #[test]
    fn test_constant_zero_extends() {
        let mut ctx = ctx();
        ScalarAlu::constant(Reg::new(4), 0xFF, &mut ctx).unwrap();
        assert_eq!(ctx.regs.read(Reg::new(4)), 255);
        assert!(ScalarAlu::constant(Reg::THREAD_IDX, 1, &mut ctx).is_err());
    }
}
