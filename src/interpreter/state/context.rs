//! Thread identity and execution context.

use std::fmt;

use super::registers::RegisterFile;

/// Grid coordinates of a thread.
///
/// Ordering is block-major, which matches the global thread index
/// `block * blockDim + thread`. Arbitration and fault reporting both rely on
/// this ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ThreadId {
    /// Block index.
    pub block: u32,
    /// Thread index within the block.
    pub thread: u32,
}

impl ThreadId {
    pub const fn new(block: u32, thread: u32) -> Self {
        Self { block, thread }
    }

    /// Global thread index for a given block dimension.
    pub fn global(&self, block_dim: u32) -> u64 {
        self.block as u64 * block_dim as u64 + self.thread as u64
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.block, self.thread)
    }
}

/// Per-thread execution counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThreadStats {
    /// Instructions executed, including the retiring `RET`.
    pub instructions: u64,
    /// Cycles spent waiting on the memory model.
    pub stall_cycles: u64,
    /// Memory requests issued.
    pub memory_requests: u64,
    /// Branches taken.
    pub branches_taken: u64,
}

/// Architectural state of one thread: identity, PC and registers.
///
/// Contexts are created at launch and never shared; each one is owned by
/// exactly one core.
#[derive(Debug, Clone)]
pub struct ThreadContext {
    id: ThreadId,
    pc: u32,
    /// Register file.
    pub regs: RegisterFile,
    /// Set once the thread has retired (normally or through a fault).
    pub retired: bool,
    /// Execution counters.
    pub stats: ThreadStats,
}

impl ThreadContext {
    /// Create a context at PC 0 with special registers bound from the
    /// thread's grid position.
    pub fn new(id: ThreadId, block_dim: u32) -> Self {
        Self {
            id,
            pc: 0,
            regs: RegisterFile::new(id.block as i32, block_dim as i32, id.thread as i32),
            retired: false,
            stats: ThreadStats::default(),
        }
    }

    /// Thread identity.
    #[inline]
    pub fn id(&self) -> ThreadId {
        self.id
    }

    /// Current program counter (instruction index).
    #[inline]
    pub fn pc(&self) -> u32 {
        self.pc
    }

    /// Set the program counter.
    #[inline]
    pub fn set_pc(&mut self, pc: u32) {
        self.pc = pc;
    }

    /// Advance to the next instruction.
    #[inline]
    pub fn advance_pc(&mut self) {
        self.pc = self.pc.wrapping_add(1);
    }

    /// Record stall cycles.
    #[inline]
    pub fn record_stall(&mut self, cycles: u64) {
        self.stats.stall_cycles += cycles;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::instruction::Reg;

    #[test]
    fn test_thread_id_ordering_is_block_major() {
        let mut ids = vec![ThreadId::new(1, 0), ThreadId::new(0, 3), ThreadId::new(0, 1)];
        ids.sort();
        assert_eq!(ids, vec![ThreadId::new(0, 1), ThreadId::new(0, 3), ThreadId::new(1, 0)]);
        assert_eq!(ThreadId::new(2, 3).global(4), 11);
    }

    #[test]
    fn test_context_binds_special_registers() {
        let ctx = ThreadContext::new(ThreadId::new(3, 1), 4);
        assert_eq!(ctx.pc(), 0);
        assert!(!ctx.retired);
        assert_eq!(ctx.regs.read(Reg::BLOCK_IDX), 3);
        assert_eq!(ctx.regs.read(Reg::BLOCK_DIM), 4);
        assert_eq!(ctx.regs.read(Reg::THREAD_IDX), 1);
    }

    #[test]
    fn test_pc_and_stall_tracking() {
        let mut ctx = ThreadContext::new(ThreadId::default(), 1);
        ctx.advance_pc();
        ctx.advance_pc();
        assert_eq!(ctx.pc(), 2);
        ctx.set_pc(10);
        assert_eq!(ctx.pc(), 10);
        ctx.record_stall(3);
        assert_eq!(ctx.stats.stall_cycles, 3);
    }
}
