//! Instruction representation for the 16-bit SIMT ISA.
//!
//! Every instruction is a single 16-bit word. The top nibble selects the
//! opcode; the remaining twelve bits are laid out per opcode:
//!
//! | Opcode | Bits 15-12 | Bits 11-8 | Bits 7-4 | Bits 3-0 |
//! |--------|------------|-----------|----------|----------|
//! | NOP    | `0000` | - | - | - |
//! | BRn    | `0001` | cond (11-10), offset (9-0, signed) |||
//! | CMP    | `0010` | - | src1 | src2 |
//! | ADD    | `0011` | dest | src1 | src2 |
//! | SUB    | `0100` | dest | src1 | src2 |
//! | MUL    | `0101` | dest | src1 | src2 |
//! | DIV    | `0110` | dest | src1 | src2 |
//! | LDR    | `0111` | dest | addr | - |
//! | STR    | `1000` | - | addr | data |
//! | CONST  | `1001` | dest | imm (7-0) ||
//! | RET    | `1111` | - | - | - |
//!
//! Opcodes `1010`-`1110` are undefined.

pub(crate) mod encoding;

pub use encoding::{
    BRANCH_OFFSET_MAX, BRANCH_OFFSET_MIN, COND_MASK, OFFSET_BITS, OPCODE_SHIFT,
};

use std::fmt;

/// Number of general purpose registers (R0-R12).
pub const NUM_GENERAL_REGS: usize = 13;

/// Opcode nibble values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    Nop = 0b0000,
    Brn = 0b0001,
    Cmp = 0b0010,
    Add = 0b0011,
    Sub = 0b0100,
    Mul = 0b0101,
    Div = 0b0110,
    Ldr = 0b0111,
    Str = 0b1000,
    Const = 0b1001,
    Ret = 0b1111,
}

impl Opcode {
    /// Look up an opcode from its nibble. Returns `None` for undefined codes.
    pub fn from_nibble(nibble: u8) -> Option<Self> {
        Some(match nibble & 0xF {
            0b0000 => Opcode::Nop,
            0b0001 => Opcode::Brn,
            0b0010 => Opcode::Cmp,
            0b0011 => Opcode::Add,
            0b0100 => Opcode::Sub,
            0b0101 => Opcode::Mul,
            0b0110 => Opcode::Div,
            0b0111 => Opcode::Ldr,
            0b1000 => Opcode::Str,
            0b1001 => Opcode::Const,
            0b1111 => Opcode::Ret,
            _ => return None,
        })
    }

    /// The opcode nibble.
    #[inline]
    pub fn bits(self) -> u8 {
        self as u8
    }

    /// Assembly mnemonic.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Nop => "NOP",
            Opcode::Brn => "BRn",
            Opcode::Cmp => "CMP",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Div => "DIV",
            Opcode::Ldr => "LDR",
            Opcode::Str => "STR",
            Opcode::Const => "CONST",
            Opcode::Ret => "RET",
        }
    }
}

/// A 4-bit register index.
///
/// Indices 0-12 name general purpose registers; 13, 14 and 15 name the
/// read-only block index, block dimension and thread index registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Reg(u8);

impl Reg {
    /// `%blockIdx`
    pub const BLOCK_IDX: Reg = Reg(13);
    /// `%blockDim`
    pub const BLOCK_DIM: Reg = Reg(14);
    /// `%threadIdx`
    pub const THREAD_IDX: Reg = Reg(15);

    /// Create a register from an index. Only the low four bits are kept.
    #[inline]
    pub const fn new(index: u8) -> Self {
        Self(index & 0xF)
    }

    /// Register index (0-15).
    #[inline]
    pub const fn index(self) -> u8 {
        self.0
    }

    /// True for the three read-only special registers.
    #[inline]
    pub const fn is_special(self) -> bool {
        self.0 as usize >= NUM_GENERAL_REGS
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Reg::BLOCK_IDX => f.write_str("%blockIdx"),
            Reg::BLOCK_DIM => f.write_str("%blockDim"),
            Reg::THREAD_IDX => f.write_str("%threadIdx"),
            Reg(n) => write!(f, "R{}", n),
        }
    }
}

/// Arithmetic operation of an ALU-class instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AluOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl AluOp {
    /// Opcode that encodes this operation.
    pub fn opcode(self) -> Opcode {
        match self {
            AluOp::Add => Opcode::Add,
            AluOp::Sub => Opcode::Sub,
            AluOp::Mul => Opcode::Mul,
            AluOp::Div => Opcode::Div,
        }
    }
}

/// A decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instruction {
    /// No operation.
    Nop,

    /// Branch to `PC + 1 + offset` when the negative flag is set.
    Brn {
        /// Two-bit condition marker (carried through, not interpreted).
        cond: u8,
        /// Signed offset relative to the following instruction (-512..=511).
        offset: i16,
    },

    /// Set the negative flag from `src1 - src2`.
    Cmp { src1: Reg, src2: Reg },

    /// `dest = src1 <op> src2`.
    Alu {
        op: AluOp,
        dest: Reg,
        src1: Reg,
        src2: Reg,
    },

    /// `dest = mem[addr]`.
    Ldr { dest: Reg, addr: Reg },

    /// `mem[addr] = data`.
    Str { addr: Reg, data: Reg },

    /// `dest = imm` (zero-extended).
    Const { dest: Reg, imm: u8 },

    /// Retire the thread.
    Ret,
}

impl Instruction {
    /// The opcode of this instruction.
    pub fn opcode(&self) -> Opcode {
        match self {
            Instruction::Nop => Opcode::Nop,
            Instruction::Brn { .. } => Opcode::Brn,
            Instruction::Cmp { .. } => Opcode::Cmp,
            Instruction::Alu { op, .. } => op.opcode(),
            Instruction::Ldr { .. } => Opcode::Ldr,
            Instruction::Str { .. } => Opcode::Str,
            Instruction::Const { .. } => Opcode::Const,
            Instruction::Ret => Opcode::Ret,
        }
    }

    /// Register written by this instruction, if any.
    pub fn dest(&self) -> Option<Reg> {
        match *self {
            Instruction::Alu { dest, .. }
            | Instruction::Ldr { dest, .. }
            | Instruction::Const { dest, .. } => Some(dest),
            _ => None,
        }
    }

    /// True for instructions that go through the memory model.
    pub fn is_memory(&self) -> bool {
        matches!(self, Instruction::Ldr { .. } | Instruction::Str { .. })
    }

    /// Encode into a 16-bit word. Unused fields are zero.
    pub fn encode(&self) -> u16 {
        encoding::encode(self)
    }

    // Constructors used by program generators.

    pub fn add(dest: Reg, src1: Reg, src2: Reg) -> Self {
        Instruction::Alu { op: AluOp::Add, dest, src1, src2 }
    }

    pub fn sub(dest: Reg, src1: Reg, src2: Reg) -> Self {
        Instruction::Alu { op: AluOp::Sub, dest, src1, src2 }
    }

    pub fn mul(dest: Reg, src1: Reg, src2: Reg) -> Self {
        Instruction::Alu { op: AluOp::Mul, dest, src1, src2 }
    }

    pub fn div(dest: Reg, src1: Reg, src2: Reg) -> Self {
        Instruction::Alu { op: AluOp::Div, dest, src1, src2 }
    }

    /// `BRn` with the condition marker used by the existing programs (`0b10`).
    pub fn brn(offset: i16) -> Self {
        Instruction::Brn { cond: 0b10, offset }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = self.opcode().mnemonic();
        match *self {
            Instruction::Nop | Instruction::Ret => f.write_str(m),
            Instruction::Brn { offset, .. } => write!(f, "{} {:+}", m, offset),
            Instruction::Cmp { src1, src2 } => write!(f, "{} {}, {}", m, src1, src2),
            Instruction::Alu { dest, src1, src2, .. } => {
                write!(f, "{} {}, {}, {}", m, dest, src1, src2)
            }
            Instruction::Ldr { dest, addr } => write!(f, "{} {}, {}", m, dest, addr),
            Instruction::Str { addr, data } => write!(f, "{} {}, {}", m, addr, data),
            Instruction::Const { dest, imm } => write!(f, "{} {}, #{}", m, dest, imm),
        }
    }
}
