//! Bit-level field layout shared by the decoder and the encoder.

use super::{Instruction, Reg};

/// Shift of the opcode nibble.
pub const OPCODE_SHIFT: u32 = 12;

/// Width of the branch offset field.
pub const OFFSET_BITS: u32 = 10;

/// Mask of the two-bit branch condition marker (after shifting).
pub const COND_MASK: u16 = 0b11;

/// Smallest encodable branch offset.
pub const BRANCH_OFFSET_MIN: i16 = -(1 << (OFFSET_BITS - 1));

/// Largest encodable branch offset.
pub const BRANCH_OFFSET_MAX: i16 = (1 << (OFFSET_BITS - 1)) - 1;

const OFFSET_MASK: u16 = (1 << OFFSET_BITS) - 1;
const COND_SHIFT: u32 = OFFSET_BITS;

/// Opcode nibble (bits 15-12).
#[inline]
pub(crate) fn opcode_nibble(word: u16) -> u8 {
    (word >> OPCODE_SHIFT) as u8
}

/// First register field (bits 11-8).
#[inline]
pub(crate) fn reg_a(word: u16) -> Reg {
    Reg::new((word >> 8) as u8)
}

/// Second register field (bits 7-4).
#[inline]
pub(crate) fn reg_b(word: u16) -> Reg {
    Reg::new((word >> 4) as u8)
}

/// Third register field (bits 3-0).
#[inline]
pub(crate) fn reg_c(word: u16) -> Reg {
    Reg::new(word as u8)
}

/// Eight-bit immediate (bits 7-0).
#[inline]
pub(crate) fn imm8(word: u16) -> u8 {
    word as u8
}

/// Branch condition marker (bits 11-10).
#[inline]
pub(crate) fn branch_cond(word: u16) -> u8 {
    ((word >> COND_SHIFT) & COND_MASK) as u8
}

/// Branch offset (bits 9-0), sign-extended from ten bits.
#[inline]
pub(crate) fn branch_offset(word: u16) -> i16 {
    let raw = word & OFFSET_MASK;
    // Shift the field's sign bit into bit 15, then arithmetic-shift back.
    ((raw << (16 - OFFSET_BITS)) as i16) >> (16 - OFFSET_BITS)
}

fn pack(opcode: u8, a: u8, b: u8, c: u8) -> u16 {
    ((opcode as u16 & 0xF) << OPCODE_SHIFT)
        | ((a as u16 & 0xF) << 8)
        | ((b as u16 & 0xF) << 4)
        | (c as u16 & 0xF)
}

pub(super) fn encode(instr: &Instruction) -> u16 {
    let op = instr.opcode().bits();
    match *instr {
        Instruction::Nop | Instruction::Ret => (op as u16) << OPCODE_SHIFT,
        Instruction::Brn { cond, offset } => {
            debug_assert!(
                (BRANCH_OFFSET_MIN..=BRANCH_OFFSET_MAX).contains(&offset),
                "branch offset {} does not fit in {} bits",
                offset,
                OFFSET_BITS
            );
            ((op as u16) << OPCODE_SHIFT)
                | ((cond as u16 & COND_MASK) << COND_SHIFT)
                | (offset as u16 & OFFSET_MASK)
        }
        Instruction::Cmp { src1, src2 } => pack(op, 0, src1.index(), src2.index()),
        Instruction::Alu { dest, src1, src2, .. } => {
            pack(op, dest.index(), src1.index(), src2.index())
        }
        Instruction::Ldr { dest, addr } => pack(op, dest.index(), addr.index(), 0),
        Instruction::Str { addr, data } => pack(op, 0, addr.index(), data.index()),
        Instruction::Const { dest, imm } => {
            ((op as u16) << OPCODE_SHIFT) | ((dest.index() as u16) << 8) | imm as u16
        }
    }
}
