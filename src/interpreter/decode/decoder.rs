//! Word-to-instruction decoding.

use crate::interpreter::fault::DecodeError;
use crate::interpreter::instruction::encoding::{
    branch_cond, branch_offset, imm8, opcode_nibble, reg_a, reg_b, reg_c,
};
use crate::interpreter::instruction::{AluOp, Instruction, Opcode};

/// Decode a 16-bit instruction word.
///
/// Decoding never looks at processor state. Fields that an opcode does not
/// use are ignored, so `0xF123` decodes to `RET` just like `0xF000`.
pub fn decode(word: u16) -> Result<Instruction, DecodeError> {
    let nibble = opcode_nibble(word);
    let opcode = Opcode::from_nibble(nibble).ok_or(DecodeError::UnknownOpcode {
        opcode: nibble,
        word,
    })?;

    let instr = match opcode {
        Opcode::Nop => Instruction::Nop,
        Opcode::Brn => Instruction::Brn {
            cond: branch_cond(word),
            offset: branch_offset(word),
        },
        Opcode::Cmp => Instruction::Cmp {
            src1: reg_b(word),
            src2: reg_c(word),
        },
        Opcode::Add => alu(AluOp::Add, word),
        Opcode::Sub => alu(AluOp::Sub, word),
        Opcode::Mul => alu(AluOp::Mul, word),
        Opcode::Div => alu(AluOp::Div, word),
        Opcode::Ldr => Instruction::Ldr {
            dest: reg_a(word),
            addr: reg_b(word),
        },
        Opcode::Str => Instruction::Str {
            addr: reg_b(word),
            data: reg_c(word),
        },
        Opcode::Const => Instruction::Const {
            dest: reg_a(word),
            imm: imm8(word),
        },
        Opcode::Ret => Instruction::Ret,
    };

    Ok(instr)
}

#[inline]
fn alu(op: AluOp, word: u16) -> Instruction {
    Instruction::Alu {
        op,
        dest: reg_a(word),
        src1: reg_b(word),
        src2: reg_c(word),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::instruction::Reg;

    #[test]
    fn test_decode_nop_and_ret() {
        assert_eq!(decode(0x0000), Ok(Instruction::Nop));
        assert_eq!(decode(0xF000), Ok(Instruction::Ret));
        // Remaining RET bits are ignored
        assert_eq!(decode(0xFABC), Ok(Instruction::Ret));
    }

    #[test]
    fn test_decode_unknown_opcodes() {
        for nibble in 0xAu16..=0xE {
            let word = (nibble << 12) | 0x123;
            assert_eq!(
                decode(word),
                Err(DecodeError::UnknownOpcode { opcode: nibble as u8, word })
            );
        }
    }

    #[test]
    fn test_decode_cmp_ignores_dest_nibble() {
        let a = decode(0b0010_0000_1001_0010).unwrap();
        let b = decode(0b0010_1111_1001_0010).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, Instruction::Cmp { src1: Reg::new(9), src2: Reg::new(2) });
    }

    #[test]
    fn test_decode_special_register_destination() {
        // Decoding succeeds; the write is rejected at execute time.
        let instr = decode(0b0101_1101_1011_1100).unwrap();
        assert_eq!(instr.dest(), Some(Reg::BLOCK_IDX));
    }

    #[test]
    fn test_encode_inverts_decode_for_canonical_words() {
        for word in 0..=u16::MAX {
            if let Ok(instr) = decode(word) {
                let canonical = instr.encode();
                assert_eq!(decode(canonical), Ok(instr), "word 0x{:04X}", word);
            }
        }
    }
}
