//! Matrix kernels for the SIMT core.
//!
//! Program generators for element-wise matrix addition and matrix
//! multiplication, the data layouts they expect, and reference
//! implementations to check results against.
//!
//! Matrices are stored row-major and packed back to back: `A` at `base_a`,
//! `B` right after it, `C` right after `B`. Every thread computes one element
//! of `C` from its global index `blockIdx * blockDim + threadIdx`.
//!
//! # Example
//!
//! ```
//! use simt_emu::kernels::{matmul_program, matmul_reference, MatmulLayout};
//!
//! let layout = MatmulLayout::packed(2, 2, 3).unwrap();
//! let program = matmul_program(&layout).unwrap();
//! assert_eq!(layout.threads(), 4);
//! assert!(program.len() > 20);
//!
//! let c = matmul_reference(&[1, 2, 3, 4, 5, 6], &[1, 0, 0, 1, 1, 1], 2, 2, 3);
//! assert_eq!(c, vec![4, 5, 10, 11]);
//! ```

use thiserror::Error;

use crate::interpreter::instruction::{Instruction, Reg};
use crate::interpreter::program::ProgramStore;

/// Kernel construction errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KernelError {
    #[error("matrix dimensions must be non-zero")]
    ZeroDimension,

    #[error("matrices need {needed} words; base addresses must fit in 8 bits")]
    TooLarge { needed: usize },
}

/// Words of the matrix-add kernel. The three `CONST` words take their base
/// address in the low byte.
const MATADD_WORDS: [u16; 13] = [
    0b0101_0000_1101_1110, // MUL R0, %blockIdx, %blockDim
    0b0011_0000_0000_1111, // ADD R0, R0, %threadIdx
    0b1001_0001_0000_0000, // CONST R1, #base_a
    0b1001_0010_0000_0000, // CONST R2, #base_b
    0b1001_0011_0000_0000, // CONST R3, #base_c
    0b0011_0100_0001_0000, // ADD R4, R1, R0
    0b0111_0100_0100_0000, // LDR R4, R4
    0b0011_0101_0010_0000, // ADD R5, R2, R0
    0b0111_0101_0101_0000, // LDR R5, R5
    0b0011_0110_0100_0101, // ADD R6, R4, R5
    0b0011_0111_0011_0000, // ADD R7, R3, R0
    0b1000_0000_0111_0110, // STR R7, R6
    0b1111_0000_0000_0000, // RET
];

/// 4x4 matrix multiply as first written, with `n = 4` and bases 0/16/32.
///
/// The loop branch encodes the absolute loop index (12) as its offset, so it
/// jumps to PC 37 and faults. Kept as a decode and fault vector.
pub const MATMUL_4X4_LITERAL: [u16; 28] = [
    0b0101000011011110,
    0b0011000000001111,
    0b1001000100000001,
    0b1001001000000100,
    0b1001001100000000,
    0b1001010000010000,
    0b1001010100100000,
    0b0110011000000010,
    0b0101011101100010,
    0b0100011100000111,
    0b1001100000000000,
    0b1001100100000000,
    0b0101101001100010,
    0b0011101010101001,
    0b0011101010100011,
    0b0111101010100000,
    0b0101101110010010,
    0b0011101110110111,
    0b0011101110110100,
    0b0111101110110000,
    0b0101110010101011,
    0b0011100010001100,
    0b0011100110010001,
    0b0010000010010010,
    0b0001100000001100,
    0b0011100101010000,
    0b1000000010011000,
    0b1111000000000000,
];

/// 3x3 matrix multiply as first written, with `n = cols = 3` and bases
/// 0/9/18.
///
/// Several register fields do not match their intent; the product at PC 21
/// targets `%blockIdx`, so every thread faults there.
pub const MATMUL_3X3_LITERAL: [u16; 31] = [
    0b0101000011011110,
    0b0011000000001111,
    0b1001000100000001,
    0b1001001000000011,
    0b1001001100000000,
    0b1001010000001001,
    0b1001010100010010,
    0b1001011000000011,
    0b0110011100000010,
    0b0101100011100010,
    0b0100011110001000,
    0b1001100100000000,
    0b1001101000000000,
    0b0101101111100010,
    0b0011101111111010,
    0b0011101111110011,
    0b0111101111110000,
    0b0101110000100110,
    0b0011110000110111,
    0b0011110000110100,
    0b0111110000110000,
    0b0101110110111100,
    0b0011100110011101,
    0b0011101010100001,
    0b0010000010100010,
    0b0001101111110010,
    0b0101101011110010,
    0b0011101011110111,
    0b0011101011110101,
    0b1000000010111001,
    0b1111000000000000,
];

/// Memory layout of `C = A + B` for `rows x cols` matrices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MataddLayout {
    pub rows: u8,
    pub cols: u8,
    pub base_a: u8,
    pub base_b: u8,
    pub base_c: u8,
}

impl MataddLayout {
    /// `A`, `B`, `C` packed from address 0.
    ///
    /// Only the base addresses are checked, since they are `CONST`
    /// immediates. Whether `C` fits in a given memory is up to the caller;
    /// see [`MataddLayout::end`].
    pub fn packed(rows: u8, cols: u8) -> Result<Self, KernelError> {
        if rows == 0 || cols == 0 {
            return Err(KernelError::ZeroDimension);
        }
        let size = rows as usize * cols as usize;
        let base_b = base(size, 3 * size)?;
        let base_c = base(2 * size, 3 * size)?;
        Ok(Self { rows, cols, base_a: 0, base_b, base_c })
    }

    /// Threads to launch, one per element.
    pub fn threads(&self) -> u32 {
        self.rows as u32 * self.cols as u32
    }

    /// One past the last word of `C`.
    pub fn end(&self) -> usize {
        self.base_c as usize + self.threads() as usize
    }
}

/// Memory layout of `C = A x B` with `A: rows x n`, `B: n x cols`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatmulLayout {
    pub rows: u8,
    pub cols: u8,
    pub n: u8,
    pub base_a: u8,
    pub base_b: u8,
    pub base_c: u8,
}

impl MatmulLayout {
    /// `A`, `B`, `C` packed from address 0.
    ///
    /// As with [`MataddLayout::packed`], only the bases are checked.
    pub fn packed(rows: u8, cols: u8, n: u8) -> Result<Self, KernelError> {
        if rows == 0 || cols == 0 || n == 0 {
            return Err(KernelError::ZeroDimension);
        }
        let (rows_, cols_, n_) = (rows as usize, cols as usize, n as usize);
        let needed = rows_ * n_ + n_ * cols_ + rows_ * cols_;
        let base_b = base(rows_ * n_, needed)?;
        let base_c = base(rows_ * n_ + n_ * cols_, needed)?;
        Ok(Self { rows, cols, n, base_a: 0, base_b, base_c })
    }

    /// Threads to launch, one per element of `C`.
    pub fn threads(&self) -> u32 {
        self.rows as u32 * self.cols as u32
    }

    /// One past the last word of `C`.
    pub fn end(&self) -> usize {
        self.base_c as usize + self.threads() as usize
    }
}

fn base(offset: usize, needed: usize) -> Result<u8, KernelError> {
    u8::try_from(offset).map_err(|_| KernelError::TooLarge { needed })
}

/// Matrix-add kernel: `C[i] = A[i] + B[i]`.
pub fn matadd_program(layout: &MataddLayout) -> ProgramStore {
    let mut words = MATADD_WORDS;
    words[2] |= layout.base_a as u16;
    words[3] |= layout.base_b as u16;
    words[4] |= layout.base_c as u16;
    ProgramStore::from_words(words.to_vec())
}

/// Matrix-multiply kernel.
///
/// Thread `i` computes `C[i / cols][i % cols]` with a do-while loop over
/// `k`; the loop branch offset is computed relative to the instruction after
/// the branch.
pub fn matmul_program(layout: &MatmulLayout) -> Result<ProgramStore, KernelError> {
    if layout.rows == 0 || layout.cols == 0 || layout.n == 0 {
        return Err(KernelError::ZeroDimension);
    }
    let r = Reg::new;
    let (i, one, n, a, b, c) = (r(0), r(1), r(2), r(3), r(4), r(5));
    let (row, col, acc, k, ta, tb, cols) = (r(6), r(7), r(8), r(9), r(10), r(11), r(12));

    let mut prog = vec![
        Instruction::mul(i, Reg::BLOCK_IDX, Reg::BLOCK_DIM),
        Instruction::add(i, i, Reg::THREAD_IDX),
        Instruction::Const { dest: one, imm: 1 },
        Instruction::Const { dest: n, imm: layout.n },
        Instruction::Const { dest: a, imm: layout.base_a },
        Instruction::Const { dest: b, imm: layout.base_b },
        Instruction::Const { dest: c, imm: layout.base_c },
        Instruction::Const { dest: cols, imm: layout.cols },
        Instruction::div(row, i, cols),
        Instruction::mul(col, row, cols),
        Instruction::sub(col, i, col),
        Instruction::Const { dest: acc, imm: 0 },
        Instruction::Const { dest: k, imm: 0 },
    ];

    let loop_start = prog.len();
    prog.extend([
        // A[row][k]
        Instruction::mul(ta, row, n),
        Instruction::add(ta, ta, k),
        Instruction::add(ta, ta, a),
        Instruction::Ldr { dest: ta, addr: ta },
        // B[k][col]
        Instruction::mul(tb, k, cols),
        Instruction::add(tb, tb, col),
        Instruction::add(tb, tb, b),
        Instruction::Ldr { dest: tb, addr: tb },
        Instruction::mul(ta, ta, tb),
        Instruction::add(acc, acc, ta),
        Instruction::add(k, k, one),
        Instruction::Cmp { src1: k, src2: n },
    ]);

    let offset = loop_start as i16 - (prog.len() as i16 + 1);
    prog.push(Instruction::brn(offset));

    prog.extend([
        Instruction::add(k, c, i),
        Instruction::Str { addr: k, data: acc },
        Instruction::Ret,
    ]);

    Ok(ProgramStore::from_instructions(&prog))
}

/// Element-wise sum.
pub fn matadd_reference(a: &[u32], b: &[u32]) -> Vec<u32> {
    a.iter().zip(b).map(|(x, y)| x.wrapping_add(*y)).collect()
}

/// `C = A x B` with `A: rows x n` and `B: n x cols`, row-major.
pub fn matmul_reference(a: &[u32], b: &[u32], rows: usize, cols: usize, n: usize) -> Vec<u32> {
    let mut c = vec![0u32; rows * cols];
    for i in 0..rows {
        for j in 0..cols {
            c[i * cols + j] = (0..n).fold(0u32, |acc, k| {
                acc.wrapping_add(a[i * n + k].wrapping_mul(b[k * cols + j]))
            });
        }
    }
    c
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::decode::decode_all;
    use crate::interpreter::instruction::Opcode;

    #[test]
    fn test_matadd_layout_and_program() {
        let layout = MataddLayout::packed(4, 4).unwrap();
        assert_eq!((layout.base_a, layout.base_b, layout.base_c), (0, 16, 32));
        assert_eq!(layout.threads(), 16);

        let program = matadd_program(&layout);
        assert_eq!(program.len(), 13);
        assert_eq!(program.words()[3], 0b1001001000010000);
        assert_eq!(program.words()[4], 0b1001001100100000);
    }

    #[test]
    fn test_layout_limits() {
        assert_eq!(MataddLayout::packed(0, 4), Err(KernelError::ZeroDimension));
        // Bases fit in 8 bits; C runs past a 256-word memory
        let layout = MataddLayout::packed(10, 10).unwrap();
        assert_eq!((layout.base_c, layout.end()), (200, 300));
        assert_eq!(MataddLayout::packed(4, 4).unwrap().end(), 48);
        assert_eq!(MatmulLayout::packed(2, 5, 3).unwrap().end(), 31);
        assert_eq!(
            MataddLayout::packed(16, 16),
            Err(KernelError::TooLarge { needed: 768 })
        );
        assert!(MatmulLayout::packed(8, 8, 8).is_ok());
        assert!(MatmulLayout::packed(3, 3, 0).is_err());
    }

    #[test]
    fn test_matmul_branch_targets_loop_start() {
        let layout = MatmulLayout::packed(4, 4, 4).unwrap();
        let program = matmul_program(&layout).unwrap();
        let instrs = decode_all(program.words()).unwrap();

        let (pc, instr) = instrs
            .iter()
            .enumerate()
            .find(|(_, i)| i.opcode() == Opcode::Brn)
            .unwrap();
        match instr {
            Instruction::Brn { offset, .. } => {
                let target = pc as i64 + 1 + *offset as i64;
                assert_eq!(target, 13);
                assert_eq!(instrs[13], Instruction::mul(Reg::new(10), Reg::new(6), Reg::new(2)));
            }
            _ => unreachable!(),
        }
        assert_eq!(instrs.last(), Some(&Instruction::Ret));
    }

    #[test]
    fn test_literal_programs_decode() {
        assert!(decode_all(&MATMUL_4X4_LITERAL).is_ok());
        assert!(decode_all(&MATMUL_3X3_LITERAL).is_ok());
        assert_eq!(
            decode_all(&MATMUL_4X4_LITERAL).unwrap()[24],
            Instruction::Brn { cond: 0b10, offset: 12 }
        );
    }

    #[test]
    fn test_references() {
        assert_eq!(matadd_reference(&[1, 2, 3], &[4, 5, 6]), vec![5, 7, 9]);

        // Identity
        let a = [1, 2, 3, 4, 5, 6, 7, 8, 9];
        let id = [1, 0, 0, 0, 1, 0, 0, 0, 1];
        assert_eq!(matmul_reference(&a, &id, 3, 3, 3), a.to_vec());

        // Non-square: (1x3) x (3x2)
        assert_eq!(matmul_reference(&[1, 2, 3], &[1, 2, 3, 4, 5, 6], 1, 2, 3), vec![22, 28]);
    }
}
