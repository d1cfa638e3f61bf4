//! Instruction decoder for the SIMT core.
//!
//! Decoding is a pure function from a 16-bit word to an [`Instruction`]. The
//! top nibble selects the opcode; undefined opcodes (`1010`-`1110`) are
//! rejected with [`DecodeError::UnknownOpcode`]. Register fields are always
//! four bits wide, so every register index 0-15 decodes; whether a register
//! may be written is decided at execute time.
//!
//! # Example
//!
//! ```
//! use simt_emu::interpreter::decode::decode;
//! use simt_emu::interpreter::instruction::{Instruction, Reg};
//!
//! // ADD R0, R0, %threadIdx
//! let instr = decode(0b0011_0000_0000_1111).unwrap();
//! assert_eq!(instr, Instruction::add(Reg::new(0), Reg::new(0), Reg::THREAD_IDX));
//! ```
//!
//! [`Instruction`]: crate::interpreter::instruction::Instruction
//! [`DecodeError::UnknownOpcode`]: crate::interpreter::fault::DecodeError::UnknownOpcode

mod decoder;

pub use decoder::decode;

/// Decode a whole program, stopping at the first undefined word.
///
/// Returns the index of the failing word alongside the error.
pub fn decode_all(
    words: &[u16],
) -> Result<Vec<crate::interpreter::instruction::Instruction>, (usize, crate::interpreter::fault::DecodeError)> {
    words
        .iter()
        .enumerate()
        .map(|(i, &w)| decode(w).map_err(|e| (i, e)))
        .collect()
}
