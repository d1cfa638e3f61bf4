//! Program store.
//!
//! An immutable sequence of 16-bit instruction words addressed by program
//! counter (instruction index). All threads of a launch share one store.
//!
//! # Formats
//!
//! - **Words**: a slice of `u16`
//! - **Binary image**: little-endian, two bytes per word
//! - **Text**: one word per line as `0b0011...`, `0x3F00` or 16 bare binary
//!   digits; `#` and `;` start comments, `_` separators are allowed

use std::fmt;

use byteorder::{ByteOrder, LittleEndian};
use thiserror::Error;

use super::decode::decode;
use super::fault::ExecutionFault;
use super::instruction::Instruction;

/// Errors when loading a program.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProgramError {
    #[error("binary program has odd length {0}")]
    OddLength(usize),

    #[error("line {line}: cannot parse instruction word '{text}'")]
    BadWord { line: usize, text: String },
}

/// Read-only instruction memory.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ProgramStore {
    words: Vec<u16>,
}

impl ProgramStore {
    /// Create a store from raw instruction words.
    pub fn from_words(words: impl Into<Vec<u16>>) -> Self {
        Self { words: words.into() }
    }

    /// Create a store by encoding instructions.
    pub fn from_instructions(instructions: &[Instruction]) -> Self {
        Self {
            words: instructions.iter().map(Instruction::encode).collect(),
        }
    }

    /// Load a little-endian binary image.
    pub fn from_le_bytes(bytes: &[u8]) -> Result<Self, ProgramError> {
        if bytes.len() % 2 != 0 {
            return Err(ProgramError::OddLength(bytes.len()));
        }
        let mut words = vec![0u16; bytes.len() / 2];
        LittleEndian::read_u16_into(bytes, &mut words);
        Ok(Self { words })
    }

    /// Parse the text format.
    pub fn parse_text(text: &str) -> Result<Self, ProgramError> {
        let mut words = Vec::new();
        for (i, raw) in text.lines().enumerate() {
            let line = raw.split(['#', ';']).next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let word = parse_word(line).ok_or_else(|| ProgramError::BadWord {
                line: i + 1,
                text: line.to_string(),
            })?;
            words.push(word);
        }
        Ok(Self { words })
    }

    /// Serialize to a little-endian binary image.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; self.words.len() * 2];
        LittleEndian::write_u16_into(&self.words, &mut bytes);
        bytes
    }

    /// Fetch the word at `pc`.
    #[inline]
    pub fn fetch(&self, pc: u32) -> Result<u16, ExecutionFault> {
        self.words
            .get(pc as usize)
            .copied()
            .ok_or(ExecutionFault::ProgramCounterOutOfRange {
                pc: pc as i64,
                len: self.words.len(),
            })
    }

    /// Number of instructions.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Raw words.
    pub fn words(&self) -> &[u16] {
        &self.words
    }

    /// Listing with one line per word: index, raw bits and disassembly.
    pub fn disassemble(&self) -> String {
        self.to_string()
    }
}

fn parse_word(text: &str) -> Option<u16> {
    let digits: String = text.chars().filter(|c| *c != '_').collect();
    if let Some(bin) = digits.strip_prefix("0b").or_else(|| digits.strip_prefix("0B")) {
        u16::from_str_radix(bin, 2).ok()
    } else if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        u16::from_str_radix(hex, 16).ok()
    } else if digits.len() == 16 {
        u16::from_str_radix(&digits, 2).ok()
    } else {
        None
    }
}

impl fmt::Debug for ProgramStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProgramStore({} words)", self.words.len())
    }
}

impl fmt::Display for ProgramStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (pc, &word) in self.words.iter().enumerate() {
            match decode(word) {
                Ok(instr) => writeln!(f, "{:4}: {:016b}  {}", pc, word, instr)?,
                Err(e) => writeln!(f, "{:4}: {:016b}  <{}>", pc, word, e)?,
            }
        }
        Ok(())
    }
}
