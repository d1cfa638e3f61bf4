//! simt-emu library
//!
//! Cycle-accurate emulation of a 16-bit SIMT core and its multi-channel
//! data memory, plus matrix kernels for exercising it.

pub mod config;
pub mod interpreter;
pub mod kernels;
