//! Test harness for running SIMT kernels.
//!
//! This module provides utilities for loading program images, setting up
//! data memory, launching a grid and checking outputs.
//!
//! # Example
//!
//! ```
//! use simt_emu::interpreter::engine::LaunchConfig;
//! use simt_emu::interpreter::program::ProgramStore;
//! use simt_emu::interpreter::test_runner::TestRunner;
//! use simt_emu::interpreter::timing::MemoryConfig;
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut runner = TestRunner::new(MemoryConfig::data_memory())?;
//!
//! // Each thread stores its %threadIdx at its own address
//! runner.load_program(ProgramStore::parse_text("1000000011111111\n1111000000000000")?);
//! let result = runner.run(LaunchConfig::grid(1, 4))?;
//!
//! assert!(result.success());
//! assert_eq!(runner.read_memory(0, 4)?, vec![0, 1, 2, 3]);
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};

use crate::interpreter::engine::{EngineError, GridEngine, LaunchConfig, RunReport};
use crate::interpreter::fault::ThreadFault;
use crate::interpreter::program::ProgramStore;
use crate::interpreter::state::{ThreadId, ThreadStats};
use crate::interpreter::timing::{ChannelMemory, MemoryConfig};

const DEFAULT_MAX_CYCLES: u64 = 100_000;

/// Result of a test run.
#[derive(Debug, Clone)]
pub struct TestResult {
    /// Total cycles executed.
    pub cycles: u64,
    /// Threads launched.
    pub threads: usize,
    /// Thread faults, ordered by thread.
    pub faults: Vec<ThreadFault>,
    /// Per-thread counters.
    pub thread_stats: Vec<(ThreadId, ThreadStats)>,
    /// Full engine report.
    pub report: RunReport,
}

impl TestResult {
    /// Check if every thread retired without faulting.
    pub fn success(&self) -> bool {
        self.faults.is_empty()
    }

    /// Fault of the lowest faulting thread.
    pub fn first_fault(&self) -> Option<&ThreadFault> {
        self.faults.first()
    }
}

/// Test runner for SIMT kernels.
///
/// Holds the data memory between runs so inputs can be staged before a
/// launch and outputs inspected after it.
pub struct TestRunner {
    memory: ChannelMemory,
    program: ProgramStore,
    max_cycles: u64,
}

impl TestRunner {
    /// Create a runner with a fresh, zeroed data memory.
    pub fn new(config: MemoryConfig) -> Result<Self> {
        let memory = ChannelMemory::new(config).context("Invalid memory configuration")?;
        Ok(Self {
            memory,
            program: ProgramStore::default(),
            max_cycles: DEFAULT_MAX_CYCLES,
        })
    }

    /// Set the cycle bound used by `run`.
    pub fn with_max_cycles(mut self, max_cycles: u64) -> Self {
        self.max_cycles = max_cycles;
        self
    }

    /// Data memory.
    pub fn memory(&self) -> &ChannelMemory {
        &self.memory
    }

    /// Loaded program.
    pub fn program(&self) -> &ProgramStore {
        &self.program
    }

    /// Load a program image.
    pub fn load_program(&mut self, program: ProgramStore) {
        log::debug!("Loaded program: {} instructions", program.len());
        self.program = program;
    }

    /// Load a program from a file.
    ///
    /// `.bin` files hold little-endian 16-bit words; anything else is parsed
    /// as one binary or hex word per line.
    pub fn load_program_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let program = if path.extension().is_some_and(|e| e == "bin") {
            let bytes = std::fs::read(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            ProgramStore::from_le_bytes(&bytes)
                .with_context(|| format!("Failed to load {}", path.display()))?
        } else {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            ProgramStore::parse_text(&text)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        };
        self.load_program(program);
        Ok(())
    }

    /// Write words into data memory starting at `base`.
    pub fn write_memory(&mut self, base: usize, data: &[u32]) -> Result<()> {
        self.memory
            .load(base, data)
            .with_context(|| format!("Failed to write {} words at {}", data.len(), base))
    }

    /// Load a data file into memory starting at `base`.
    pub fn load_data_file(&mut self, base: usize, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let data = parse_data(&text).with_context(|| format!("Failed to parse {}", path.display()))?;
        self.write_memory(base, &data)
    }

    /// Read `len` words starting at `base`.
    pub fn read_memory(&self, base: usize, len: usize) -> Result<Vec<u32>> {
        let words = self
            .memory
            .read_range(base, len)
            .with_context(|| format!("Failed to read {} words at {}", len, base))?;
        Ok(words.to_vec())
    }

    /// Launch the loaded program and run it to global completion.
    ///
    /// Memory contents are kept after the run, including after an abort.
    pub fn run(&mut self, launch: LaunchConfig) -> Result<TestResult> {
        let config = *self.memory.config();
        let memory = std::mem::replace(&mut self.memory, ChannelMemory::new(config)?);
        let mut engine = GridEngine::new(self.program.clone(), memory, launch)?;

        let outcome = engine.run(self.max_cycles);
        let thread_stats = engine.thread_stats();
        self.memory = engine.into_memory();

        let report = match outcome {
            Ok(report) => report,
            Err(e @ EngineError::CycleLimit { .. }) => {
                return Err(anyhow!(e)).context(format!("Launch of {} threads did not complete", launch.threads));
            }
            Err(e) => bail!(e),
        };

        Ok(TestResult {
            cycles: report.cycles,
            threads: report.threads,
            faults: report.faults.clone(),
            thread_stats,
            report,
        })
    }

    /// Compare memory starting at `base` against expected values.
    pub fn verify_output(&self, base: usize, expected: &[u32]) -> Result<()> {
        let actual = self.read_memory(base, expected.len())?;

        for (i, (exp, act)) in expected.iter().zip(actual.iter()).enumerate() {
            if exp != act {
                return Err(anyhow!(
                    "Mismatch at address {}: expected {}, got {}",
                    base.saturating_add(i), exp, act
                ));
            }
        }

        Ok(())
    }
}

/// Parse a data file: decimal or `0x` hex values separated by whitespace or
/// commas, with `#` comments.
pub fn parse_data(text: &str) -> Result<Vec<u32>> {
    let mut values = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        let line = line.split('#').next().unwrap_or_default();
        for token in line.split(|c: char| c == ',' || c.is_whitespace()).filter(|t| !t.is_empty()) {
            let value = match token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
                Some(hex) => u32::from_str_radix(hex, 16),
                None => token.parse(),
            }
            .with_context(|| format!("line {}: bad value '{}'", line_no + 1, token))?;
            values.push(value);
        }
    }
    Ok(values)
}
