//! Configuration management for simt-emu.
//!
//! Configuration is loaded from multiple sources in priority order:
//! 1. Environment variables (`SIMT_ADDR_BITS`, `SIMT_DATA_BITS`,
//!    `SIMT_CHANNELS`, `SIMT_LATENCY`, `SIMT_MAX_CYCLES`)
//! 2. Project-local config file (`./simt-emu.toml`)
//! 3. User config file (`~/.config/simt-emu/config.toml`)
//! 4. Built-in defaults
//!
//! # Config File Format
//!
//! ```toml
//! # simt-emu.toml
//!
//! # Data memory: 2^addr_bits words of data_bits each
//! addr_bits = 8
//! data_bits = 8
//! channels = 4
//!
//! # Cycles from admission to completion, and requests in flight per channel
//! latency = 1
//! channel_depth = 1
//! mapping = "interleaved"
//!
//! # Launch defaults
//! block_dim = 4
//! max_cycles = 100000
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;

use crate::interpreter::timing::{ChannelMapping, ConfigError, MemoryConfig};

/// Global cached configuration.
static CONFIG: OnceLock<Config> = OnceLock::new();

const DEFAULT_BLOCK_DIM: u32 = 4;
const DEFAULT_MAX_CYCLES: u64 = 100_000;

/// simt-emu configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Address width of the data memory.
    pub addr_bits: Option<u8>,

    /// Word width of the data memory.
    pub data_bits: Option<u8>,

    /// Number of memory channels.
    pub channels: Option<usize>,

    /// Channel latency in cycles.
    pub latency: Option<u32>,

    /// Maximum requests in flight per channel.
    pub channel_depth: Option<usize>,

    /// Address-to-channel mapping.
    pub mapping: Option<ChannelMapping>,

    /// Threads per block when a launch only gives a thread count.
    pub block_dim: Option<u32>,

    /// Cycle bound for a run.
    pub max_cycles: Option<u64>,
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables
    /// 2. Project-local `simt-emu.toml`
    /// 3. User config `~/.config/simt-emu/config.toml`
    /// 4. Defaults
    pub fn load() -> Self {
        let mut config = Self::default();

        if let Some(user_config) = Self::load_user_config() {
            config.merge(user_config);
        }

        if let Some(local_config) = Self::load_local_config() {
            config.merge(local_config);
        }

        config.apply_env_overrides();

        config
    }

    /// Get the cached global configuration.
    ///
    /// Loads configuration on first call and caches it.
    pub fn get() -> &'static Config {
        CONFIG.get_or_init(|| {
            let config = Self::load();
            log::debug!("Loaded configuration: {:?}", config);
            config
        })
    }

    /// Memory model parameters, with defaults for unset fields.
    pub fn memory_config(&self) -> Result<MemoryConfig, ConfigError> {
        let defaults = MemoryConfig::default();
        let config = MemoryConfig::new(
            self.addr_bits.unwrap_or(defaults.addr_bits),
            self.data_bits.unwrap_or(defaults.data_bits),
            self.channels.unwrap_or(defaults.channels),
        )
        .with_latency(self.latency.unwrap_or(defaults.latency))
        .with_depth(self.channel_depth.unwrap_or(defaults.channel_depth))
        .with_mapping(self.mapping.unwrap_or(defaults.mapping));
        config.validate()?;
        Ok(config)
    }

    /// Block dimension, defaulting to 4.
    pub fn block_dim(&self) -> u32 {
        self.block_dim.unwrap_or(DEFAULT_BLOCK_DIM)
    }

    /// Cycle bound, defaulting to 100 000.
    pub fn max_cycles(&self) -> u64 {
        self.max_cycles.unwrap_or(DEFAULT_MAX_CYCLES)
    }

    /// Load user configuration from ~/.config/simt-emu/config.toml
    fn load_user_config() -> Option<Self> {
        let config_path = Self::user_config_path()?;
        Self::load_from_file(&config_path)
    }

    /// Load project-local configuration from ./simt-emu.toml
    fn load_local_config() -> Option<Self> {
        let local_path = Path::new("simt-emu.toml");
        if let Some(config) = Self::load_from_file(local_path) {
            return Some(config);
        }

        if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
            let project_path = Path::new(&manifest_dir).join("simt-emu.toml");
            if let Some(config) = Self::load_from_file(&project_path) {
                return Some(config);
            }
        }

        None
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    log::debug!("Loaded config from {}", path.display());
                    Some(config)
                }
                Err(e) => {
                    log::warn!("Failed to parse {}: {}", path.display(), e);
                    None
                }
            },
            Err(e) => {
                log::warn!("Failed to read {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Merge another config into this one.
    /// Only overrides fields that are Some in the other config.
    fn merge(&mut self, other: Self) {
        if other.addr_bits.is_some() {
            self.addr_bits = other.addr_bits;
        }
        if other.data_bits.is_some() {
            self.data_bits = other.data_bits;
        }
        if other.channels.is_some() {
            self.channels = other.channels;
        }
        if other.latency.is_some() {
            self.latency = other.latency;
        }
        if other.channel_depth.is_some() {
            self.channel_depth = other.channel_depth;
        }
        if other.mapping.is_some() {
            self.mapping = other.mapping;
        }
        if other.block_dim.is_some() {
            self.block_dim = other.block_dim;
        }
        if other.max_cycles.is_some() {
            self.max_cycles = other.max_cycles;
        }
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        env_override("SIMT_ADDR_BITS", &mut self.addr_bits);
        env_override("SIMT_DATA_BITS", &mut self.data_bits);
        env_override("SIMT_CHANNELS", &mut self.channels);
        env_override("SIMT_LATENCY", &mut self.latency);
        env_override("SIMT_MAX_CYCLES", &mut self.max_cycles);
    }

    /// Get the path to the user config file (for display/creation).
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("simt-emu").join("config.toml"))
    }

    /// Generate a sample config file content.
    pub fn sample_config() -> String {
        r#"# simt-emu configuration
# Place this file at ~/.config/simt-emu/config.toml or ./simt-emu.toml

# Data memory: 2^addr_bits words of data_bits bits
addr_bits = 8
data_bits = 8

# Independent memory channels
channels = 4

# Cycles from admission to completion (at least 1)
latency = 1

# Requests in flight per channel (1 = one request at a time)
# channel_depth = 1

# "interleaved" (address % channels) or "partitioned" (contiguous ranges)
# mapping = "interleaved"

# Threads per block for launches given as a thread count
block_dim = 4

# Give up after this many cycles
# max_cycles = 100000
"#
        .to_string()
    }
}

fn env_override<T: FromStr>(name: &str, slot: &mut Option<T>) {
    if let Ok(raw) = std::env::var(name) {
        match raw.trim().parse() {
            Ok(value) => {
                log::debug!("Using {} from environment: {}", name, raw);
                *slot = Some(value);
            }
            Err(_) => log::warn!("Ignoring {}: cannot parse '{}'", name, raw),
        }
    }
}
