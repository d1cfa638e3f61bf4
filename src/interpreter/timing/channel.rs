//! Memory channel configuration and the per-channel pipe.
//!
//! # Address Mapping
//!
//! The address space is split across `channels` independent pipes. Two
//! mappings are supported and fixed for the lifetime of a model:
//!
//! - **Interleaved** (default): `channel = address % channels`. Consecutive
//!   words land on consecutive channels, so threads reading neighbouring
//!   elements spread across all channels.
//! - **Partitioned**: the space is cut into `channels` contiguous ranges of
//!   `ceil(size / channels)` words.
//!
//! # Timing
//!
//! A channel admits at most one request per cycle and holds at most
//! `channel_depth` requests in flight (1 by default). A request admitted at
//! cycle `t` completes at cycle `t + latency`.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::arbitration::ChannelArbiter;
use super::request::MemoryRequest;

/// Largest supported address width. 2^24 words keeps the backing store
/// allocation reasonable.
pub const MAX_ADDR_BITS: u8 = 24;

/// Largest supported word width.
pub const MAX_DATA_BITS: u8 = 32;

/// How addresses are assigned to channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelMapping {
    /// `address % channels`
    #[default]
    Interleaved,
    /// Contiguous equal ranges.
    Partitioned,
}

/// Invalid memory model parameters.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("addr_bits must be 1..={max}, got {0}", max = MAX_ADDR_BITS)]
    AddrBits(u8),

    #[error("data_bits must be 1..={max}, got {0}", max = MAX_DATA_BITS)]
    DataBits(u8),

    #[error("at least one channel is required")]
    NoChannels,

    #[error("{channels} channels exceed the {size}-word address space")]
    TooManyChannels { channels: usize, size: usize },

    #[error("channel latency must be at least one cycle")]
    ZeroLatency,

    #[error("channel depth must be at least one request")]
    ZeroDepth,
}

/// Construction parameters of the multi-channel memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryConfig {
    /// Address width; the model holds `2^addr_bits` words.
    pub addr_bits: u8,
    /// Word width in bits.
    pub data_bits: u8,
    /// Number of independent channels.
    pub channels: usize,
    /// Cycles from admission to completion.
    pub latency: u32,
    /// Maximum requests in flight per channel.
    pub channel_depth: usize,
    /// Address-to-channel mapping.
    pub mapping: ChannelMapping,
}

impl MemoryConfig {
    /// Configuration with single-cycle latency, depth one and interleaved
    /// mapping.
    pub fn new(addr_bits: u8, data_bits: u8, channels: usize) -> Self {
        Self {
            addr_bits,
            data_bits,
            channels,
            latency: 1,
            channel_depth: 1,
            mapping: ChannelMapping::Interleaved,
        }
    }

    /// The data memory used by the matrix programs: 256 × 8-bit words over
    /// four channels.
    pub fn data_memory() -> Self {
        Self::new(8, 8, 4)
    }

    pub fn with_latency(mut self, latency: u32) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_depth(mut self, channel_depth: usize) -> Self {
        self.channel_depth = channel_depth;
        self
    }

    pub fn with_mapping(mut self, mapping: ChannelMapping) -> Self {
        self.mapping = mapping;
        self
    }

    /// Check every parameter.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.addr_bits == 0 || self.addr_bits > MAX_ADDR_BITS {
            return Err(ConfigError::AddrBits(self.addr_bits));
        }
        if self.data_bits == 0 || self.data_bits > MAX_DATA_BITS {
            return Err(ConfigError::DataBits(self.data_bits));
        }
        if self.channels == 0 {
            return Err(ConfigError::NoChannels);
        }
        if self.channels > self.size() {
            return Err(ConfigError::TooManyChannels {
                channels: self.channels,
                size: self.size(),
            });
        }
        if self.latency == 0 {
            return Err(ConfigError::ZeroLatency);
        }
        if self.channel_depth == 0 {
            return Err(ConfigError::ZeroDepth);
        }
        Ok(())
    }

    /// Number of addressable words.
    #[inline]
    pub fn size(&self) -> usize {
        1usize << self.addr_bits
    }

    /// Mask applied to every stored word.
    #[inline]
    pub fn word_mask(&self) -> u32 {
        if self.data_bits >= 32 {
            u32::MAX
        } else {
            (1u32 << self.data_bits) - 1
        }
    }

    /// Channel serving an in-range address.
    #[inline]
    pub fn channel_of(&self, address: u32) -> usize {
        let address = address as usize;
        match self.mapping {
            ChannelMapping::Interleaved => address % self.channels,
            ChannelMapping::Partitioned => {
                let span = self.size().div_ceil(self.channels);
                (address / span).min(self.channels - 1)
            }
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self::data_memory()
    }
}

/// Request occupying a channel.
#[derive(Debug, Clone, Copy)]
pub(crate) struct InFlight {
    pub(crate) request: MemoryRequest,
    pub(crate) complete_at: u64,
}

/// Counters for one channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelStats {
    /// Requests admitted.
    pub admitted: u64,
    /// Requests completed.
    pub completed: u64,
    /// Reads completed.
    pub reads: u64,
    /// Writes completed.
    pub writes: u64,
    /// Grants made while other requests were waiting.
    pub contention_count: u64,
    /// Request-cycles spent losing arbitration.
    pub contention_cycles: u64,
    /// Cycles at least one request was in flight.
    pub busy_cycles: u64,
}

/// One memory channel: an arbiter in front of a fixed-latency pipe.
#[derive(Debug)]
pub struct Channel {
    pub(crate) arbiter: ChannelArbiter,
    pub(crate) in_flight: VecDeque<InFlight>,
    admitted: u64,
    completed: u64,
    reads: u64,
    writes: u64,
    busy_cycles: u64,
}

impl Channel {
    pub fn new(id: usize) -> Self {
        Self {
            arbiter: ChannelArbiter::new(id),
            in_flight: VecDeque::new(),
            admitted: 0,
            completed: 0,
            reads: 0,
            writes: 0,
            busy_cycles: 0,
        }
    }

    /// Channel index.
    pub fn id(&self) -> usize {
        self.arbiter.channel()
    }

    /// Requests currently in the pipe.
    pub fn occupancy(&self) -> usize {
        self.in_flight.len()
    }

    /// Requests waiting for admission.
    pub fn waiting(&self) -> usize {
        self.arbiter.pending()
    }

    /// True when nothing is waiting or in flight.
    pub fn is_idle(&self) -> bool {
        self.in_flight.is_empty() && self.arbiter.is_empty()
    }

    /// Pop the oldest in-flight request if it is due at `cycle`.
    pub(crate) fn retire_due(&mut self, cycle: u64) -> Option<MemoryRequest> {
        if self.in_flight.front()?.complete_at > cycle {
            return None;
        }
        let done = self.in_flight.pop_front()?;
        self.completed += 1;
        if done.request.is_write() {
            self.writes += 1;
        } else {
            self.reads += 1;
        }
        Some(done.request)
    }

    /// Admit one waiting request if the pipe has room.
    pub(crate) fn admit(&mut self, cycle: u64, latency: u32, depth: usize) -> Option<MemoryRequest> {
        if self.in_flight.len() >= depth {
            return None;
        }
        let request = self.arbiter.grant()?;
        self.in_flight.push_back(InFlight {
            request,
            complete_at: cycle + latency as u64,
        });
        self.admitted += 1;
        Some(request)
    }

    /// Account one cycle of occupancy.
    pub(crate) fn account_cycle(&mut self) {
        if !self.in_flight.is_empty() {
            self.busy_cycles += 1;
        }
    }

    /// Snapshot of this channel's counters.
    pub fn stats(&self) -> ChannelStats {
        ChannelStats {
            admitted: self.admitted,
            completed: self.completed,
            reads: self.reads,
            writes: self.writes,
            contention_count: self.arbiter.contention_count(),
            contention_cycles: self.arbiter.contention_cycles(),
            busy_cycles: self.busy_cycles,
        }
    }
}
