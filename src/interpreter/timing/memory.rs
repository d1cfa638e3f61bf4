//! Multi-channel memory model.
//!
//! The model owns a backing store of `2^addr_bits` words of `data_bits`
//! each, split across independent channels (see [`channel`] for the
//! mapping). Threads submit requests through [`MemoryPort`]; the model
//! arbitrates, applies latency and posts responses that the requesting
//! thread collects on a later cycle.
//!
//! # Cycle Protocol
//!
//! Each call to [`ChannelMemory::tick`] models one clock cycle `t`. For every
//! channel, in channel order:
//!
//! 1. The oldest in-flight request due at `t` completes: a write is applied
//!    (truncated to `data_bits`), a read samples the store. The response is
//!    posted for the requester.
//! 2. If the pipe has room, the arbiter admits one waiting request; it will
//!    complete at `t + latency`.
//!
//! Requests submitted during cycle `t` (before the tick) are eligible for
//! admission at `t`.
//!
//! # Harness Access
//!
//! [`ChannelMemory::load`], [`ChannelMemory::read`] and
//! [`ChannelMemory::words`] access the backing store directly, bypassing
//! channels. They exist to pre-load data before a run and check results
//! after it.
//!
//! [`channel`]: super::channel
//! [`MemoryPort`]: crate::interpreter::traits::MemoryPort

use std::collections::BTreeMap;

use crate::interpreter::fault::MemoryFault;
use crate::interpreter::state::ThreadId;
use crate::interpreter::traits::MemoryPort;

use super::channel::{Channel, ChannelStats, ConfigError, MemoryConfig};
use super::request::{MemoryRequest, MemoryResponse, RequestKind};

/// Aggregate counters over all channels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStats {
    /// Cycles simulated.
    pub cycles: u64,
    /// Requests admitted.
    pub admitted: u64,
    /// Requests completed.
    pub completed: u64,
    /// Reads completed.
    pub reads: u64,
    /// Writes completed.
    pub writes: u64,
    /// Grants made under contention.
    pub contention_count: u64,
    /// Request-cycles spent losing arbitration.
    pub contention_cycles: u64,
}

/// Cycle-level model of an external multi-channel memory.
#[derive(Debug)]
pub struct ChannelMemory {
    config: MemoryConfig,
    words: Vec<u32>,
    channels: Vec<Channel>,
    /// Completed requests awaiting pickup, keyed by requester.
    responses: BTreeMap<ThreadId, MemoryResponse>,
    cycle: u64,
}

impl ChannelMemory {
    /// Create a zero-filled memory.
    pub fn new(config: MemoryConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            words: vec![0; config.size()],
            channels: (0..config.channels).map(Channel::new).collect(),
            responses: BTreeMap::new(),
            cycle: 0,
            config,
        })
    }

    /// Model configuration.
    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Number of addressable words.
    pub fn size(&self) -> usize {
        self.words.len()
    }

    /// Current cycle (number of ticks so far).
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// The channels, in index order.
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    fn check(&self, address: u64) -> Result<usize, MemoryFault> {
        if address < self.words.len() as u64 {
            Ok(address as usize)
        } else {
            Err(MemoryFault::AddressOutOfRange {
                address: i64::try_from(address).unwrap_or(i64::MAX),
                size: self.words.len(),
            })
        }
    }

    /// Bounds of a non-empty region, checked against the store.
    fn check_range(&self, base: usize, len: usize) -> Result<std::ops::Range<usize>, MemoryFault> {
        let last = base.checked_add(len - 1).ok_or(MemoryFault::AddressOutOfRange {
            address: i64::MAX,
            size: self.words.len(),
        })?;
        self.check(last as u64)?;
        Ok(base..last + 1)
    }

    /// Pre-load a contiguous region starting at `base`. Values are truncated
    /// to the word width.
    pub fn load(&mut self, base: usize, data: &[u32]) -> Result<(), MemoryFault> {
        if data.is_empty() {
            return Ok(());
        }
        let range = self.check_range(base, data.len())?;
        let mask = self.config.word_mask();
        for (slot, &value) in self.words[range].iter_mut().zip(data) {
            *slot = value & mask;
        }
        Ok(())
    }

    /// Read one word directly from the backing store.
    pub fn read(&self, address: usize) -> Result<u32, MemoryFault> {
        let idx = self.check(address as u64)?;
        Ok(self.words[idx])
    }

    /// Write one word directly to the backing store (truncated).
    pub fn write(&mut self, address: usize, value: u32) -> Result<(), MemoryFault> {
        let idx = self.check(address as u64)?;
        self.words[idx] = value & self.config.word_mask();
        Ok(())
    }

    /// Read a contiguous region directly from the backing store.
    pub fn read_range(&self, base: usize, len: usize) -> Result<&[u32], MemoryFault> {
        if len == 0 {
            return Ok(&[]);
        }
        let range = self.check_range(base, len)?;
        Ok(&self.words[range])
    }

    /// The whole backing store.
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// True when no request is waiting, in flight, or awaiting pickup.
    pub fn is_idle(&self) -> bool {
        self.responses.is_empty() && self.channels.iter().all(Channel::is_idle)
    }

    /// Advance the model by one cycle.
    pub fn tick(&mut self) {
        let cycle = self.cycle;
        let mask = self.config.word_mask();

        for channel in &mut self.channels {
            if let Some(done) = channel.retire_due(cycle) {
                let idx = done.address as usize;
                let response = match done.kind {
                    RequestKind::Read => MemoryResponse::Data(self.words[idx]),
                    RequestKind::Write { value } => {
                        self.words[idx] = value & mask;
                        MemoryResponse::WriteAck
                    }
                };
                log::trace!(
                    "cycle {}: channel {} completed {:?} @{} for {}",
                    cycle,
                    channel.id(),
                    response,
                    done.address,
                    done.requester
                );
                self.responses.insert(done.requester, response);
            }

            if let Some(admitted) =
                channel.admit(cycle, self.config.latency, self.config.channel_depth)
            {
                log::trace!(
                    "cycle {}: channel {} admitted {:?} @{} from {}",
                    cycle,
                    channel.id(),
                    admitted.kind,
                    admitted.address,
                    admitted.requester
                );
            }

            channel.account_cycle();
        }

        self.cycle += 1;
    }

    /// Per-channel counters.
    pub fn channel_stats(&self) -> Vec<ChannelStats> {
        self.channels.iter().map(Channel::stats).collect()
    }

    /// Counters summed over all channels.
    pub fn stats(&self) -> MemoryStats {
        self.channels.iter().map(Channel::stats).fold(
            MemoryStats {
                cycles: self.cycle,
                ..MemoryStats::default()
            },
            |mut acc, s| {
                acc.admitted += s.admitted;
                acc.completed += s.completed;
                acc.reads += s.reads;
                acc.writes += s.writes;
                acc.contention_count += s.contention_count;
                acc.contention_cycles += s.contention_cycles;
                acc
            },
        )
    }
}

impl MemoryPort for ChannelMemory {
    fn submit(&mut self, request: MemoryRequest) -> Result<(), MemoryFault> {
        self.check(request.address as u64)?;
        let channel = self.config.channel_of(request.address);
        log::trace!(
            "cycle {}: {} queued {:?} @{} on channel {}",
            self.cycle,
            request.requester,
            request.kind,
            request.address,
            channel
        );
        self.channels[channel].arbiter.push(request, self.cycle);
        Ok(())
    }

    fn take_response(&mut self, requester: ThreadId) -> Option<MemoryResponse> {
        self.responses.remove(&requester)
    }

    fn size(&self) -> usize {
        self.words.len()
    }
}
