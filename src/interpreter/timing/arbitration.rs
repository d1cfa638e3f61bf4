//! Per-channel request arbitration.
//!
//! Every channel admits at most one request per cycle. When several threads
//! wait on the same channel, the arbiter grants the oldest request first and
//! breaks ties by lowest thread identity (block-major). Because age only
//! grows while a request waits, every pending request is eventually granted:
//! a request submitted at cycle `t` can only be overtaken by requests that
//! were already waiting at `t`.
//!
//! # Usage
//!
//! ```
//! use simt_emu::interpreter::state::ThreadId;
//! use simt_emu::interpreter::timing::arbitration::ChannelArbiter;
//! use simt_emu::interpreter::timing::MemoryRequest;
//!
//! let mut arbiter = ChannelArbiter::new(0);
//!
//! // Two threads request the channel in the same cycle
//! arbiter.push(MemoryRequest::read(ThreadId::new(0, 3), 8), 100);
//! arbiter.push(MemoryRequest::read(ThreadId::new(0, 1), 4), 100);
//!
//! // Lowest thread wins this cycle, the other waits
//! assert_eq!(arbiter.grant().unwrap().requester, ThreadId::new(0, 1));
//! assert_eq!(arbiter.pending(), 1);
//! ```

use smallvec::SmallVec;

use super::request::MemoryRequest;

/// Request waiting for admission.
#[derive(Debug, Clone, Copy)]
struct PendingRequest {
    request: MemoryRequest,
    /// Cycle the request was submitted.
    submitted: u64,
}

impl PendingRequest {
    #[inline]
    fn priority_key(&self) -> (u64, crate::interpreter::state::ThreadId) {
        (self.submitted, self.request.requester)
    }
}

/// Arbiter for a single memory channel.
#[derive(Debug)]
pub struct ChannelArbiter {
    /// Channel this arbiter feeds.
    channel: usize,
    /// Requests waiting for admission.
    pending: SmallVec<[PendingRequest; 4]>,
    /// Grants made while other requests were also waiting.
    contention_count: u64,
    /// Sum over grants of requests left waiting.
    contention_cycles: u64,
}

impl ChannelArbiter {
    /// Create an arbiter for the given channel.
    pub fn new(channel: usize) -> Self {
        Self {
            channel,
            pending: SmallVec::new(),
            contention_count: 0,
            contention_cycles: 0,
        }
    }

    /// Channel this arbiter manages.
    pub fn channel(&self) -> usize {
        self.channel
    }

    /// Queue a request submitted at `cycle`.
    pub fn push(&mut self, request: MemoryRequest, cycle: u64) {
        self.pending.push(PendingRequest { request, submitted: cycle });
    }

    /// Remove and return the request to admit this cycle.
    pub fn grant(&mut self) -> Option<MemoryRequest> {
        let (idx, _) = self
            .pending
            .iter()
            .enumerate()
            .min_by_key(|(_, p)| p.priority_key())?;

        let granted = self.pending.remove(idx);

        if !self.pending.is_empty() {
            self.contention_count += 1;
            self.contention_cycles += self.pending.len() as u64;
            log::trace!(
                "channel {}: granted {} over {} waiting",
                self.channel,
                granted.request.requester,
                self.pending.len()
            );
        }

        Some(granted.request)
    }

    /// Number of requests waiting.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// True when nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Number of grants made under contention.
    pub fn contention_count(&self) -> u64 {
        self.contention_count
    }

    /// Total request-cycles spent losing arbitration.
    pub fn contention_cycles(&self) -> u64 {
        self.contention_cycles
    }

    /// Reset statistics.
    pub fn reset_stats(&mut self) {
        self.contention_count = 0;
        self.contention_cycles = 0;
    }
}
