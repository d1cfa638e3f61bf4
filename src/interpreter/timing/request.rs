//! Memory requests and responses exchanged between threads and the model.

use crate::interpreter::state::ThreadId;

/// Kind of memory access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// Read one word.
    Read,
    /// Write one word. The value is truncated to the word width on apply.
    Write {
        /// Raw register bits.
        value: u32,
    },
}

/// A single-word memory request issued by a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRequest {
    /// Issuing thread; responses are routed back by this key.
    pub requester: ThreadId,
    /// Word address.
    pub address: u32,
    /// Read or write.
    pub kind: RequestKind,
}

impl MemoryRequest {
    /// Create a read request.
    pub fn read(requester: ThreadId, address: u32) -> Self {
        Self { requester, address, kind: RequestKind::Read }
    }

    /// Create a write request.
    pub fn write(requester: ThreadId, address: u32, value: u32) -> Self {
        Self {
            requester,
            address,
            kind: RequestKind::Write { value },
        }
    }

    /// True for writes.
    #[inline]
    pub fn is_write(&self) -> bool {
        matches!(self.kind, RequestKind::Write { .. })
    }
}

/// Completion of a request, delivered to the requester.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryResponse {
    /// Read data, zero-extended from the word width.
    Data(u32),
    /// Write applied.
    WriteAck,
}
