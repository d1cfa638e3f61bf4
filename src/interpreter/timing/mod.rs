//! Cycle-level model of the external multi-channel memory.
//!
//! - **Requests**: single-word reads and writes tagged with the issuing thread
//! - **Arbitration**: oldest-first, lowest thread on ties, one grant per
//!   channel per cycle
//! - **Channels**: fixed-latency pipes with bounded depth
//! - **Memory**: backing store, address mapping, fault checks, statistics
//!
//! # Usage
//!
//! ```
//! use simt_emu::interpreter::state::ThreadId;
//! use simt_emu::interpreter::timing::{ChannelMemory, MemoryConfig, MemoryRequest, MemoryResponse};
//! use simt_emu::interpreter::traits::MemoryPort;
//!
//! let mut mem = ChannelMemory::new(MemoryConfig::data_memory()).unwrap();
//! mem.load(0, &[7]).unwrap();
//!
//! let thread = ThreadId::new(0, 0);
//! mem.submit(MemoryRequest::read(thread, 0)).unwrap();
//! mem.tick(); // admitted
//! mem.tick(); // completed
//! assert_eq!(mem.take_response(thread), Some(MemoryResponse::Data(7)));
//! ```

pub mod arbitration;
pub mod channel;
pub mod memory;
pub mod request;

pub use arbitration::ChannelArbiter;
pub use channel::{Channel, ChannelMapping, ChannelStats, ConfigError, MemoryConfig};
pub use memory::{ChannelMemory, MemoryStats};
pub use request::{MemoryRequest, MemoryResponse, RequestKind};
