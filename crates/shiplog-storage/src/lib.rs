//! shiplog storage engine.
//!
//! A durable, ordered sequence of opaque byte records addressed by
//! monotonically increasing 64-bit offsets, stored as a directory of
//! fixed-base segments.
//!
//! ## Layers
//!
//! - [`Store`]: append-only framed byte file (length-prefixed payloads)
//! - [`Index`]: memory-mapped table of relative-offset → store-position
//!   entries
//! - [`Segment`]: one store plus one index under a shared base offset
//! - [`Log`]: the ordered segment collection; routes appends to the active
//!   segment, rolls over on fill, recovers from the directory on open
//!
//! ## Example
//!
//! ```ignore
//! use shiplog_proto::v1::Record;
//! use shiplog_storage::{Log, LogConfig};
//!
//! let log = Log::open("./data/log", LogConfig::default())?;
//! let offset = log.append(Record { value: b"hello".to_vec(), offset: 0 })?;
//! let record = log.read(offset)?;
//! assert_eq!(record.value, b"hello");
//! ```

mod config;
mod error;
mod index;
mod log;
mod segment;
mod store;

pub use config::LogConfig;
pub use error::{Error, Result};
pub use index::Index;
pub use log::Log;
pub use segment::Segment;
pub use store::Store;
