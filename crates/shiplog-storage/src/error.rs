//! Error types for the storage engine.
//!
//! All storage operations return `Result<T>` which is aliased to
//! `Result<T, Error>`, so errors propagate cleanly with `?`.
//!
//! ## Error Categories
//!
//! - `EndOfFile`: a read addressed a position or entry with no record behind
//!   it (past the end of a store file, or an unpopulated index entry)
//! - `FileFull`: a write would exceed the configured capacity of a store or
//!   index file; the owning segment marks itself full when it sees this
//! - `OffsetOutOfRange`: no segment in the log covers the requested offset
//! - `Closed`: the log was used after `close` released its segments
//! - `Io` / `Decode`: passthrough operating-system and record-codec failures

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Returned by store reads past the end of the file and by index reads
    /// addressing an entry that was never written.
    #[error("no record stored at this position")]
    EndOfFile,

    /// Returned by store and index writes once the configured maximum size
    /// would be exceeded.
    #[error("cannot process this write operation without exceeding maximum size")]
    FileFull,

    /// No segment covers the requested offset.
    #[error("offset is out of range: {offset}")]
    OffsetOutOfRange { offset: u64 },

    /// A store or index was opened with a zero maximum size.
    #[error("{0} max size should be a non-zero value")]
    ZeroCapacity(&'static str),

    /// The log's segments were already released by `close`.
    #[error("log is closed")]
    Closed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("record decode error: {0}")]
    Decode(#[from] prost::DecodeError),
}

impl Error {
    /// True when the error indicates a capacity limit rather than a failure.
    pub fn is_full(&self) -> bool {
        matches!(self, Error::FileFull)
    }
}
