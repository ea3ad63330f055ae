//! shiplog gRPC server library.
//!
//! Exposes [`LogService`], the tonic implementation of the `shiplog.v1.Log`
//! service, and [`CommitLog`], the seam it consumes the storage engine
//! through. The binary in `main.rs` wires a [`shiplog_storage::Log`] into
//! the service and serves it on one TCP listener.

pub mod services;

pub use services::{CommitLog, LogService};
