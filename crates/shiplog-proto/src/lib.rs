//! Protocol Buffer Definitions for shiplog
//!
//! This crate contains the gRPC service definition and message types shared
//! by the shiplog server and client.
//!
//! ## Services
//!
//! - **Log**: the commit log API
//!   - Unary: Produce, Consume
//!   - Streaming: ProduceStream (bidirectional), ConsumeStream (server push)
//!
//! ## Usage
//!
//! ```ignore
//! use shiplog_proto::v1::{log_client::LogClient, ProduceRequest, Record};
//!
//! let mut client = LogClient::connect("http://localhost:8400").await?;
//! let response = client
//!     .produce(ProduceRequest {
//!         record: Some(Record { value: b"hello".to_vec(), offset: 0 }),
//!     })
//!     .await?;
//! println!("offset: {}", response.into_inner().offset);
//! ```

/// shiplog v1 gRPC API.
pub mod v1 {
    tonic::include_proto!("shiplog.v1");
}
