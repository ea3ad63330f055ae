//! Client error types.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The transport could not be established.
    #[error("failed to connect to {0}: {1}")]
    Connect(String, #[source] tonic::transport::Error),

    /// The server rejected or failed an RPC; the status carries the gRPC
    /// code and any attached error details.
    #[error("rpc failed: {0}")]
    Rpc(#[from] tonic::Status),

    /// A response that should carry a record did not.
    #[error("server response is missing a record")]
    MissingRecord,
}
