//! Async client for the shiplog commit log service.
//!
//! Wraps the generated tonic client with a small typed API over the four
//! RPCs: unary produce/consume plus both streaming forms.
//!
//! ## Example
//!
//! ```ignore
//! use shiplog_client::LogClient;
//!
//! let mut client = LogClient::connect("http://localhost:8400").await?;
//! let offset = client.produce(b"hello".to_vec()).await?;
//! let record = client.consume(offset).await?;
//! assert_eq!(record.value, b"hello");
//! ```

mod error;

pub use error::{ClientError, Result};

use tonic::transport::Channel;
use tonic::Streaming;
use tracing::debug;

use shiplog_proto::v1::log_client::LogClient as GrpcLogClient;
use shiplog_proto::v1::{ConsumeRequest, ConsumeResponse, ProduceRequest, Record};

/// Client for one shiplog server.
#[derive(Debug, Clone)]
pub struct LogClient {
    inner: GrpcLogClient<Channel>,
}

impl LogClient {
    /// Connects to a server at `addr` (e.g. `http://localhost:8400`).
    pub async fn connect(addr: impl Into<String>) -> Result<Self> {
        let addr = addr.into();
        let inner = GrpcLogClient::connect(addr.clone())
            .await
            .map_err(|err| ClientError::Connect(addr, err))?;
        Ok(Self { inner })
    }

    /// Appends one record and returns the offset it was assigned.
    pub async fn produce(&mut self, value: impl Into<Vec<u8>>) -> Result<u64> {
        let request = ProduceRequest {
            record: Some(Record {
                value: value.into(),
                offset: 0,
            }),
        };
        let response = self.inner.produce(request).await?;
        let offset = response.into_inner().offset;
        debug!(offset, "produced record");
        Ok(offset)
    }

    /// Reads the record stored at `offset`.
    pub async fn consume(&mut self, offset: u64) -> Result<Record> {
        let response = self.inner.consume(ConsumeRequest { offset }).await?;
        response
            .into_inner()
            .record
            .ok_or(ClientError::MissingRecord)
    }

    /// Streams `values` to the server and returns the offsets assigned, in
    /// order.
    pub async fn produce_stream(&mut self, values: Vec<Vec<u8>>) -> Result<Vec<u64>> {
        let requests = tokio_stream::iter(values.into_iter().map(|value| ProduceRequest {
            record: Some(Record { value, offset: 0 }),
        }));

        let mut responses = self.inner.produce_stream(requests).await?.into_inner();
        let mut offsets = Vec::new();
        while let Some(response) = responses.message().await? {
            offsets.push(response.offset);
        }
        Ok(offsets)
    }

    /// Opens a tail-following stream of records starting at `offset`.
    ///
    /// The stream replays stored records and then stays open, delivering
    /// future appends as they happen, until it is dropped.
    pub async fn consume_stream(&mut self, offset: u64) -> Result<Streaming<ConsumeResponse>> {
        let response = self.inner.consume_stream(ConsumeRequest { offset }).await?;
        Ok(response.into_inner())
    }
}
