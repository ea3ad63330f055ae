//! shiplog gRPC service implementation.
//!
//! Translates the four `shiplog.v1.Log` RPCs into commit-log operations:
//!
//! - **Produce / Consume**: unary append and read
//! - **ProduceStream**: bidirectional loop, one response per request
//! - **ConsumeStream**: server push starting at a requested offset; reads
//!   past the end of the log wait for future appends (tail-follow) instead
//!   of failing
//!
//! `OffsetOutOfRange` is reported as gRPC `OUT_OF_RANGE` with a
//! locale-tagged human message attached through the richer error model.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Code, Request, Response, Status, Streaming};
use tonic_types::{ErrorDetails, StatusExt};
use tracing::debug;

use shiplog_proto::v1::log_server::Log as LogRpc;
use shiplog_proto::v1::{
    ConsumeRequest, ConsumeResponse, ProduceRequest, ProduceResponse, Record,
};
use shiplog_storage::Error as StorageError;

/// How long ConsumeStream waits at the tail before probing for new records.
const TAIL_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Capacity of the per-stream response channels.
const STREAM_BUFFER: usize = 16;

/// The commit-log operations the service needs.
///
/// Implemented by [`shiplog_storage::Log`]; tests substitute their own log
/// behind this seam.
pub trait CommitLog: Send + Sync + 'static {
    fn append(&self, record: Record) -> shiplog_storage::Result<u64>;
    fn read(&self, offset: u64) -> shiplog_storage::Result<Record>;
}

impl CommitLog for shiplog_storage::Log {
    fn append(&self, record: Record) -> shiplog_storage::Result<u64> {
        shiplog_storage::Log::append(self, record)
    }

    fn read(&self, offset: u64) -> shiplog_storage::Result<Record> {
        shiplog_storage::Log::read(self, offset)
    }
}

/// shiplog gRPC service.
pub struct LogService {
    log: Arc<dyn CommitLog>,
}

impl LogService {
    pub fn new(log: Arc<dyn CommitLog>) -> Self {
        Self { log }
    }
}

/// Maps a storage error onto a gRPC status.
///
/// `OffsetOutOfRange` becomes `OUT_OF_RANGE` carrying a localized message
/// tagged `en-US`; everything else is reported as `INTERNAL`.
fn storage_status(err: StorageError) -> Status {
    match err {
        StorageError::OffsetOutOfRange { offset } => {
            let mut details = ErrorDetails::new();
            details.set_localized_message(
                "en-US",
                format!("The requested offset is outside the log's range: {offset}"),
            );
            Status::with_error_details(
                Code::OutOfRange,
                format!("offset is out of range: {offset}"),
                details,
            )
        }
        other => Status::internal(other.to_string()),
    }
}

#[tonic::async_trait]
impl LogRpc for LogService {
    #[tracing::instrument(
        skip(self, request),
        fields(value_len = request.get_ref().record.as_ref().map_or(0, |r| r.value.len()))
    )]
    async fn produce(
        &self,
        request: Request<ProduceRequest>,
    ) -> Result<Response<ProduceResponse>, Status> {
        let record = request
            .into_inner()
            .record
            .ok_or_else(|| Status::invalid_argument("produce request is missing a record"))?;

        // TODO: retry the append once after a FileFull rollover instead of
        // surfacing the error to the producer.
        let offset = self.log.append(record).map_err(storage_status)?;

        debug!(offset, "produced record");
        Ok(Response::new(ProduceResponse { offset }))
    }

    #[tracing::instrument(skip(self, request), fields(offset = request.get_ref().offset))]
    async fn consume(
        &self,
        request: Request<ConsumeRequest>,
    ) -> Result<Response<ConsumeResponse>, Status> {
        let offset = request.into_inner().offset;
        let record = self.log.read(offset).map_err(storage_status)?;
        Ok(Response::new(ConsumeResponse {
            record: Some(record),
        }))
    }

    type ProduceStreamStream = ReceiverStream<Result<ProduceResponse, Status>>;

    async fn produce_stream(
        &self,
        request: Request<Streaming<ProduceRequest>>,
    ) -> Result<Response<Self::ProduceStreamStream>, Status> {
        let mut inbound = request.into_inner();
        let log = Arc::clone(&self.log);
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);

        tokio::spawn(async move {
            loop {
                let produce = match inbound.message().await {
                    Ok(Some(req)) => req,
                    // Request stream ended or errored; we are done either way.
                    Ok(None) => break,
                    Err(status) => {
                        let _ = tx.send(Err(status)).await;
                        break;
                    }
                };

                let Some(record) = produce.record else {
                    let _ = tx
                        .send(Err(Status::invalid_argument(
                            "produce request is missing a record",
                        )))
                        .await;
                    break;
                };

                let response = log
                    .append(record)
                    .map(|offset| ProduceResponse { offset })
                    .map_err(storage_status);
                let failed = response.is_err();
                if tx.send(response).await.is_err() || failed {
                    break;
                }
            }
        });

        Ok(Response::new(ReceiverStream::new(rx)))
    }

    type ConsumeStreamStream = ReceiverStream<Result<ConsumeResponse, Status>>;

    #[tracing::instrument(skip(self, request), fields(offset = request.get_ref().offset))]
    async fn consume_stream(
        &self,
        request: Request<ConsumeRequest>,
    ) -> Result<Response<Self::ConsumeStreamStream>, Status> {
        let mut offset = request.into_inner().offset;
        let log = Arc::clone(&self.log);
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);

        tokio::spawn(async move {
            loop {
                match log.read(offset) {
                    Ok(record) => {
                        let response = ConsumeResponse {
                            record: Some(record),
                        };
                        if tx.send(Ok(response)).await.is_err() {
                            // Client went away.
                            break;
                        }
                        offset += 1;
                    }
                    Err(StorageError::OffsetOutOfRange { .. }) => {
                        // Tail reached: wait without advancing, watching for
                        // the client to disconnect.
                        tokio::select! {
                            _ = tx.closed() => break,
                            _ = tokio::time::sleep(TAIL_POLL_INTERVAL) => {}
                        }
                    }
                    Err(err) => {
                        let _ = tx.send(Err(storage_status(err))).await;
                        break;
                    }
                }
            }
        });

        Ok(Response::new(ReceiverStream::new(rx)))
    }
}
