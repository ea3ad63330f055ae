//! shiplog server binary.
//!
//! Opens the commit log in a data directory and serves the `shiplog.v1.Log`
//! gRPC service on one TCP listener.
//!
//! ## Configuration
//!
//! Environment variables, all optional:
//!
//! - `SHIPLOG_ADDR`: bind address (default: 0.0.0.0:8400)
//! - `SHIPLOG_DATA_DIR`: log directory (default: ./data/log)
//! - `SHIPLOG_MAX_INDEX_BYTES` / `SHIPLOG_MAX_STORE_BYTES`: segment sizing
//!   overrides
//! - `RUST_LOG`: tracing filter (default: info)

use std::net::SocketAddr;
use std::sync::Arc;

use tonic::transport::Server;

use shiplog_proto::v1::log_server::LogServer;
use shiplog_server::LogService;
use shiplog_storage::{Log, LogConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .init();

    let addr: SocketAddr = std::env::var("SHIPLOG_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8400".to_string())
        .parse()?;
    let data_dir =
        std::env::var("SHIPLOG_DATA_DIR").unwrap_or_else(|_| "./data/log".to_string());

    let mut config = LogConfig::default();
    if let Ok(max_index_bytes) = std::env::var("SHIPLOG_MAX_INDEX_BYTES") {
        config.max_index_bytes = max_index_bytes.parse()?;
    }
    if let Ok(max_store_bytes) = std::env::var("SHIPLOG_MAX_STORE_BYTES") {
        config.max_store_bytes = max_store_bytes.parse()?;
    }

    let log = Log::open(&data_dir, config)?;
    tracing::info!(%addr, %data_dir, "starting shiplog server");

    let service = LogService::new(Arc::new(log));
    Server::builder()
        .add_service(LogServer::new(service))
        .serve(addr)
        .await?;

    Ok(())
}
