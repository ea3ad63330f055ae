//! Log configuration.
//!
//! `LogConfig` controls how segments are sized and where the first offset
//! starts:
//!
//! - **max_index_bytes**: capacity of each segment's index file; one entry is
//!   12 bytes, so this bounds the number of records per segment
//!   (default: 1024)
//! - **max_store_bytes**: capacity of each segment's store file, measured in
//!   payload bytes (default: 15 × 1024)
//! - **initial_offset**: base offset of the first segment created in an
//!   empty directory (default: 0)
//!
//! The config is passed by value at log construction; absent fields default
//! when deserialized.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Maximum size of a segment's index file in bytes.
    #[serde(default = "default_max_index_bytes")]
    pub max_index_bytes: u64,

    /// Maximum size of a segment's store file in payload bytes.
    #[serde(default = "default_max_store_bytes")]
    pub max_store_bytes: u64,

    /// Base offset assigned to the first segment of an empty log.
    #[serde(default)]
    pub initial_offset: u64,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            max_index_bytes: default_max_index_bytes(),
            max_store_bytes: default_max_store_bytes(),
            initial_offset: 0,
        }
    }
}

fn default_max_index_bytes() -> u64 {
    1024
}

fn default_max_store_bytes() -> u64 {
    default_max_index_bytes() * 15
}
