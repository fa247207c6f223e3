//! packjson-core
//!
//! Compressed JSON files written and read through a two-stage streaming pipeline
//! (compression engine + file handle) that settles exactly once and always releases
//! both stages.

#![forbid(unsafe_code)]

// Shared and top level
pub mod config;
pub mod constants;
pub mod types;
pub mod utils;

pub mod compression;
pub mod serialize;
pub mod telemetry;

// Pipeline layer
pub mod stream;

// Public surface
pub mod api;

// -----------------------------------------------------------------------------
// Prelude (Rust users)
// -----------------------------------------------------------------------------
pub mod prelude {
    pub use crate::api::{
        read, read_file, read_file_with, read_file_with_report, read_to_string, read_value, read_with,
        read_with_report, write,
        write_file, write_file_with, write_with,
    };
    pub use crate::compression::Codec;
    pub use crate::config::ApiConfig;
    pub use crate::stream::CancelToken;
    pub use crate::telemetry::TelemetrySnapshot;
    pub use crate::types::{ErrorKind, StoreError};
}
