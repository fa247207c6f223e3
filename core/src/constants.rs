use std::time::Duration;

pub use crate::compression::constants::{DEFAULT_LEVEL, MAX_LEVEL, MIN_LEVEL};

/// Defaults when the caller does not override them.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024; // 64 KiB
/// Max chunk size sanity bound (32 MiB).
pub const MAX_CHUNK_SIZE: usize = 32 * 1024 * 1024;

/// Bounded capacity of the link between the two stages.
pub const DEFAULT_QUEUE_CAP: usize = 8;
pub const MAX_QUEUE_CAP: usize = 1024;

/// How often the controller checks the cancel token while waiting for events.
pub const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Suffix for the sibling file used by atomic replace.
pub const TEMP_SUFFIX: &str = ".partial";
