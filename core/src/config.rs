//! config.rs
//! Caller-facing knobs for a single store operation.

use crate::compression::{level_in_range, Codec};
use crate::constants::{DEFAULT_CHUNK_SIZE, DEFAULT_LEVEL, DEFAULT_QUEUE_CAP, MAX_CHUNK_SIZE, MAX_LEVEL, MAX_QUEUE_CAP, MIN_LEVEL};
use crate::types::StoreError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Engine used for both directions. Readers must match the writer.
    pub codec: Codec,

    /// Compression level, `MIN_LEVEL..=MAX_LEVEL`. Ignored when reading.
    pub level: u32,

    /// Size of the slices fed to the engine on write and read from disk on read.
    pub chunk_size: usize,

    /// Capacity of the bounded link between transform and storage.
    pub queue_cap: usize,

    /// Write to a sibling temp file and rename over `path` only on success.
    /// - `false` (default) → a failed write may leave a partial file behind.
    pub atomic_replace: bool,

    /// Pretty-print JSON payloads on `write`.
    pub pretty: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            codec: Codec::default(),
            level: DEFAULT_LEVEL,
            chunk_size: DEFAULT_CHUNK_SIZE,
            queue_cap: DEFAULT_QUEUE_CAP,
            atomic_replace: false,
            pretty: false,
        }
    }
}

impl ApiConfig {
    pub fn new(codec: Codec, level: u32) -> Self {
        Self { codec, level, ..Self::default() }
    }

    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_queue_cap(mut self, queue_cap: usize) -> Self {
        self.queue_cap = queue_cap;
        self
    }

    pub fn with_atomic_replace(mut self, enabled: bool) -> Self {
        self.atomic_replace = enabled;
        self
    }

    pub fn with_pretty(mut self, enabled: bool) -> Self {
        self.pretty = enabled;
        self
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        if !level_in_range(self.level) {
            return Err(StoreError::Validation(format!(
                "invalid compression level: {}, must be in {MIN_LEVEL}..={MAX_LEVEL}",
                self.level
            )));
        }
        if self.chunk_size == 0 || self.chunk_size > MAX_CHUNK_SIZE {
            return Err(StoreError::Validation(format!(
                "invalid chunk size: {}, must be in 1..={MAX_CHUNK_SIZE}",
                self.chunk_size
            )));
        }
        if self.queue_cap == 0 || self.queue_cap > MAX_QUEUE_CAP {
            return Err(StoreError::Validation(format!(
                "invalid queue capacity: {}, must be in 1..={MAX_QUEUE_CAP}",
                self.queue_cap
            )));
        }
        Ok(())
    }
}
