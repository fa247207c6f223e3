//! telemetry/counters.rs
//! Mutable counters kept privately by each stage and merged by the controller.
use std::ops::AddAssign;

#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct TelemetryCounters {
    /// Uncompressed payload bytes (engine input on write, engine output on read).
    pub bytes_plain: u64,
    /// Compressed bytes (engine output on write, file bytes on read).
    pub bytes_compressed: u64,
    /// Chunks handed to the engine.
    pub chunks_transformed: u64,
    /// Chunks moved through the storage handle.
    pub chunks_stored: u64,
    /// Settling events that arrived after the pipeline had already settled.
    pub events_discarded: u64,
    /// Secondary errors swallowed while releasing stages.
    pub release_errors: u64,
}

impl TelemetryCounters {
    pub fn add_transformed(&mut self, plain_len: usize, compressed_len: usize) {
        self.chunks_transformed += 1;
        self.bytes_plain += plain_len as u64;
        self.bytes_compressed += compressed_len as u64;
    }

    pub fn add_stored(&mut self) {
        self.chunks_stored += 1;
    }

    pub fn merge(&mut self, other: &TelemetryCounters) {
        self.bytes_plain += other.bytes_plain;
        self.bytes_compressed += other.bytes_compressed;
        self.chunks_transformed += other.chunks_transformed;
        self.chunks_stored += other.chunks_stored;
        self.events_discarded += other.events_discarded;
        self.release_errors += other.release_errors;
    }
}

impl AddAssign for TelemetryCounters {
    fn add_assign(&mut self, rhs: Self) {
        self.merge(&rhs);
    }
}
