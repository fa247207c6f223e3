//! telemetry/snapshot.rs
//! Immutable view of one settled pipeline.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::telemetry::counters::TelemetryCounters;
use crate::telemetry::timers::{Phase, PhaseTimes, TelemetryTimer};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub bytes_plain: u64,
    pub bytes_compressed: u64,
    pub chunks_transformed: u64,
    pub chunks_stored: u64,
    pub events_discarded: u64,
    pub release_errors: u64,
    /// `bytes_compressed / bytes_plain`, 0.0 for empty payloads.
    pub compression_ratio: f64,
    pub throughput_plain_bytes_per_sec: f64,
    pub elapsed: Duration,
    pub phase_times: PhaseTimes,
}

impl TelemetrySnapshot {
    pub fn from(counters: &TelemetryCounters, timer: &TelemetryTimer) -> Self {
        let elapsed = timer.elapsed();

        let compression_ratio = if counters.bytes_plain > 0 {
            counters.bytes_compressed as f64 / counters.bytes_plain as f64
        } else {
            0.0
        };

        let throughput = if elapsed.as_secs_f64() > 0.0 {
            counters.bytes_plain as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        Self {
            bytes_plain: counters.bytes_plain,
            bytes_compressed: counters.bytes_compressed,
            chunks_transformed: counters.chunks_transformed,
            chunks_stored: counters.chunks_stored,
            events_discarded: counters.events_discarded,
            release_errors: counters.release_errors,
            compression_ratio,
            throughput_plain_bytes_per_sec: throughput,
            elapsed,
            phase_times: timer.phase_times.clone(),
        }
    }

    pub fn total_phase_time(&self) -> Duration {
        self.phase_times.total()
    }

    pub fn has_all_phases(&self, expected: &[Phase]) -> bool {
        expected.iter().all(|p| self.phase_times.contains(*p))
    }
}
