//! telemetry/mod.rs
//! Counters, phase timers and immutable snapshots for store pipelines.
//!
//! - Stages count into private `TelemetryCounters`; the controller merges them after
//!   joining, so no locks are taken on the hot path.
//! - Snapshots are `serde` types so callers can log or persist them as JSON.

pub mod counters;
pub mod timers;
pub mod snapshot;

pub use counters::*;
pub use timers::*;
pub use snapshot::*;
