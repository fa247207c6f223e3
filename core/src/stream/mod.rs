//! stream: settled two-stage pipelines.
//!
//! A pipeline pairs a transform stage (compression engine) with a storage stage
//! (file handle), runs each on a scoped thread, and funnels every stage event into
//! one controller. The first settling event decides the outcome; both stages are
//! then released exactly once, engine first.

pub mod accumulator;
pub mod controller;
pub mod link;
pub mod pipeline;
pub mod settlement;
pub mod stage;
pub mod stages;

pub use accumulator::Accumulator;
pub use controller::SettlementController;
pub use link::{Downstream, Packet, StageEvent, StageLink};
pub use pipeline::{read_pipeline, write_pipeline, Direction, Pipeline, Settled};
pub use settlement::{CancelToken, PipelineState, Settlement, SettlementToken};
pub use stage::{ReleaseReport, Stage, StageKind, StageResources};
pub use stages::{CompressionStage, StorageStage};
