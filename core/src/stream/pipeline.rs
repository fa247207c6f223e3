//! stream/pipeline.rs
//! Two-stage pipeline wiring and the settle-then-release sequence.

use std::path::Path;
use std::sync::Arc;
use std::thread;

use bytes::Bytes;
use crossbeam::channel::{bounded, unbounded};
use log::debug;

use crate::config::ApiConfig;
use crate::stream::controller::SettlementController;
use crate::stream::link::{Downstream, StageLink};
use crate::stream::settlement::{CancelToken, PipelineState, SettlementToken};
use crate::stream::stage::{release_one, run_stage, ReleaseReport, Stage, StageKind, StageResources};
use crate::stream::stages::{CompressionStage, StorageStage};
use crate::telemetry::{Phase, TelemetryCounters, TelemetrySnapshot, TelemetryTimer};
use crate::types::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// transform → storage sink
    Write,
    /// storage source → transform
    Read,
}

/// Everything known once a pipeline has settled and released its stages.
#[derive(Debug)]
pub struct Settled {
    /// Accumulated output on the read direction, empty on write.
    pub outcome: Result<Bytes, StoreError>,
    pub release: ReleaseReport,
    pub state: PipelineState,
    pub telemetry: TelemetrySnapshot,
}

/// One in-flight operation. Built fresh per call and consumed by `run`.
pub struct Pipeline {
    direction: Direction,
    resources: StageResources,
    queue_cap: usize,
}

impl Pipeline {
    pub fn new(
        direction: Direction,
        transform: Box<dyn Stage>,
        io: Box<dyn Stage>,
        queue_cap: usize,
    ) -> Result<Self, StoreError> {
        let kinds = (transform.kind(), io.kind());
        let resources = StageResources::new(transform, io);
        if kinds != (StageKind::Transform, StageKind::Storage) {
            // `resources` drops here and releases both stages.
            return Err(StoreError::Pipeline(format!(
                "expected (transform, storage) stages, got ({}, {})",
                kinds.0, kinds.1
            )));
        }
        Ok(Self { direction, resources, queue_cap: queue_cap.max(1) })
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Run both stages to a single outcome, then release them.
    pub fn run(self, cancel: Option<&CancelToken>) -> Settled {
        let Pipeline { direction, mut resources, queue_cap } = self;
        let mut timer = TelemetryTimer::new();
        let token = Arc::new(SettlementToken::new());
        let cancel = cancel.cloned().unwrap_or_default();
        let mut controller = SettlementController::new(token.clone(), cancel.clone());

        let (events_tx, events_rx) = unbounded();
        let (link_tx, link_rx) = bounded(queue_cap);

        debug!("[PIPELINE] start {direction:?}");
        let outcome = match resources.stages_mut() {
            Some((transform, io)) => {
                let (producer, consumer) = match direction {
                    Direction::Write => (transform, io),
                    Direction::Read => (io, transform),
                };
                let producer_link = StageLink::new(
                    producer.kind(),
                    None,
                    Downstream::Stage(link_tx),
                    events_tx.clone(),
                    token.clone(),
                    cancel.clone(),
                );
                let consumer_link = StageLink::new(
                    consumer.kind(),
                    Some(link_rx),
                    Downstream::Controller,
                    events_tx,
                    token.clone(),
                    cancel,
                );

                thread::scope(|scope| {
                    scope.spawn(move || run_stage(producer, producer_link));
                    scope.spawn(move || run_stage(consumer, consumer_link));
                    controller.await_settlement(&events_rx)
                })
                // Both stage threads are joined once the scope returns.
            }
            None => Err(StoreError::Pipeline("pipeline stages already released".into())),
        };

        let discarded = controller.drain(&events_rx);
        if discarded > 0 {
            debug!("[PIPELINE] {discarded} late event(s) discarded");
        }

        // Stage threads are joined; only a successful settlement may publish its output.
        let outcome = match outcome {
            Ok(bytes) => match resources.commit() {
                Ok(()) => Ok(bytes),
                Err(e) => {
                    debug!("[PIPELINE] commit failed: {e}");
                    controller.commit_failed();
                    Err(e)
                }
            },
            Err(e) => Err(e),
        };

        let mut counters = TelemetryCounters::default();
        resources.report(&mut counters, &mut timer.phase_times);
        let release = timer.time(Phase::Release, || resources.release());
        controller.mark_released();

        counters.events_discarded = token.discarded();
        counters.release_errors = release.swallowed;
        timer.finish();

        let state = controller.state();
        debug!("[PIPELINE] {direction:?} {state}");
        Settled { outcome, release, state, telemetry: TelemetrySnapshot::from(&counters, &timer) }
    }
}

// ============================================================
// Write / read operations
// ============================================================

/// Release a storage stage opened for a pipeline that never started.
fn abandon(storage: StorageStage) {
    let mut swallowed = 0;
    release_one(Some(Box::new(storage)), &mut swallowed);
}

/// Compress `data` into a file at `path`. The storage handle is opened before the
/// engine is built; either failing aborts before any thread starts.
pub fn write_pipeline(
    path: impl AsRef<Path>,
    data: Bytes,
    config: &ApiConfig,
    cancel: Option<&CancelToken>,
) -> Result<TelemetrySnapshot, StoreError> {
    config.validate()?;
    let storage = StorageStage::open_write(path.as_ref(), config.atomic_replace)?;
    let transform = match CompressionStage::compressor(config.codec, config.level, data, config.chunk_size) {
        Ok(stage) => stage,
        Err(e) => {
            abandon(storage);
            return Err(e);
        }
    };

    let pipeline = Pipeline::new(Direction::Write, Box::new(transform), Box::new(storage), config.queue_cap)?;
    let settled = pipeline.run(cancel);
    settled.outcome.map(|_| settled.telemetry)
}

/// Decompress the file at `path`. A missing or unreadable file fails before the
/// engine is built.
pub fn read_pipeline(
    path: impl AsRef<Path>,
    config: &ApiConfig,
    cancel: Option<&CancelToken>,
) -> Result<(Bytes, TelemetrySnapshot), StoreError> {
    config.validate()?;
    let storage = StorageStage::open_read(path.as_ref(), config.chunk_size)?;
    let transform = match CompressionStage::decompressor(config.codec, config.chunk_size) {
        Ok(stage) => stage,
        Err(e) => {
            abandon(storage);
            return Err(e);
        }
    };

    let pipeline = Pipeline::new(Direction::Read, Box::new(transform), Box::new(storage), config.queue_cap)?;
    let settled = pipeline.run(cancel);
    let telemetry = settled.telemetry;
    settled.outcome.map(|bytes| (bytes, telemetry))
}
