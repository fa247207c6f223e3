//! stream/stage.rs
//! Stage contract, the per-thread runner and the release guard.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use log::{debug, warn};

use crate::stream::link::StageLink;
use crate::telemetry::{PhaseTimes, TelemetryCounters};
use crate::types::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    /// Compression on write, decompression on read.
    Transform,
    /// File sink on write, file source on read.
    Storage,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageKind::Transform => f.write_str("transform"),
            StageKind::Storage => f.write_str("storage"),
        }
    }
}

/// One half of a two-stage pipeline.
///
/// `run` executes on its own thread and returns `Ok` only after calling
/// [`StageLink::end`]. An `Err` is reported to the controller by the runner.
/// `commit` runs on the caller thread only when the pipeline settled with success,
/// after both stage threads were joined. `close` releases the underlying handle; the
/// controller calls it once, after settlement (and commit, if any).
pub trait Stage: Send {
    fn kind(&self) -> StageKind;

    fn run(&mut self, link: &mut StageLink) -> Result<(), StoreError>;

    fn commit(&mut self) -> Result<(), StoreError> {
        Ok(())
    }

    fn close(&mut self) -> Result<(), StoreError>;

    fn is_closed(&self) -> bool;

    fn report(&self, _counters: &mut TelemetryCounters, _times: &mut PhaseTimes) {}
}

/// Thread body for one stage. Every way out of `run` that did not end the stream
/// cleanly produces exactly one `Failed` event, panics included.
pub(crate) fn run_stage(stage: &mut dyn Stage, mut link: StageLink) {
    let kind = stage.kind();
    debug!("[{kind}] starting");

    let result = panic::catch_unwind(AssertUnwindSafe(|| stage.run(&mut link)));
    match result {
        Ok(Ok(())) if link.ended() => debug!("[{kind}] finished"),
        Ok(Ok(())) => link.fail(StoreError::Pipeline(format!(
            "{kind} stage returned without ending its stream"
        ))),
        Ok(Err(e)) => {
            debug!("[{kind}] failed: {e}");
            link.fail(e);
        }
        Err(_) => link.fail(StoreError::Pipeline(format!("{kind} stage panicked"))),
    }
    // Dropping the link here closes this stage's channel ends.
}

/// What release observed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReleaseReport {
    pub transform_closed: bool,
    pub io_closed: bool,
    /// Close-time errors that were logged and swallowed.
    pub swallowed: u64,
}

/// Owns both stages for the lifetime of one pipeline and releases them exactly once:
/// the transform engine is closed first, then the storage handle, then both drop.
/// Release also runs from `Drop`, so an unwinding caller still frees everything.
pub struct StageResources {
    transform: Option<Box<dyn Stage>>,
    io: Option<Box<dyn Stage>>,
    released: Option<ReleaseReport>,
}

impl StageResources {
    pub fn new(transform: Box<dyn Stage>, io: Box<dyn Stage>) -> Self {
        Self { transform: Some(transform), io: Some(io), released: None }
    }

    /// Mutable access to (transform, io) while the pipeline runs.
    pub(crate) fn stages_mut(&mut self) -> Option<(&mut dyn Stage, &mut dyn Stage)> {
        match (self.transform.as_deref_mut(), self.io.as_deref_mut()) {
            (Some(t), Some(io)) => Some((t, io)),
            _ => None,
        }
    }

    /// Commit both stages, transform first. Stops at the first failure.
    pub fn commit(&mut self) -> Result<(), StoreError> {
        for stage in [&mut self.transform, &mut self.io].into_iter().flatten() {
            stage.commit()?;
        }
        Ok(())
    }

    pub fn report(&self, counters: &mut TelemetryCounters, times: &mut PhaseTimes) {
        for stage in [&self.transform, &self.io].into_iter().flatten() {
            stage.report(counters, times);
        }
    }

    pub fn release(&mut self) -> ReleaseReport {
        if let Some(report) = self.released {
            return report;
        }
        let mut report = ReleaseReport::default();
        report.transform_closed = release_one(self.transform.take(), &mut report.swallowed);
        report.io_closed = release_one(self.io.take(), &mut report.swallowed);
        debug!(
            "[RELEASE] transform_closed={} io_closed={} swallowed={}",
            report.transform_closed, report.io_closed, report.swallowed
        );
        self.released = Some(report);
        report
    }
}

/// Close and drop one stage. Close errors are logged and counted, never returned.
pub(crate) fn release_one(stage: Option<Box<dyn Stage>>, swallowed: &mut u64) -> bool {
    let Some(mut stage) = stage else {
        return true;
    };
    if !stage.is_closed() {
        if let Err(e) = stage.close() {
            // Secondary failure: never allowed to replace the settled outcome.
            warn!("[RELEASE] {} close failed (ignored): {e}", stage.kind());
            *swallowed += 1;
        }
    }
    let closed = stage.is_closed();
    drop(stage);
    closed
}

impl Drop for StageResources {
    fn drop(&mut self) {
        self.release();
    }
}
