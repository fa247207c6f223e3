//! stream/settlement.rs
//! Single-assignment settlement flag, caller cancel token and the pipeline state machine.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Decides which settling event wins. Exactly one `try_settle` call ever returns `true`.
#[derive(Debug, Default)]
pub struct SettlementToken {
    settled: AtomicBool,
    discarded: AtomicU64,
}

impl SettlementToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check-and-set. Losers are counted as discarded events.
    pub fn try_settle(&self) -> bool {
        let won = self
            .settled
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if !won {
            self.discarded.fetch_add(1, Ordering::Relaxed);
        }
        won
    }

    pub fn is_settled(&self) -> bool {
        self.settled.load(Ordering::Acquire)
    }

    pub fn discarded(&self) -> u64 {
        self.discarded.load(Ordering::Relaxed)
    }
}

/// Caller-held handle that forces a pending pipeline to settle with `Cancelled`.
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Success,
    Failure,
}

/// `Active` → `Settling` → `Settled`. Nothing leaves `Settled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Active,
    Settling(Settlement),
    Settled(Settlement),
}

impl PipelineState {
    pub fn begin_settling(self, how: Settlement) -> Self {
        match self {
            PipelineState::Active => PipelineState::Settling(how),
            other => other,
        }
    }

    /// A success whose commit step failed becomes a failure before release.
    pub fn commit_failed(self) -> Self {
        match self {
            PipelineState::Settling(Settlement::Success) => PipelineState::Settling(Settlement::Failure),
            other => other,
        }
    }

    pub fn complete(self) -> Self {
        match self {
            PipelineState::Settling(how) => PipelineState::Settled(how),
            other => other,
        }
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, PipelineState::Settled(_))
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Active => f.write_str("active"),
            PipelineState::Settling(how) => write!(f, "settling({how:?})"),
            PipelineState::Settled(how) => write!(f, "settled({how:?})"),
        }
    }
}
