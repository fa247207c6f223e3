//! stream/controller.rs
//! Turns the stream of stage events into one outcome.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use crossbeam::channel::{Receiver, RecvTimeoutError};
use log::{debug, trace};

use crate::constants::CANCEL_POLL_INTERVAL;
use crate::stream::accumulator::Accumulator;
use crate::stream::link::StageEvent;
use crate::stream::settlement::{CancelToken, PipelineState, Settlement, SettlementToken};
use crate::types::StoreError;

pub struct SettlementController {
    token: Arc<SettlementToken>,
    cancel: CancelToken,
    accumulator: Accumulator,
    state: PipelineState,
    poll: Duration,
}

impl SettlementController {
    pub fn new(token: Arc<SettlementToken>, cancel: CancelToken) -> Self {
        Self {
            token,
            cancel,
            accumulator: Accumulator::new(),
            state: PipelineState::Active,
            poll: CANCEL_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll: Duration) -> Self {
        self.poll = poll;
        self
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn token(&self) -> &Arc<SettlementToken> {
        &self.token
    }

    /// Block until the first settling event and return its value. Data chunks seen
    /// before that point are accumulated in order; the success value is their
    /// concatenation (empty on the write direction).
    pub fn await_settlement(&mut self, events: &Receiver<StageEvent>) -> Result<Bytes, StoreError> {
        loop {
            let candidate = match events.recv_timeout(self.poll) {
                Ok(StageEvent::Data(chunk)) => {
                    trace!("[CONTROLLER] chunk of {} bytes", chunk.len());
                    self.accumulator.push(chunk);
                    continue;
                }
                Ok(StageEvent::Finished { stage }) => {
                    debug!("[CONTROLLER] {stage} finished");
                    Ok(())
                }
                Ok(StageEvent::Failed { stage, error }) => {
                    debug!("[CONTROLLER] {stage} failed: {error}");
                    Err(error)
                }
                Err(RecvTimeoutError::Timeout) => {
                    if !self.cancel.is_cancelled() {
                        continue;
                    }
                    debug!("[CONTROLLER] cancel requested");
                    Err(StoreError::Cancelled)
                }
                Err(RecvTimeoutError::Disconnected) => Err(StoreError::Pipeline(
                    "all stages exited without settling".into(),
                )),
            };

            if let Some(outcome) = self.settle(candidate) {
                return outcome;
            }
        }
    }

    /// First caller wins; the rest are discarded.
    fn settle(&mut self, candidate: Result<(), StoreError>) -> Option<Result<Bytes, StoreError>> {
        if !self.token.try_settle() {
            trace!("[CONTROLLER] late event discarded");
            return None;
        }
        let outcome = match candidate {
            Ok(()) => {
                self.state = self.state.begin_settling(Settlement::Success);
                Ok(self.accumulator.finish())
            }
            Err(e) => {
                self.state = self.state.begin_settling(Settlement::Failure);
                self.accumulator.discard();
                Err(e)
            }
        };
        debug!("[CONTROLLER] {}", self.state);
        Some(outcome)
    }

    /// Consume whatever the stages emitted after settlement. Call once every stage
    /// has been joined; returns how many settling events were discarded.
    pub fn drain(&mut self, events: &Receiver<StageEvent>) -> u64 {
        let mut discarded = 0;
        for event in events.try_iter() {
            if event.is_settling() {
                let won = self.token.try_settle();
                debug_assert!(!won, "drain called before settlement");
                discarded += 1;
                trace!("[CONTROLLER] discarded after settlement: {event:?}");
            }
        }
        discarded
    }

    /// The post-settlement commit failed; the outcome the caller sees is that error.
    pub fn commit_failed(&mut self) {
        self.state = self.state.commit_failed();
        debug!("[CONTROLLER] commit failed, {}", self.state);
    }

    /// Resources are released; the pipeline is now terminal.
    pub fn mark_released(&mut self) {
        self.state = self.state.complete();
        debug!("[CONTROLLER] {}", self.state);
    }
}
