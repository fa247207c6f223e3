//! stream/link.rs
//! Wiring handed to each stage: its upstream packets, its downstream, and the
//! controller's event channel.

use std::sync::Arc;

use bytes::Bytes;
use crossbeam::channel::{Receiver, Sender};

use crate::stream::settlement::{CancelToken, SettlementToken};
use crate::stream::stage::StageKind;
use crate::types::StoreError;

/// Unit moved between the two stages. `End` is explicit so a consumer can tell a
/// finished producer from one that went away.
#[derive(Debug)]
pub enum Packet {
    Data(Bytes),
    End,
}

/// Everything the controller observes.
#[derive(Debug)]
pub enum StageEvent {
    /// Output chunk from the terminal stage (read direction only).
    Data(Bytes),
    /// Terminal stage completed: flush done (write) or stream exhausted (read).
    Finished { stage: StageKind },
    Failed { stage: StageKind, error: StoreError },
}

impl StageEvent {
    pub fn is_settling(&self) -> bool {
        !matches!(self, StageEvent::Data(_))
    }
}

#[derive(Debug)]
pub enum Downstream {
    /// Feeds the other stage over the bounded link.
    Stage(Sender<Packet>),
    /// Terminal stage: output and completion go straight to the controller.
    Controller,
}

#[derive(Debug)]
pub struct StageLink {
    kind: StageKind,
    upstream: Option<Receiver<Packet>>,
    downstream: Downstream,
    events: Sender<StageEvent>,
    token: Arc<SettlementToken>,
    cancel: CancelToken,
    ended: bool,
}

impl StageLink {
    pub fn new(
        kind: StageKind,
        upstream: Option<Receiver<Packet>>,
        downstream: Downstream,
        events: Sender<StageEvent>,
        token: Arc<SettlementToken>,
        cancel: CancelToken,
    ) -> Self {
        Self { kind, upstream, downstream, events, token, cancel, ended: false }
    }

    pub fn kind(&self) -> StageKind {
        self.kind
    }

    /// True once the pipeline settled or the caller cancelled. Stages check this
    /// between chunks and bail out.
    pub fn should_stop(&self) -> bool {
        self.token.is_settled() || self.cancel.is_cancelled()
    }

    /// Next chunk from upstream, `None` at end of stream.
    pub fn recv(&mut self) -> Result<Option<Bytes>, StoreError> {
        let rx = self
            .upstream
            .as_ref()
            .ok_or_else(|| StoreError::Pipeline(format!("{} stage has no upstream", self.kind)))?;
        match rx.recv() {
            Ok(Packet::Data(chunk)) => Ok(Some(chunk)),
            Ok(Packet::End) => Ok(None),
            Err(_) => Err(StoreError::Pipeline(format!("upstream of {} stage went away", self.kind))),
        }
    }

    pub fn send(&mut self, chunk: Bytes) -> Result<(), StoreError> {
        if self.ended {
            return Err(StoreError::Pipeline(format!("{} stage sent after end", self.kind)));
        }
        match &self.downstream {
            Downstream::Stage(tx) => tx
                .send(Packet::Data(chunk))
                .map_err(|_| StoreError::Pipeline(format!("downstream of {} stage went away", self.kind))),
            Downstream::Controller => {
                // The controller may already be gone after settlement; nothing to report then.
                let _ = self.events.send(StageEvent::Data(chunk));
                Ok(())
            }
        }
    }

    /// Signal end of stream. For the terminal stage this is the completion event.
    pub fn end(&mut self) -> Result<(), StoreError> {
        if self.ended {
            return Ok(());
        }
        self.ended = true;
        match &self.downstream {
            Downstream::Stage(tx) => tx
                .send(Packet::End)
                .map_err(|_| StoreError::Pipeline(format!("downstream of {} stage went away", self.kind))),
            Downstream::Controller => {
                let _ = self.events.send(StageEvent::Finished { stage: self.kind });
                Ok(())
            }
        }
    }

    pub fn ended(&self) -> bool {
        self.ended
    }

    /// Report a fatal error to the controller.
    pub fn fail(&self, error: StoreError) {
        let _ = self.events.send(StageEvent::Failed { stage: self.kind, error });
    }
}
