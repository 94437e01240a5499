#![forbid(unsafe_code)]

//! Live-tail batching.
//!
//! Pushed records are coalesced into one pending batch per animation frame.
//! A subscription and a frame request are each identified by a token; a
//! push or frame carrying a token that is no longer current belongs to a
//! torn-down subscription and is ignored.

use logpane_core::{Cursor, LogRecord};

/// Identity of one live subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Identity of one requested animation frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(pub u64);

#[derive(Debug, Default)]
pub struct LiveTail {
    active: Option<SubscriptionId>,
    frame: Option<FrameId>,
    pending: Vec<LogRecord>,
}

/// What the engine must do after a push was accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Dropped: the subscription is not current.
    Ignored,
    /// Queued behind an already requested frame.
    Queued,
    /// Queued; request this frame.
    RequestFrame(FrameId),
}

impl LiveTail {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn active(&self) -> Option<SubscriptionId> {
        self.active
    }

    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn activate(&mut self, id: SubscriptionId) {
        self.teardown();
        self.active = Some(id);
    }

    /// Forget the subscription, the pending frame and unflushed records.
    ///
    /// Returns the subscription that was active.
    pub fn teardown(&mut self) -> Option<SubscriptionId> {
        let dropped = self.pending.len();
        if dropped > 0 {
            tracing::debug!(dropped, "live tail torn down with unflushed records");
        }
        self.pending.clear();
        self.frame = None;
        self.active.take()
    }

    /// Accept a push. `next_frame` mints a frame token when one is needed.
    pub fn push(
        &mut self,
        id: SubscriptionId,
        record: LogRecord,
        next_frame: impl FnOnce() -> FrameId,
    ) -> PushOutcome {
        if self.active != Some(id) {
            return PushOutcome::Ignored;
        }
        tracing::trace!(cursor = %record.cursor, "live push");
        self.pending.push(record);
        if self.frame.is_some() {
            return PushOutcome::Queued;
        }
        let frame = next_frame();
        self.frame = Some(frame);
        PushOutcome::RequestFrame(frame)
    }

    /// Take the batch for `frame`, keeping only records strictly after
    /// `floor` and after each other. Empty for a stale frame.
    pub fn flush(&mut self, frame: FrameId, floor: Option<&Cursor>) -> Vec<LogRecord> {
        if self.frame != Some(frame) {
            return Vec::new();
        }
        self.frame = None;
        let mut high = floor.cloned();
        let mut batch = Vec::with_capacity(self.pending.len());
        for record in self.pending.drain(..) {
            if high.as_ref().is_some_and(|h| record.cursor <= *h) {
                tracing::debug!(cursor = %record.cursor, "dropping out-of-order live record");
                continue;
            }
            high = Some(record.cursor.clone());
            batch.push(record);
        }
        batch
    }
}
