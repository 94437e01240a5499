#![forbid(unsafe_code)]

//! Replay-then-live reconciliation for cursor subscriptions.
//!
//! A subscription that starts from a historical cursor must stitch a replay
//! fetch onto a push stream that is already flowing. The discipline:
//!
//! 1. Register the live listener *before* issuing the replay.
//! 2. While the replay is outstanding, queue pushes instead of delivering.
//! 3. When the replay resolves, deliver the replayed records in order, then
//!    the queued pushes whose cursor is strictly greater than the last
//!    delivered cursor. Everything else in the queue is a duplicate.
//! 4. From then on, deliver pushes immediately.
//!
//! [`ReplayGate`] is the pure state machine; [`ReplayChannel`] wires it to a
//! callback; [`subscribe_with_replay`] runs the whole sequence for any
//! [`Client`] on the current tokio `LocalSet`.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::mem;
use std::rc::Rc;

use tracing::{debug, trace, warn};

use crate::client::{Client, PushCallback, Unsubscribe};
use crate::cursor::Cursor;
use crate::error::FetchError;
use crate::record::{FetchRequest, LogRecord};

/// Default page size for replay fetches.
pub const DEFAULT_REPLAY_PAGE: usize = 1_000;

#[derive(Debug)]
enum GateState {
    Replaying { queued: Vec<LogRecord> },
    Live,
}

/// Buffers pushes that arrive while a replay is outstanding.
#[derive(Debug)]
pub struct ReplayGate {
    state: GateState,
    /// Highest cursor already accounted for; starts at the subscribe cursor.
    floor: Cursor,
}

impl ReplayGate {
    /// A gate in the replaying state, for a replay after `after`.
    #[must_use]
    pub fn new(after: Cursor) -> Self {
        Self {
            state: GateState::Replaying { queued: Vec::new() },
            floor: after,
        }
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        matches!(self.state, GateState::Live)
    }

    /// Pushes currently held back.
    #[must_use]
    pub fn queued_len(&self) -> usize {
        match &self.state {
            GateState::Replaying { queued } => queued.len(),
            GateState::Live => 0,
        }
    }

    /// Offer a live push. Returns the record if it should be delivered now.
    pub fn offer(&mut self, record: LogRecord) -> Option<LogRecord> {
        match &mut self.state {
            GateState::Replaying { queued } => {
                trace!(cursor = %record.cursor, "queueing push during replay");
                queued.push(record);
                None
            }
            GateState::Live => Some(record),
        }
    }

    /// Complete the replay. Returns everything to deliver, in order, and
    /// switches the gate live.
    pub fn finish(&mut self, replayed: Vec<LogRecord>) -> Vec<LogRecord> {
        let queued = match mem::replace(&mut self.state, GateState::Live) {
            GateState::Replaying { queued } => queued,
            GateState::Live => Vec::new(),
        };
        if let Some(last) = replayed.last() {
            self.floor = last.cursor.clone();
        }

        let mut out = replayed;
        let mut dropped = 0usize;
        for record in queued {
            if record.cursor > self.floor {
                self.floor = record.cursor.clone();
                out.push(record);
            } else {
                dropped += 1;
            }
        }
        if dropped > 0 {
            debug!(dropped, "discarded queued pushes already covered by replay");
        }
        out
    }
}

/// A [`ReplayGate`] bound to a subscriber callback.
///
/// Cloning shares the same gate and callback. The callback must not push
/// back into the same subscription.
#[derive(Clone)]
pub struct ReplayChannel {
    gate: Rc<RefCell<ReplayGate>>,
    sink: Rc<RefCell<PushCallback>>,
    cancelled: Rc<Cell<bool>>,
}

impl ReplayChannel {
    #[must_use]
    pub fn new(callback: PushCallback, after: Cursor) -> Self {
        Self {
            gate: Rc::new(RefCell::new(ReplayGate::new(after))),
            sink: Rc::new(RefCell::new(callback)),
            cancelled: Rc::new(Cell::new(false)),
        }
    }

    /// Listener side: a live push arrived.
    pub fn push(&self, record: LogRecord) {
        if self.cancelled.get() {
            return;
        }
        let ready = self.gate.borrow_mut().offer(record);
        if let Some(record) = ready {
            let mut sink = self.sink.borrow_mut();
            (*sink)(record);
        }
    }

    /// Replay side: the historical fetch resolved.
    pub fn complete(&self, replayed: Vec<LogRecord>) {
        if self.cancelled.get() {
            debug!("replay resolved after cancellation; dropping");
            return;
        }
        let batch = self.gate.borrow_mut().finish(replayed);
        let mut sink = self.sink.borrow_mut();
        for record in batch {
            (*sink)(record);
        }
    }

    pub fn cancel(&self) {
        self.cancelled.set(true);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        self.gate.borrow().is_live()
    }
}

impl fmt::Debug for ReplayChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplayChannel")
            .field("gate", &self.gate.borrow())
            .field("cancelled", &self.cancelled.get())
            .finish_non_exhaustive()
    }
}

/// Fetch every record after `after`, paging `page` records at a time.
pub async fn replay_after<C>(
    client: &C,
    after: Cursor,
    page: usize,
) -> Result<Vec<LogRecord>, FetchError>
where
    C: Client + ?Sized,
{
    let page = page.max(1);
    let mut out = Vec::new();
    let mut result = client.fetch_after(FetchRequest::at(after, page)).await?;
    loop {
        out.append(&mut result.records);
        match result.next_cursor.take() {
            Some(next) => {
                result = client.fetch_since(FetchRequest::at(next, page)).await?;
            }
            None => return Ok(out),
        }
    }
}

/// Subscribe with replay from `after`, using `register` to install the raw
/// live listener.
///
/// The listener is registered before the replay task is spawned.
///
/// # Panics
///
/// Panics when called outside a tokio `LocalSet`, since the replay runs as a
/// `spawn_local` task.
pub fn subscribe_with_replay<C, R>(
    client: &C,
    callback: PushCallback,
    after: Cursor,
    page: usize,
    register: R,
) -> Unsubscribe
where
    C: Client + Clone + 'static,
    R: FnOnce(PushCallback) -> Unsubscribe,
{
    let channel = ReplayChannel::new(callback, after.clone());

    let listener = channel.clone();
    let guard = register(Box::new(move |record| listener.push(record)));

    let task_channel = channel.clone();
    let client = client.clone();
    tokio::task::spawn_local(async move {
        let replayed = match replay_after(&client, after, page).await {
            Ok(records) => records,
            Err(err) => {
                warn!(%err, "live-tail replay failed; continuing with live pushes");
                Vec::new()
            }
        };
        task_channel.complete(replayed);
    });

    guard.and_then(move || channel.cancel())
}
