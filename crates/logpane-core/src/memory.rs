#![forbid(unsafe_code)]

//! In-memory reference implementation of the cursor protocol.
//!
//! [`MemoryLog`] answers the four windowed fetches synchronously over an
//! ordered `Vec<LogRecord>`; [`MemoryClient`] wraps it in a shared handle
//! that implements [`Client`], fans pushes out to live listeners, and runs
//! replayed subscriptions through [`subscribe_with_replay`].
//!
//! The synthetic generator uses ISO-8601 timestamps (one millisecond apart)
//! as cursors, so `cursor` and `timestamp` coincide here. Nothing outside
//! this module relies on that.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use futures_util::FutureExt;
use futures_util::future;

use crate::client::{Client, FetchFuture, PushCallback, SubscribeOptions, Unsubscribe};
use crate::cursor::Cursor;
use crate::error::FetchError;
use crate::record::{Direction, FetchRequest, FetchResult, LogRecord};
use crate::replay::{DEFAULT_REPLAY_PAGE, subscribe_with_replay};

/// ISO-8601 timestamp for synthetic line `index` (millisecond spacing).
#[must_use]
pub fn synthetic_timestamp(index: u64) -> String {
    let ms = index % 1_000;
    let total_secs = index / 1_000;
    let secs = total_secs % 60;
    let mins = (total_secs / 60) % 60;
    let hours = (total_secs / 3_600) % 24;
    let day = 1 + total_secs / 86_400;
    format!("2024-01-{day:02}T{hours:02}:{mins:02}:{secs:02}.{ms:03}Z")
}

/// Synthetic record `line {index}` with a timestamp cursor.
#[must_use]
pub fn synthetic_record(index: u64) -> LogRecord {
    let ts = synthetic_timestamp(index);
    LogRecord::new(ts.clone(), format!("line {index}"), Cursor::At(ts))
}

/// Ordered, append-only record sequence answering windowed fetches.
#[derive(Debug, Clone, Default)]
pub struct MemoryLog {
    records: Vec<LogRecord>,
}

impl MemoryLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from arbitrary records: sorted by cursor, duplicate cursors
    /// dropped (first wins).
    #[must_use]
    pub fn from_records(records: impl IntoIterator<Item = LogRecord>) -> Self {
        let mut records: Vec<LogRecord> = records.into_iter().collect();
        records.sort_by(|a, b| a.cursor.cmp(&b.cursor));
        records.dedup_by(|later, earlier| later.cursor == earlier.cursor);
        Self { records }
    }

    /// `line 0 .. line n-1`.
    #[must_use]
    pub fn synthetic(n: u64) -> Self {
        Self {
            records: (0..n).map(synthetic_record).collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    #[must_use]
    pub fn last_cursor(&self) -> Option<&Cursor> {
        self.records.last().map(|r| &r.cursor)
    }

    /// Append a record. Rejects (returns `false`) cursors that are not
    /// strictly greater than the current last cursor.
    pub fn push(&mut self, record: LogRecord) -> bool {
        if let Some(last) = self.last_cursor()
            && record.cursor <= *last
        {
            return false;
        }
        self.records.push(record);
        true
    }

    /// Answer a windowed fetch.
    #[must_use]
    pub fn query(&self, direction: Direction, request: &FetchRequest) -> FetchResult {
        let cursor = request.cursor.as_ref();
        match direction {
            Direction::Since => {
                let start = cursor.map_or(0, |c| self.records.partition_point(|r| r.cursor < *c));
                self.forward(start, request.limit)
            }
            Direction::After => {
                let start = cursor.map_or(0, |c| self.records.partition_point(|r| r.cursor <= *c));
                self.forward(start, request.limit)
            }
            Direction::Until => {
                let end = cursor.map_or(self.records.len(), |c| {
                    self.records.partition_point(|r| r.cursor <= *c)
                });
                self.backward(end, request.limit)
            }
            Direction::Before => {
                let end = cursor.map_or(self.records.len(), |c| {
                    self.records.partition_point(|r| r.cursor < *c)
                });
                self.backward(end, request.limit)
            }
        }
    }

    fn forward(&self, start: usize, limit: usize) -> FetchResult {
        let end = start.saturating_add(limit).min(self.records.len());
        FetchResult {
            records: self.records[start..end].to_vec(),
            next_cursor: self.records.get(end).map(|r| r.cursor.clone()),
        }
    }

    fn backward(&self, end: usize, limit: usize) -> FetchResult {
        let start = end.saturating_sub(limit);
        FetchResult {
            records: self.records[start..end].to_vec(),
            next_cursor: start
                .checked_sub(1)
                .map(|prev| self.records[prev].cursor.clone()),
        }
    }
}

type SharedCallback = Rc<RefCell<PushCallback>>;

#[derive(Default)]
struct Shared {
    log: MemoryLog,
    listeners: Vec<(u64, SharedCallback)>,
    next_listener: u64,
    failures: VecDeque<FetchError>,
    calls: Vec<(Direction, FetchRequest)>,
}

/// Shared in-memory [`Client`].
///
/// Clones are handles to the same log and listener set.
#[derive(Clone)]
pub struct MemoryClient {
    shared: Rc<RefCell<Shared>>,
    replay_page: usize,
}

impl Default for MemoryClient {
    fn default() -> Self {
        Self::new(MemoryLog::new())
    }
}

impl MemoryClient {
    #[must_use]
    pub fn new(log: MemoryLog) -> Self {
        Self {
            shared: Rc::new(RefCell::new(Shared {
                log,
                ..Shared::default()
            })),
            replay_page: DEFAULT_REPLAY_PAGE,
        }
    }

    /// Client over `line 0 .. line n-1`.
    #[must_use]
    pub fn synthetic(n: u64) -> Self {
        Self::new(MemoryLog::synthetic(n))
    }

    /// Page size used when replaying a subscription.
    #[must_use]
    pub fn with_replay_page(mut self, page: usize) -> Self {
        self.replay_page = page.max(1);
        self
    }

    /// Append a record and fan it out to live listeners.
    ///
    /// Returns `false` (and notifies nobody) if the cursor does not advance.
    pub fn push(&self, record: LogRecord) -> bool {
        let listeners: Vec<SharedCallback> = {
            let mut shared = self.shared.borrow_mut();
            if !shared.log.push(record.clone()) {
                return false;
            }
            shared
                .listeners
                .iter()
                .map(|(_, cb)| Rc::clone(cb))
                .collect()
        };
        for listener in listeners {
            let mut callback = listener.borrow_mut();
            (*callback)(record.clone());
        }
        true
    }

    /// Append the next synthetic line.
    pub fn push_line(&self) -> LogRecord {
        let index = self.shared.borrow().log.len() as u64;
        let record = synthetic_record(index);
        self.push(record.clone());
        record
    }

    /// Make the next fetch reject with `err`. Failures queue up.
    pub fn fail_next(&self, err: FetchError) {
        self.shared.borrow_mut().failures.push_back(err);
    }

    /// Every fetch issued so far, in call order.
    #[must_use]
    pub fn calls(&self) -> Vec<(Direction, FetchRequest)> {
        self.shared.borrow().calls.clone()
    }

    /// Number of fetches issued in `direction`.
    #[must_use]
    pub fn call_count(&self, direction: Direction) -> usize {
        self.shared
            .borrow()
            .calls
            .iter()
            .filter(|(d, _)| *d == direction)
            .count()
    }

    /// Registered live listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.shared.borrow().listeners.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.borrow().log.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shared.borrow().log.is_empty()
    }

    /// Snapshot of the underlying log.
    #[must_use]
    pub fn log(&self) -> MemoryLog {
        self.shared.borrow().log.clone()
    }

    fn answer(&self, direction: Direction, request: FetchRequest) -> FetchFuture {
        let outcome = {
            let mut shared = self.shared.borrow_mut();
            shared.calls.push((direction, request.clone()));
            match shared.failures.pop_front() {
                Some(err) => Err(err),
                None => Ok(shared.log.query(direction, &request)),
            }
        };
        future::ready(outcome).boxed_local()
    }

    fn register(&self, callback: PushCallback) -> Unsubscribe {
        let id = {
            let mut shared = self.shared.borrow_mut();
            let id = shared.next_listener;
            shared.next_listener += 1;
            shared.listeners.push((id, Rc::new(RefCell::new(callback))));
            id
        };
        let weak: Weak<RefCell<Shared>> = Rc::downgrade(&self.shared);
        Unsubscribe::new(move || {
            if let Some(shared) = weak.upgrade() {
                shared.borrow_mut().listeners.retain(|(lid, _)| *lid != id);
            }
        })
    }
}

impl Client for MemoryClient {
    fn fetch_since(&self, request: FetchRequest) -> FetchFuture {
        self.answer(Direction::Since, request)
    }

    fn fetch_until(&self, request: FetchRequest) -> FetchFuture {
        self.answer(Direction::Until, request)
    }

    fn fetch_after(&self, request: FetchRequest) -> FetchFuture {
        self.answer(Direction::After, request)
    }

    fn fetch_before(&self, request: FetchRequest) -> FetchFuture {
        self.answer(Direction::Before, request)
    }

    /// # Panics
    ///
    /// With `options.after` set, panics outside a tokio `LocalSet`. Live-only
    /// subscriptions work anywhere.
    fn subscribe(&self, callback: PushCallback, options: SubscribeOptions) -> Unsubscribe {
        match options.after {
            None => self.register(callback),
            Some(after) => subscribe_with_replay(self, callback, after, self.replay_page, |listener| {
                self.register(listener)
            }),
        }
    }
}

impl fmt::Debug for MemoryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shared = self.shared.borrow();
        f.debug_struct("MemoryClient")
            .field("len", &shared.log.len())
            .field("listeners", &shared.listeners.len())
            .field("replay_page", &self.replay_page)
            .finish()
    }
}
