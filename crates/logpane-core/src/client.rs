#![forbid(unsafe_code)]

//! The cursor protocol consumed by the engine.
//!
//! A [`Client`] answers four windowed fetches addressed by [`Cursor`] and
//! offers a live push subscription. Everything is single-threaded: fetches
//! return [`LocalBoxFuture`]s and subscription callbacks are plain `FnMut`.
//!
//! | Operation | Bound | Window |
//! |-----------|-------|--------|
//! | `fetch_since` | `cursor >= c` | first `limit` |
//! | `fetch_until` | `cursor <= c` | last `limit` |
//! | `fetch_after` | `cursor > c` | first `limit` |
//! | `fetch_before` | `cursor < c` | last `limit` |
//!
//! A missing cursor means the matching end of the log. `next_cursor` always
//! names the first unconsumed record on the paging side, so it continues
//! with `fetch_since` (forward) or `fetch_until` (backward).

use std::fmt;

use futures_util::future::LocalBoxFuture;

use crate::cursor::Cursor;
use crate::error::FetchError;
use crate::record::{Direction, FetchRequest, FetchResult, LogRecord};

/// Future returned by every windowed fetch.
pub type FetchFuture = LocalBoxFuture<'static, Result<FetchResult, FetchError>>;

/// Push listener registered through [`Client::subscribe`].
pub type PushCallback = Box<dyn FnMut(LogRecord)>;

/// Options for [`Client::subscribe`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscribeOptions {
    /// Replay everything after this cursor before going live.
    /// `None` delivers only future pushes.
    pub after: Option<Cursor>,
}

impl SubscribeOptions {
    /// Live pushes only.
    #[must_use]
    pub fn live() -> Self {
        Self { after: None }
    }

    /// Replay after `cursor`, then go live.
    #[must_use]
    pub fn after(cursor: Cursor) -> Self {
        Self {
            after: Some(cursor),
        }
    }
}

/// Source of log records addressed by cursor.
pub trait Client {
    /// Inclusive forward window starting at `request.cursor`.
    fn fetch_since(&self, request: FetchRequest) -> FetchFuture;

    /// Inclusive backward window ending at `request.cursor`.
    fn fetch_until(&self, request: FetchRequest) -> FetchFuture;

    /// Exclusive forward window after `request.cursor`.
    fn fetch_after(&self, request: FetchRequest) -> FetchFuture;

    /// Exclusive backward window before `request.cursor`.
    fn fetch_before(&self, request: FetchRequest) -> FetchFuture;

    /// Register a push listener.
    ///
    /// With `options.after` set, every record after that cursor is replayed
    /// first, then live pushes follow with no duplicates and no gaps.
    /// Implementations that replay on a local task may require a tokio
    /// `LocalSet`; see [`MemoryClient`](crate::MemoryClient).
    fn subscribe(&self, callback: PushCallback, options: SubscribeOptions) -> Unsubscribe;

    /// Route a request by direction.
    fn fetch(&self, direction: Direction, request: FetchRequest) -> FetchFuture {
        match direction {
            Direction::Since => self.fetch_since(request),
            Direction::Until => self.fetch_until(request),
            Direction::After => self.fetch_after(request),
            Direction::Before => self.fetch_before(request),
        }
    }
}

/// RAII cancellation handle returned by [`Client::subscribe`].
///
/// Dropping the handle (or calling [`cancel`](Self::cancel)) runs the
/// client's teardown exactly once.
#[must_use = "dropping an Unsubscribe cancels the subscription"]
pub struct Unsubscribe {
    teardown: Option<Box<dyn FnOnce()>>,
}

impl Unsubscribe {
    /// Wrap a teardown closure.
    pub fn new(teardown: impl FnOnce() + 'static) -> Self {
        Self {
            teardown: Some(Box::new(teardown)),
        }
    }

    /// A handle with nothing to tear down.
    pub fn noop() -> Self {
        Self { teardown: None }
    }

    /// Chain another teardown step, run after the existing one.
    pub fn and_then(mut self, next: impl FnOnce() + 'static) -> Self {
        let first = self.teardown.take();
        Self::new(move || {
            if let Some(first) = first {
                first();
            }
            next();
        })
    }

    /// Cancel now.
    pub fn cancel(mut self) {
        self.run();
    }

    fn run(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }
}

impl Drop for Unsubscribe {
    fn drop(&mut self) {
        self.run();
    }
}

impl fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unsubscribe")
            .field("armed", &self.teardown.is_some())
            .finish()
    }
}
