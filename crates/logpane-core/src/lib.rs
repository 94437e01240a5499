#![forbid(unsafe_code)]

//! Core: cursor protocol, data model, and the double-tailed buffer.
//!
//! # Role in logpane
//! `logpane-core` is the layer the window engine is a client of. It defines
//! what a log record and a cursor are, the four windowed fetches plus the
//! live subscription every record source must offer, and the buffer that
//! holds the materialized window.
//!
//! # Primary responsibilities
//! - **Cursor / LogRecord / FetchResult**: the value types exchanged with a
//!   record source.
//! - **Client**: the fetch + subscribe contract.
//! - **DoubleTailedBuffer**: amortized O(1) growth at both ends.
//! - **ReplayGate**: gap-free, duplicate-free replay-to-live handoff.
//! - **MemoryClient**: an in-memory reference source for tests and demos.
//!
//! # How it fits in the system
//! `logpane-engine` owns a buffer through its record store and drives a
//! `Client` through sans-IO commands; nothing here knows about viewports or
//! scrolling.

pub mod buffer;
pub mod client;
pub mod cursor;
pub mod error;
pub mod memory;
pub mod record;
pub mod replay;

pub use buffer::DoubleTailedBuffer;
pub use client::{Client, FetchFuture, PushCallback, SubscribeOptions, Unsubscribe};
pub use cursor::Cursor;
pub use error::{FetchError, IndexOutOfBounds};
pub use memory::{MemoryClient, MemoryLog, synthetic_record, synthetic_timestamp};
pub use record::{
    Direction, FetchRequest, FetchResult, InternalRecord, LogRecord, RecordKey, SourceMeta,
};
pub use replay::{
    DEFAULT_REPLAY_PAGE, ReplayChannel, ReplayGate, replay_after, subscribe_with_replay,
};
