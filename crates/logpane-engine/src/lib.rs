#![forbid(unsafe_code)]

//! Log-window engine: a scrollable, bidirectionally-extensible, live-tailing
//! view over a cursor-addressable log.
//!
//! # Role in logpane
//! `logpane-engine` turns a [`logpane_core::Client`] into the state a log
//! pane renders: a window of records that grows at either edge as the user
//! scrolls, follows new records at the tail, and keeps the user's visual
//! position stable while rows are inserted above it.
//!
//! # Primary responsibilities
//! - **Engine**: sans-IO state machine (`init` / `update` returning `Cmd`).
//! - **RecordStore**: the window plus stable render keys.
//! - **RenderBarrier**: work deferred until after the next paint.
//! - **Viewport**: the virtualization contract, with [`FixedViewport`] as a
//!   headless reference.
//! - **Driver**: runs an engine against an async client on a tokio
//!   `LocalSet`.
//!
//! # Example
//!
//! ```ignore
//! let viewport = FixedViewport::new(16, 480).with_overscan(10);
//! let engine = Engine::new(viewport, Position::Tail, EngineConfig::from_env());
//! let mut driver = Driver::new(MemoryClient::synthetic(10_000), engine);
//! driver.start();
//! driver.settle().await;
//! assert!(!driver.engine().snapshot().is_loading);
//! ```

pub mod barrier;
pub mod config;
pub mod driver;
pub mod engine;
pub mod follow;
pub mod live_tail;
pub mod refresh;
pub mod snapshot;
pub mod store;
pub mod viewport;

pub use barrier::{PaintEpoch, RenderBarrier};
pub use config::EngineConfig;
pub use driver::Driver;
pub use engine::{
    Cmd, Engine, FetchCmd, FetchTicket, Msg, Position, Purpose, VisibleRow,
};
pub use follow::FollowController;
pub use live_tail::{FrameId, LiveTail, PushOutcome, SubscriptionId};
pub use refresh::{RefreshController, RefreshGate};
pub use snapshot::{EngineSnapshot, SnapshotHub, Subscription};
pub use store::{KeyAllocator, RecordStore, Signal};
pub use viewport::{Align, FixedViewport, ScrollMetrics, Viewport, VirtualItem, VisibleRange};
