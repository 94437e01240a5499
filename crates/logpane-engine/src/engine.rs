#![forbid(unsafe_code)]

//! The sans-IO log-window engine.
//!
//! [`Engine`] owns the record store, the has-more flags and the scroll
//! controllers. It never performs IO: [`Engine::init`] and
//! [`Engine::update`] return a [`Cmd`] describing fetches, subscriptions,
//! frames and paints, and the host reports their outcome back as [`Msg`]s.
//!
//! # Lifecycle
//!
//! A mount is identified by its generation. Every fetch carries a
//! [`FetchTicket`] stamped with the generation that issued it; results for
//! an older generation are dropped. Jumps remount: the store is replaced
//! (keys keep counting), the live subscription is cancelled, pending barrier
//! work is discarded and the initial load runs again.
//!
//! # Per-update flow
//!
//! 1. Handle the message.
//! 2. Subscribe or unsubscribe the live tail if its activation changed.
//! 3. Push the row count to the viewport if the store changed.
//! 4. Seal the barrier epoch and request a paint if work was queued.
//! 5. Publish the snapshot.

use std::mem;

use logpane_core::{
    Cursor, Direction, FetchError, FetchRequest, FetchResult, LogRecord, RecordKey,
};

use crate::barrier::{PaintEpoch, RenderBarrier};
use crate::config::EngineConfig;
use crate::follow::FollowController;
use crate::live_tail::{FrameId, LiveTail, PushOutcome, SubscriptionId};
use crate::refresh::{RefreshController, RefreshGate};
use crate::snapshot::{EngineSnapshot, SnapshotHub, Subscription};
use crate::store::{RecordStore, Signal};
use crate::viewport::{Align, VirtualItem, Viewport};

/// Where a mount seeds its window.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Position {
    /// Oldest records first.
    Head,
    /// Newest records, pinned to the bottom.
    #[default]
    Tail,
    /// Records around a cursor, with the cursor at the top.
    Cursor(Cursor),
}

/// Why a fetch was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Purpose {
    /// Initial window for `Head` or `Tail`.
    Seed,
    /// Older half of a `Cursor` seed.
    SeedBefore,
    /// Newer half of a `Cursor` seed.
    SeedSince,
    LoadBefore,
    LoadAfter,
}

/// Routes a fetch result back to the mount and purpose that asked for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FetchTicket {
    pub generation: u64,
    pub purpose: Purpose,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchCmd {
    pub ticket: FetchTicket,
    pub direction: Direction,
    pub request: FetchRequest,
}

/// Effects requested by the engine.
#[derive(Debug, Default, PartialEq, Eq)]
pub enum Cmd {
    #[default]
    None,
    /// Run a windowed fetch and answer with [`Msg::Fetched`].
    Fetch(FetchCmd),
    /// Open a live subscription replaying after `after`; forward each push
    /// as [`Msg::LivePush`].
    Subscribe { id: SubscriptionId, after: Cursor },
    /// Cancel a live subscription.
    Unsubscribe { id: SubscriptionId },
    /// Answer with [`Msg::AnimationFrame`] on the next frame.
    RequestFrame(FrameId),
    /// Paint the current state, then answer with [`Msg::Painted`].
    Paint(PaintEpoch),
    Batch(Vec<Cmd>),
}

impl Cmd {
    #[must_use]
    pub fn batch(cmds: Vec<Self>) -> Self {
        let mut cmds: Vec<Self> = cmds.into_iter().filter(|c| !c.is_none()).collect();
        match cmds.len() {
            0 => Self::None,
            1 => cmds.pop().unwrap_or_default(),
            _ => Self::Batch(cmds),
        }
    }

    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Flatten nested batches, in order, dropping `None`.
    #[must_use]
    pub fn into_vec(self) -> Vec<Self> {
        let mut flat = Vec::new();
        self.flatten_into(&mut flat);
        flat
    }

    fn flatten_into(self, flat: &mut Vec<Self>) {
        match self {
            Self::None => {}
            Self::Batch(cmds) => {
                for cmd in cmds {
                    cmd.flatten_into(flat);
                }
            }
            other => flat.push(other),
        }
    }
}

/// Inputs to [`Engine::update`].
#[derive(Debug)]
pub enum Msg {
    Fetched {
        ticket: FetchTicket,
        result: Result<FetchResult, FetchError>,
    },
    LivePush {
        subscription: SubscriptionId,
        record: LogRecord,
    },
    AnimationFrame(FrameId),
    Painted(PaintEpoch),
    /// The viewport's rendered range moved without a scroll sample.
    RangeChanged,
    /// The user scrolled to `offset`.
    Scrolled { offset: u32 },
    /// Wheel gesture; positive is downward.
    Wheel { delta_y: i32 },
    JumpToBeginning,
    JumpToEnd,
    JumpToCursor(Cursor),
    Measure,
    SetFollow(bool),
}

/// One rendered row joined with its record.
#[derive(Debug, Clone, Copy)]
pub struct VisibleRow<'a> {
    pub item: VirtualItem,
    pub key: RecordKey,
    pub record: &'a LogRecord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Task {
    FinishInitialLoad,
    ScrollToBottom,
    ScrollToIndex(usize),
    RestoreAfterPrepend { delta: u32 },
    RestoreAnchor(Option<usize>),
}

#[derive(Debug, Default)]
struct SeedJoin {
    before: Option<FetchResult>,
    since: Option<FetchResult>,
}

/// Scrollable, bidirectionally-extensible window over a [`Client`]'s log.
///
/// [`Client`]: logpane_core::Client
#[derive(Debug)]
pub struct Engine<V> {
    config: EngineConfig,
    viewport: V,
    follow_enabled: bool,
    mount_position: Position,

    generation: u64,
    position: Position,
    initialized: bool,

    store: RecordStore,
    synced_revision: u64,

    loading_initial: bool,
    loading_before: bool,
    loading_after: bool,
    remeasuring: bool,
    has_more_before: bool,
    has_more_after: bool,
    seed: SeedJoin,

    follow: FollowController,
    refresh: RefreshController,
    live: LiveTail,
    barrier: RenderBarrier<Task>,

    next_subscription: u64,
    next_frame: u64,

    snapshot: SnapshotHub,
    out: Vec<Cmd>,
}

impl<V: Viewport> Engine<V> {
    /// A mount seeding at `position`. Nothing happens until [`init`](Self::init).
    pub fn new(viewport: V, position: Position, config: EngineConfig) -> Self {
        let follow = FollowController::new(
            matches!(position, Position::Tail),
            config.bottom_tolerance_px,
        );
        let mut engine = Self {
            config,
            viewport,
            follow_enabled: true,
            mount_position: position.clone(),
            generation: 0,
            position,
            initialized: false,
            store: RecordStore::default(),
            synced_revision: 0,
            loading_initial: false,
            loading_before: false,
            loading_after: false,
            remeasuring: false,
            has_more_before: false,
            has_more_after: false,
            seed: SeedJoin::default(),
            follow,
            refresh: RefreshController::new(),
            live: LiveTail::new(),
            barrier: RenderBarrier::new(),
            next_subscription: 0,
            next_frame: 0,
            snapshot: SnapshotHub::default(),
            out: Vec::new(),
        };
        engine.viewport.set_count(0);
        engine.publish();
        engine
    }

    /// Enable or disable the live tail (enabled by default).
    #[must_use]
    pub fn with_follow(mut self, follow: bool) -> Self {
        self.follow_enabled = follow;
        self
    }

    /// Start the initial load. A second call on the same mount does nothing.
    pub fn init(&mut self) -> Cmd {
        if self.initialized {
            return Cmd::None;
        }
        self.start();
        self.finish_update()
    }

    pub fn update(&mut self, msg: Msg) -> Cmd {
        match msg {
            Msg::Fetched { ticket, result } => self.on_fetched(ticket, result),
            Msg::LivePush {
                subscription,
                record,
            } => self.on_push(subscription, record),
            Msg::AnimationFrame(frame) => self.on_frame(frame),
            Msg::Painted(epoch) => self.on_painted(epoch),
            Msg::RangeChanged => self.check_range(),
            Msg::Scrolled { offset } => self.on_scrolled(offset),
            Msg::Wheel { delta_y } => self.on_wheel(delta_y),
            Msg::JumpToBeginning => self.remount(Position::Head),
            Msg::JumpToEnd => self.remount(Position::Tail),
            Msg::JumpToCursor(cursor) => self.remount(Position::Cursor(cursor)),
            Msg::Measure => self.begin_measure(),
            Msg::SetFollow(on) => {
                tracing::debug!(follow = on, "follow toggled");
                self.follow_enabled = on;
            }
        }
        self.finish_update()
    }

    pub fn jump_to_beginning(&mut self) -> Cmd {
        self.update(Msg::JumpToBeginning)
    }

    pub fn jump_to_end(&mut self) -> Cmd {
        self.update(Msg::JumpToEnd)
    }

    pub fn jump_to_cursor(&mut self, cursor: Cursor) -> Cmd {
        self.update(Msg::JumpToCursor(cursor))
    }

    /// Re-measure rows and bring the current top row back to the top.
    pub fn measure(&mut self) -> Cmd {
        self.update(Msg::Measure)
    }

    pub fn set_follow(&mut self, on: bool) -> Cmd {
        self.update(Msg::SetFollow(on))
    }

    /// Remount at the position this engine was created with, e.g. after
    /// the host swapped clients.
    pub fn remount_initial(&mut self) -> Cmd {
        let position = self.mount_position.clone();
        self.remount(position);
        self.finish_update()
    }

    #[must_use]
    pub fn snapshot(&self) -> EngineSnapshot {
        self.snapshot.current()
    }

    /// Observe snapshot changes. Drop the guard to stop.
    pub fn subscribe(&self, listener: impl Fn(&EngineSnapshot) + 'static) -> Subscription {
        self.snapshot.subscribe(listener)
    }

    /// Rendered rows with their keys and records.
    #[must_use]
    pub fn visible_rows(&self) -> Vec<VisibleRow<'_>> {
        self.viewport
            .virtual_items()
            .into_iter()
            .filter_map(|item| {
                self.store.get(item.index).map(|row| VisibleRow {
                    item,
                    key: row.key,
                    record: &row.record,
                })
            })
            .collect()
    }

    #[must_use]
    pub fn viewport(&self) -> &V {
        &self.viewport
    }

    /// Mutable viewport access for host-side layout changes (resize).
    /// Follow with [`Msg::RangeChanged`].
    pub fn viewport_mut(&mut self) -> &mut V {
        &mut self.viewport
    }

    #[must_use]
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn position(&self) -> &Position {
        &self.position
    }

    #[must_use]
    pub fn is_follow_enabled(&self) -> bool {
        self.follow_enabled
    }

    #[must_use]
    pub fn is_loading_before(&self) -> bool {
        self.loading_before
    }

    #[must_use]
    pub fn is_loading_after(&self) -> bool {
        self.loading_after
    }

    #[must_use]
    pub fn live_subscription(&self) -> Option<SubscriptionId> {
        self.live.active()
    }

    // -- orchestration -----------------------------------------------------

    fn start(&mut self) {
        let _span = tracing::info_span!("init", generation = self.generation).entered();
        self.initialized = true;
        self.loading_initial = true;
        let batch = self.config.batch_initial;
        match self.position.clone() {
            Position::Head => {
                tracing::debug!("seeding from head");
                self.fetch(Purpose::Seed, Direction::Since, FetchRequest::limit(batch));
            }
            Position::Tail => {
                tracing::debug!("seeding from tail");
                self.fetch(Purpose::Seed, Direction::Until, FetchRequest::limit(batch));
            }
            Position::Cursor(cursor) => {
                tracing::debug!(%cursor, "seeding around cursor");
                self.fetch(
                    Purpose::SeedBefore,
                    Direction::Before,
                    FetchRequest::at(cursor.clone(), batch),
                );
                self.fetch(
                    Purpose::SeedSince,
                    Direction::Since,
                    FetchRequest::at(cursor, batch),
                );
            }
        }
    }

    fn remount(&mut self, position: Position) {
        self.generation += 1;
        let _span = tracing::info_span!("remount", generation = self.generation).entered();
        tracing::debug!(?position, "remounting");

        let keys = mem::take(&mut self.store).into_keys();
        self.store = RecordStore::new(keys);
        self.viewport.set_count(0);
        self.synced_revision = self.store.revision();

        if let Some(id) = self.live.teardown() {
            self.out.push(Cmd::Unsubscribe { id });
        }
        self.barrier.clear();
        self.loading_initial = false;
        self.loading_before = false;
        self.loading_after = false;
        self.remeasuring = false;
        self.has_more_before = false;
        self.has_more_after = false;
        self.seed = SeedJoin::default();
        self.follow = FollowController::new(
            matches!(position, Position::Tail),
            self.config.bottom_tolerance_px,
        );
        self.refresh = RefreshController::new();
        self.position = position;
        self.initialized = false;
        self.start();
    }

    fn fetch(&mut self, purpose: Purpose, direction: Direction, request: FetchRequest) {
        tracing::debug!(
            generation = self.generation,
            ?purpose,
            direction = direction.label(),
            limit = request.limit,
            "fetch"
        );
        self.out.push(Cmd::Fetch(FetchCmd {
            ticket: FetchTicket {
                generation: self.generation,
                purpose,
            },
            direction,
            request,
        }));
    }

    fn on_fetched(&mut self, ticket: FetchTicket, result: Result<FetchResult, FetchError>) {
        if ticket.generation != self.generation {
            tracing::debug!(
                stale = ticket.generation,
                current = self.generation,
                purpose = ?ticket.purpose,
                "discarding stale fetch result"
            );
            return;
        }
        let result = match result {
            Ok(result) => Some(result),
            Err(error) => {
                tracing::warn!(%error, purpose = ?ticket.purpose, "fetch failed");
                None
            }
        };
        match ticket.purpose {
            Purpose::Seed => self.seed_single(result.unwrap_or_else(FetchResult::empty)),
            Purpose::SeedBefore => {
                self.seed.before = Some(result.unwrap_or_else(FetchResult::empty));
                self.try_stitch();
            }
            Purpose::SeedSince => {
                self.seed.since = Some(result.unwrap_or_else(FetchResult::empty));
                self.try_stitch();
            }
            Purpose::LoadBefore => self.finish_load_before(result),
            Purpose::LoadAfter => self.finish_load_after(result),
        }
    }

    fn seed_single(&mut self, result: FetchResult) {
        let has_more = result.has_more();
        let records = result.records.len();
        match self.position {
            Position::Head => self.has_more_after = has_more,
            _ => self.has_more_before = has_more,
        }
        self.store.replace(result.records, Signal::Notify);
        if matches!(self.position, Position::Tail) {
            self.barrier.schedule(Task::ScrollToBottom);
        }
        self.barrier.schedule(Task::FinishInitialLoad);
        tracing::debug!(records, has_more, "seeded");
    }

    fn try_stitch(&mut self) {
        if self.seed.before.is_none() || self.seed.since.is_none() {
            return;
        }
        let (Some(before), Some(since)) = (self.seed.before.take(), self.seed.since.take()) else {
            return;
        };
        self.has_more_before = before.has_more();
        self.has_more_after = since.has_more();
        let prepended = before.records.len();
        if before.records.is_empty() {
            self.store.replace(since.records, Signal::Notify);
        } else {
            self.store.replace(since.records, Signal::Silent);
            self.store.prepend(before.records);
        }
        self.barrier.schedule(Task::ScrollToIndex(prepended));
        self.barrier.schedule(Task::FinishInitialLoad);
        tracing::debug!(
            prepended,
            len = self.store.len(),
            has_more_before = self.has_more_before,
            has_more_after = self.has_more_after,
            "stitched cursor seed"
        );
    }

    // -- incremental loading -----------------------------------------------

    fn check_range(&mut self) {
        if !self.initialized || self.loading_initial || self.remeasuring {
            return;
        }
        let Some(range) = self.viewport.range() else {
            return;
        };
        let gap = self.config.load_gap();
        let batch = self.config.batch_regular;

        if range.start_index <= gap
            && self.has_more_before
            && !self.loading_before
            && let Some(first) = self.store.first()
        {
            let cursor = first.cursor().clone();
            self.loading_before = true;
            self.fetch(
                Purpose::LoadBefore,
                Direction::Before,
                FetchRequest::at(cursor, batch),
            );
        }

        let last_index = self.store.len().saturating_sub(1);
        if last_index.saturating_sub(range.end_index) <= gap
            && self.has_more_after
            && !self.loading_after
            && let Some(last) = self.store.last()
        {
            let cursor = last.cursor().clone();
            self.loading_after = true;
            self.fetch(
                Purpose::LoadAfter,
                Direction::After,
                FetchRequest::at(cursor, batch),
            );
        }
    }

    fn finish_load_before(&mut self, result: Option<FetchResult>) {
        let Some(result) = result else {
            self.loading_before = false;
            return;
        };
        self.has_more_before = result.has_more();
        if result.records.is_empty() {
            self.loading_before = false;
            return;
        }
        let height_before = self.viewport.metrics().scroll_height;
        tracing::debug!(records = result.records.len(), "prepending");
        self.store.prepend(result.records);
        self.sync_count();
        let delta = self
            .viewport
            .metrics()
            .scroll_height
            .saturating_sub(height_before);
        // The flag stays up until the offset is corrected after the paint.
        self.barrier.schedule(Task::RestoreAfterPrepend { delta });
    }

    fn finish_load_after(&mut self, result: Option<FetchResult>) {
        self.loading_after = false;
        if self.refresh.is_refreshing() {
            self.refresh.finish();
        }
        let Some(result) = result else {
            return;
        };
        self.has_more_after = result.has_more();
        let mut records = result.records;
        if let Some(last) = self.store.last() {
            let floor = last.cursor().clone();
            let before = records.len();
            records.retain(|record| record.cursor > floor);
            if records.len() < before {
                tracing::debug!(
                    dropped = before - records.len(),
                    "discarding forward records not after the tail"
                );
            }
        }
        if !records.is_empty() {
            tracing::debug!(records = records.len(), "appending");
            self.store.append(records);
        }
    }

    fn on_painted(&mut self, epoch: PaintEpoch) {
        let tasks = self.barrier.release(epoch);
        if tasks.is_empty() {
            return;
        }
        // Rows changed since the paint request must be visible to the viewport.
        self.sync_count();
        for task in tasks {
            self.run_task(task);
        }
        self.check_range();
    }

    fn run_task(&mut self, task: Task) {
        match task {
            Task::FinishInitialLoad => {
                self.loading_initial = false;
                tracing::debug!(len = self.store.len(), "initial load painted");
            }
            Task::ScrollToBottom => {
                let height = self.viewport.metrics().scroll_height;
                self.viewport.set_scroll_offset(height);
                self.mark_programmatic();
            }
            Task::ScrollToIndex(index) => {
                self.viewport.scroll_to_index(index, Align::Start);
                self.mark_programmatic();
            }
            Task::RestoreAfterPrepend { delta } => {
                let offset = self.viewport.metrics().offset;
                self.viewport.set_scroll_offset(offset.saturating_add(delta));
                self.mark_programmatic();
                self.loading_before = false;
            }
            Task::RestoreAnchor(anchor) => {
                if let Some(index) = anchor {
                    self.viewport.scroll_to_index(index, Align::Start);
                    self.mark_programmatic();
                }
                self.remeasuring = false;
            }
        }
    }

    fn mark_programmatic(&mut self) {
        let offset = self.viewport.metrics().offset;
        self.follow.mark_programmatic(offset);
    }

    fn begin_measure(&mut self) {
        let offset = self.viewport.metrics().offset;
        let anchor = self
            .viewport
            .virtual_items()
            .into_iter()
            .find(|item| item.start.saturating_add(item.size) > offset)
            .map(|item| item.index);
        tracing::debug!(?anchor, "remeasuring");
        self.remeasuring = true;
        self.viewport.measure();
        self.barrier.schedule(Task::RestoreAnchor(anchor));
    }

    // -- gestures ------------------------------------------------------------

    fn on_scrolled(&mut self, offset: u32) {
        self.viewport.set_scroll_offset(offset);
        let inert = self.loading_initial || self.has_more_after;
        self.follow.on_scroll(self.viewport.metrics(), inert);
        self.check_range();
    }

    fn on_wheel(&mut self, delta_y: i32) {
        if !self.initialized || self.loading_initial {
            return;
        }
        let gate = RefreshGate {
            follow: self.follow_enabled,
            has_more_after: self.has_more_after,
            at_bottom: self
                .viewport
                .metrics()
                .is_at_bottom(self.config.bottom_tolerance_px),
            forward_in_flight: self.loading_after,
        };
        if !self.refresh.should_trigger(delta_y, gate) {
            return;
        }
        let cursor = self
            .store
            .last()
            .map_or(Cursor::Beginning, |last| last.cursor().clone());
        tracing::debug!(%cursor, "pull to refresh");
        self.refresh.begin();
        self.loading_after = true;
        self.fetch(
            Purpose::LoadAfter,
            Direction::After,
            FetchRequest::at(cursor, self.config.batch_regular),
        );
    }

    // -- live tail -----------------------------------------------------------

    /// A forward load in flight holds the subscription back: its replay
    /// would cover the same records.
    fn live_should_run(&self) -> bool {
        self.follow_enabled
            && self.initialized
            && !self.loading_initial
            && !self.loading_after
            && !self.has_more_after
    }

    fn sync_subscription(&mut self) {
        match (self.live_should_run(), self.live.active()) {
            (true, None) => {
                let id = SubscriptionId(self.next_subscription);
                self.next_subscription += 1;
                let after = self
                    .store
                    .last()
                    .map_or(Cursor::Beginning, |last| last.cursor().clone());
                tracing::debug!(id = id.0, %after, "live tail subscribing");
                self.live.activate(id);
                self.out.push(Cmd::Subscribe { id, after });
            }
            (false, Some(_)) => {
                if let Some(id) = self.live.teardown() {
                    tracing::debug!(id = id.0, "live tail unsubscribing");
                    self.out.push(Cmd::Unsubscribe { id });
                }
            }
            _ => {}
        }
    }

    fn on_push(&mut self, subscription: SubscriptionId, record: LogRecord) {
        let next_frame = &mut self.next_frame;
        let outcome = self.live.push(subscription, record, || {
            let frame = FrameId(*next_frame);
            *next_frame += 1;
            frame
        });
        match outcome {
            PushOutcome::Ignored => {
                tracing::debug!(id = subscription.0, "discarding push for stale subscription");
            }
            PushOutcome::Queued => {}
            PushOutcome::RequestFrame(frame) => self.out.push(Cmd::RequestFrame(frame)),
        }
    }

    fn on_frame(&mut self, frame: FrameId) {
        let floor = self.store.last().map(|last| last.cursor().clone());
        let batch = self.live.flush(frame, floor.as_ref());
        if batch.is_empty() {
            return;
        }
        if self.follow.auto_scroll() {
            self.barrier.schedule(Task::ScrollToBottom);
        }
        tracing::debug!(records = batch.len(), "flushing live batch");
        self.store.append(batch);
    }

    // -- end of update -------------------------------------------------------

    fn sync_count(&mut self) {
        let revision = self.store.revision();
        if revision != self.synced_revision {
            self.viewport.set_count(self.store.len());
            self.synced_revision = revision;
        }
    }

    fn finish_update(&mut self) -> Cmd {
        self.sync_subscription();
        self.sync_count();
        if let Some(epoch) = self.barrier.seal() {
            self.out.push(Cmd::Paint(epoch));
        }
        self.publish();
        Cmd::batch(mem::take(&mut self.out))
    }

    fn publish(&mut self) {
        let snapshot = EngineSnapshot {
            is_loading: self.loading_initial,
            is_refreshing: self.refresh.is_refreshing(),
            has_more_before: self.has_more_before,
            has_more_after: self.has_more_after,
            auto_scroll: self.follow.auto_scroll(),
            len: self.store.len(),
            generation: self.generation,
        };
        self.snapshot.publish(snapshot);
    }
}
