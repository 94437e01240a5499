#![forbid(unsafe_code)]

//! Windowing behavior of the engine under a hand-driven host.
//!
//! Covers:
//! - seeding from head, tail and cursor
//! - loads at either edge, no overlapping same-direction loads
//! - scroll correction across a prepend
//! - remount on jump with stale results discarded
//! - live tail batching, follow toggling and pull-to-refresh

mod common;

use common::Pump;
use logpane_core::{Cursor, Direction, FetchError, FetchRequest, MemoryLog, synthetic_record};
use logpane_engine::{Engine, EngineConfig, Msg, Position, Viewport};

fn cursor_of(line: u64) -> Cursor {
    synthetic_record(line).cursor
}

fn quiet_engine(position: Position) -> Engine<logpane_engine::FixedViewport> {
    Engine::new(common::viewport(), position, EngineConfig::default()).with_follow(false)
}

#[test]
fn head_seed_reads_oldest_records() {
    let mut pump = Pump::with_engine(MemoryLog::synthetic(1_000), quiet_engine(Position::Head));
    pump.init();
    pump.settle();
    let messages = pump.messages();
    assert_eq!(messages.len(), 300);
    assert_eq!(messages[0], "line 0");
    assert_eq!(messages[299], "line 299");
    let snap = pump.engine.snapshot();
    assert!(!snap.is_loading);
    assert!(snap.has_more_after);
    assert!(!snap.has_more_before);
    assert!(!snap.auto_scroll);
    assert_eq!(pump.engine.viewport().metrics().offset, 0);
}

#[test]
fn tail_seed_pins_to_bottom() {
    let mut pump = Pump::new(MemoryLog::synthetic(1_000), Position::Tail);
    pump.init();
    pump.settle();
    let messages = pump.messages();
    assert_eq!(messages.first().map(String::as_str), Some("line 700"));
    assert_eq!(messages.last().map(String::as_str), Some("line 999"));
    assert!(pump.engine.viewport().metrics().is_at_bottom(0));
    assert!(pump.engine.snapshot().has_more_before);
    assert!(pump.engine.snapshot().auto_scroll);
}

#[test]
fn no_concurrent_same_direction_loads() {
    let log = MemoryLog::synthetic(3_000);
    let mut pump = Pump::with_engine(log, quiet_engine(Position::Cursor(cursor_of(1_500))));
    pump.init();
    pump.settle();
    assert_eq!(pump.engine.store().len(), 600);
    let seeded = pump.issued.len();

    pump.scroll_to(0);
    pump.scroll_to(10);
    pump.scroll_to(0);
    let max = pump.engine.viewport().metrics().max_offset();
    pump.scroll_to(max);
    pump.scroll_to(max - 10);
    pump.scroll_to(max);

    let loads: Vec<Direction> = pump.issued[seeded..].iter().map(|(_, d, _)| *d).collect();
    assert_eq!(loads, vec![Direction::Before, Direction::After]);
    assert!(pump.engine.is_loading_before());
    assert!(pump.engine.is_loading_after());

    pump.settle();
    assert_eq!(pump.engine.store().len(), 1_100);
}

#[test]
fn prepend_keeps_the_visible_row_in_place() {
    let log = MemoryLog::synthetic(2_000);
    let mut pump = Pump::with_engine(log, quiet_engine(Position::Cursor(cursor_of(1_000))));
    pump.init();
    pump.settle();
    assert_eq!(pump.engine.viewport().first_visible(), Some(300));

    pump.scroll_to(250);
    let top = |pump: &Pump| {
        let index = pump.engine.viewport().first_visible()?;
        pump.engine
            .store()
            .get(index)
            .map(|r| r.record.message.clone())
    };
    assert_eq!(top(&pump).as_deref(), Some("line 725"));
    assert_eq!(pump.fetches.len(), 1);
    assert_eq!(
        pump.fetches[0].request,
        FetchRequest::at(cursor_of(700), 250)
    );

    pump.answer_next();
    assert_eq!(pump.engine.store().len(), 850);
    // Rows landed above the fold; the offset is fixed after the paint.
    assert!(pump.engine.is_loading_before());
    pump.paint();
    assert_eq!(pump.engine.viewport().metrics().offset, 2_750);
    assert_eq!(top(&pump).as_deref(), Some("line 725"));
    assert!(!pump.engine.is_loading_before());
    assert!(pump.engine.snapshot().has_more_before);
}

#[test]
fn forward_load_reaches_the_true_tail() {
    let mut pump = Pump::with_engine(MemoryLog::synthetic(320), quiet_engine(Position::Head));
    pump.init();
    pump.settle();
    pump.scroll_to(2_800);
    assert_eq!(pump.fetches.len(), 1);
    assert_eq!(
        pump.fetches[0].request,
        FetchRequest::at(cursor_of(299), 250)
    );
    pump.settle();
    assert_eq!(pump.engine.store().len(), 320);
    assert!(!pump.engine.snapshot().has_more_after);

    // Nothing left to load after the tail.
    pump.scroll_to(3_000);
    assert!(pump.fetches.is_empty());
}

#[test]
fn jump_to_beginning_then_end_applies_only_the_last() {
    let mut pump = Pump::new(MemoryLog::synthetic(1_000), Position::Tail);
    pump.init();
    pump.settle();
    let first_live = pump.live().expect("tail mount follows");
    let before_jumps = pump.issued.len();

    pump.send(Msg::JumpToBeginning);
    pump.send(Msg::JumpToEnd);
    assert_eq!(pump.unsubscribed, vec![first_live]);
    pump.settle();

    let jumps = &pump.issued[before_jumps..];
    assert_eq!(jumps.len(), 2);
    assert_eq!((jumps[0].0, jumps[0].1), (1, Direction::Since));
    assert_eq!((jumps[1].0, jumps[1].1), (2, Direction::Until));
    let effective_until = pump
        .issued
        .iter()
        .filter(|(generation, direction, _)| *generation == 2 && *direction == Direction::Until)
        .count();
    assert_eq!(effective_until, 1);

    assert_eq!(pump.engine.generation(), 2);
    assert_eq!(pump.engine.position(), &Position::Tail);
    let messages = pump.messages();
    assert_eq!(messages.first().map(String::as_str), Some("line 700"));
    assert_eq!(messages.len(), 300);
}

#[test]
fn stale_result_after_jump_is_ignored_even_when_late() {
    let mut pump = Pump::with_engine(MemoryLog::synthetic(1_000), quiet_engine(Position::Tail));
    pump.init();
    pump.send(Msg::JumpToCursor(cursor_of(10)));
    // The jump's fetches resolve before the original tail seed.
    pump.answer_last();
    pump.answer_last();
    pump.answer_next();
    pump.settle();
    let messages = pump.messages();
    assert_eq!(messages.first().map(String::as_str), Some("line 0"));
    assert_eq!(messages.len(), 310);
    assert_eq!(pump.engine.viewport().first_visible(), Some(10));
}

#[test]
fn cursor_seed_survives_one_failed_half() {
    let mut pump = Pump::with_engine(
        MemoryLog::synthetic(1_000),
        quiet_engine(Position::Cursor(cursor_of(500))),
    );
    pump.init();
    pump.fail_next(FetchError::transport("reset by peer"));
    pump.settle();
    let messages = pump.messages();
    assert_eq!(messages.first().map(String::as_str), Some("line 500"));
    assert!(!pump.engine.snapshot().has_more_before);
    assert!(pump.engine.snapshot().has_more_after);
    assert!(!pump.engine.snapshot().is_loading);
}

#[test]
fn live_pushes_coalesce_into_one_frame() {
    let mut pump = Pump::new(MemoryLog::synthetic(50), Position::Tail);
    pump.init();
    pump.settle();
    assert_eq!(pump.subscribed, vec![(pump.live().expect("live"), cursor_of(49))]);

    for i in 50..53 {
        pump.push(synthetic_record(i));
    }
    assert_eq!(pump.frames.len(), 1);
    assert_eq!(pump.engine.store().len(), 50);

    pump.frame();
    assert_eq!(pump.engine.store().len(), 53);
    pump.paint();
    assert!(pump.engine.viewport().metrics().is_at_bottom(0));
    assert_eq!(pump.engine.viewport().metrics().offset, 330);
}

#[test]
fn live_flush_drops_records_not_after_the_tail() {
    let mut pump = Pump::new(MemoryLog::synthetic(10), Position::Head);
    pump.init();
    pump.settle();
    let id = pump.live().expect("head at true tail follows");
    pump.push(synthetic_record(10));
    pump.send(Msg::LivePush {
        subscription: id,
        record: synthetic_record(5),
    });
    pump.settle();
    let messages = pump.messages();
    assert_eq!(messages.len(), 11);
    assert_eq!(messages.last().map(String::as_str), Some("line 10"));
}

#[test]
fn scrolling_up_stops_auto_scroll() {
    let mut pump = Pump::new(MemoryLog::synthetic(100), Position::Tail);
    pump.init();
    pump.settle();
    pump.scroll_to(500);
    assert!(!pump.engine.snapshot().auto_scroll);

    pump.push(synthetic_record(100));
    pump.settle();
    assert_eq!(pump.engine.store().len(), 101);
    assert_eq!(pump.engine.viewport().metrics().offset, 500);

    pump.scroll_to(810);
    assert!(pump.engine.snapshot().auto_scroll);
}

#[test]
fn disabling_follow_drops_unflushed_records() {
    let mut pump = Pump::new(MemoryLog::synthetic(20), Position::Tail);
    pump.init();
    pump.settle();
    let id = pump.live().expect("live");
    pump.push(synthetic_record(20));
    pump.send(Msg::SetFollow(false));
    assert_eq!(pump.unsubscribed, vec![id]);
    pump.frame();
    assert_eq!(pump.engine.store().len(), 20);

    // Re-enabling resubscribes from the current tail.
    pump.send(Msg::SetFollow(true));
    let (_, after) = pump.subscribed.last().cloned().expect("resubscribed");
    assert_eq!(after, cursor_of(19));
    pump.settle();
    assert_eq!(pump.engine.store().len(), 21);
}

#[test]
fn pull_to_refresh_fetches_after_the_tail() {
    let mut pump = Pump::with_engine(MemoryLog::synthetic(100), quiet_engine(Position::Tail));
    pump.init();
    pump.settle();
    assert!(pump.live().is_none());
    pump.push(synthetic_record(100));
    pump.push(synthetic_record(101));

    pump.send(Msg::Wheel { delta_y: -4 });
    assert!(pump.fetches.is_empty());

    pump.send(Msg::Wheel { delta_y: 4 });
    assert_eq!(pump.fetches.len(), 1);
    assert_eq!(pump.fetches[0].direction, Direction::After);
    assert!(pump.engine.snapshot().is_refreshing);

    pump.send(Msg::Wheel { delta_y: 4 });
    assert_eq!(pump.fetches.len(), 1);

    pump.settle();
    assert!(!pump.engine.snapshot().is_refreshing);
    assert_eq!(pump.engine.store().len(), 102);
}

#[test]
fn follow_enabled_during_refresh_subscribes_after_it_lands() {
    let mut pump = Pump::with_engine(MemoryLog::synthetic(100), quiet_engine(Position::Tail));
    pump.init();
    pump.settle();
    pump.push(synthetic_record(100));
    pump.push(synthetic_record(101));

    pump.send(Msg::Wheel { delta_y: 4 });
    assert_eq!(pump.fetches.len(), 1);
    pump.send(Msg::SetFollow(true));
    assert!(pump.live().is_none());
    assert!(pump.subscribed.is_empty());

    pump.settle();
    let (_, after) = pump.subscribed.last().cloned().expect("subscribed");
    assert_eq!(after, cursor_of(101));
    pump.push(synthetic_record(102));
    pump.settle();

    let expected: Vec<String> = (0..103).map(|i| format!("line {i}")).collect();
    assert_eq!(pump.messages(), expected);
    let cursors: Vec<Cursor> = pump.engine.store().iter().map(|r| r.cursor().clone()).collect();
    assert!(cursors.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn snapshot_generation_tracks_remounts() {
    let mut pump = Pump::new(MemoryLog::synthetic(100), Position::Head);
    pump.init();
    pump.settle();
    assert_eq!(pump.engine.snapshot().generation, 0);
    pump.send(Msg::JumpToCursor(cursor_of(50)));
    assert_eq!(pump.engine.snapshot().generation, 1);
    assert!(pump.engine.snapshot().is_loading);
    assert_eq!(pump.engine.snapshot().len, 0);
    pump.settle();
    assert_eq!(pump.engine.snapshot().len, 100);
}
