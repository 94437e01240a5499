//! Replay-then-live subscription behavior of the reference client.

use std::cell::RefCell;
use std::rc::Rc;

use logpane_core::{Client, Cursor, LogRecord, MemoryClient, SubscribeOptions, synthetic_record};
use tokio::task::LocalSet;

type Seen = Rc<RefCell<Vec<LogRecord>>>;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .try_init();
}

fn collector() -> (Seen, Box<dyn FnMut(LogRecord)>) {
    init_tracing();
    let seen: Seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    (seen, Box::new(move |r| sink.borrow_mut().push(r)))
}

fn messages(seen: &Seen) -> Vec<String> {
    seen.borrow().iter().map(|r| r.message.clone()).collect()
}

async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(flavor = "current_thread")]
async fn push_during_backfill_is_delivered_once() {
    LocalSet::new()
        .run_until(async {
            let client = MemoryClient::synthetic(5);
            let (seen, callback) = collector();
            let _handle = client.subscribe(callback, SubscribeOptions::after(Cursor::Beginning));

            // The replay task has not run yet; this push lands in the queue.
            client.push_line();
            assert!(seen.borrow().is_empty());

            settle().await;
            assert_eq!(
                messages(&seen),
                vec!["line 0", "line 1", "line 2", "line 3", "line 4", "line 5"]
            );
            let sorted = seen.borrow().windows(2).all(|w| w[0].cursor < w[1].cursor);
            assert!(sorted);
        })
        .await;
}

#[tokio::test(flavor = "current_thread")]
async fn replay_then_live_pushes() {
    LocalSet::new()
        .run_until(async {
            let client = MemoryClient::synthetic(3);
            let (seen, callback) = collector();
            let _handle =
                client.subscribe(callback, SubscribeOptions::after(synthetic_record(0).cursor));
            settle().await;
            assert_eq!(messages(&seen), vec!["line 1", "line 2"]);

            client.push_line();
            client.push_line();
            assert_eq!(messages(&seen), vec!["line 1", "line 2", "line 3", "line 4"]);
        })
        .await;
}

#[tokio::test(flavor = "current_thread")]
async fn replay_pages_through_small_batches() {
    LocalSet::new()
        .run_until(async {
            let client = MemoryClient::synthetic(25).with_replay_page(4);
            let (seen, callback) = collector();
            let _handle = client.subscribe(callback, SubscribeOptions::after(Cursor::Beginning));
            settle().await;
            let expected: Vec<String> = (0..25).map(|i| format!("line {i}")).collect();
            assert_eq!(messages(&seen), expected);
        })
        .await;
}

#[tokio::test(flavor = "current_thread")]
async fn cancel_before_replay_drops_everything() {
    LocalSet::new()
        .run_until(async {
            let client = MemoryClient::synthetic(5);
            let (seen, callback) = collector();
            let handle = client.subscribe(callback, SubscribeOptions::after(Cursor::Beginning));
            handle.cancel();
            client.push_line();
            settle().await;
            assert!(seen.borrow().is_empty());
            assert_eq!(client.listener_count(), 0);
        })
        .await;
}

#[tokio::test(flavor = "current_thread")]
async fn subscribe_from_tail_cursor_sees_only_new_records() {
    LocalSet::new()
        .run_until(async {
            let client = MemoryClient::synthetic(10);
            let (seen, callback) = collector();
            let _handle =
                client.subscribe(callback, SubscribeOptions::after(synthetic_record(9).cursor));
            settle().await;
            assert!(seen.borrow().is_empty());
            client.push_line();
            assert_eq!(messages(&seen), vec!["line 10"]);
        })
        .await;
}

#[test]
#[should_panic(expected = "LocalSet")]
fn replaying_subscribe_needs_a_local_set() {
    let client = MemoryClient::synthetic(3);
    let (_seen, callback) = collector();
    let _handle = client.subscribe(callback, SubscribeOptions::after(Cursor::Beginning));
}

#[test]
fn live_only_subscribe_works_without_a_runtime() {
    let client = MemoryClient::synthetic(3);
    let (seen, callback) = collector();
    let _handle = client.subscribe(callback, SubscribeOptions::live());
    client.push_line();
    assert_eq!(messages(&seen), vec!["line 3"]);
}
