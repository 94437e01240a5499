#![forbid(unsafe_code)]

//! Async host for an [`Engine`].
//!
//! [`Driver`] executes the engine's commands against a [`Client`] on the
//! current tokio `LocalSet`: fetches run as local tasks, subscription
//! pushes and fetch results come back through one unbounded channel, and
//! frame and paint requests are answered on the next loop turn. Every
//! method that spawns must be called from inside a `LocalSet`.

use std::collections::{HashMap, VecDeque};

use logpane_core::{Client, SubscribeOptions, Unsubscribe};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::engine::{Cmd, Engine, Msg};
use crate::live_tail::SubscriptionId;
use crate::viewport::Viewport;

/// Idle loop turns `settle` waits for straggling local tasks.
const IDLE_TURNS: usize = 4;

pub struct Driver<C, V> {
    client: C,
    engine: Engine<V>,
    tx: UnboundedSender<Msg>,
    rx: UnboundedReceiver<Msg>,
    local: VecDeque<Msg>,
    subscriptions: HashMap<SubscriptionId, Unsubscribe>,
    in_flight: usize,
}

impl<C: Client, V: Viewport> Driver<C, V> {
    pub fn new(client: C, engine: Engine<V>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            client,
            engine,
            tx,
            rx,
            local: VecDeque::new(),
            subscriptions: HashMap::new(),
            in_flight: 0,
        }
    }

    /// Run the engine's initial load.
    pub fn start(&mut self) {
        let cmd = self.engine.init();
        self.execute(cmd);
    }

    /// Feed one message and execute the resulting commands.
    pub fn dispatch(&mut self, msg: Msg) {
        if matches!(msg, Msg::Fetched { .. }) {
            self.in_flight = self.in_flight.saturating_sub(1);
        }
        let cmd = self.engine.update(msg);
        self.execute(cmd);
    }

    /// User scroll to `offset`.
    pub fn scroll_to(&mut self, offset: u32) {
        self.dispatch(Msg::Scrolled { offset });
    }

    /// Swap the record source. Open subscriptions are dropped and the
    /// engine remounts under a new generation, so results still in flight
    /// from the old client are discarded.
    pub fn set_client(&mut self, client: C) {
        tracing::debug!(subscriptions = self.subscriptions.len(), "client replaced");
        self.subscriptions.clear();
        self.client = client;
        let cmd = self.engine.remount_initial();
        self.execute(cmd);
    }

    /// Process messages until no fetch is in flight and nothing is queued.
    pub async fn settle(&mut self) {
        let mut idle = 0;
        loop {
            if let Some(msg) = self.local.pop_front() {
                idle = 0;
                self.dispatch(msg);
                continue;
            }
            if let Ok(msg) = self.rx.try_recv() {
                idle = 0;
                self.dispatch(msg);
                continue;
            }
            if self.in_flight > 0 {
                match self.rx.recv().await {
                    Some(msg) => self.dispatch(msg),
                    None => break,
                }
                continue;
            }
            if idle >= IDLE_TURNS {
                break;
            }
            idle += 1;
            tokio::task::yield_now().await;
        }
    }

    #[must_use]
    pub fn engine(&self) -> &Engine<V> {
        &self.engine
    }

    /// Direct engine access for viewport changes. Commands produced through
    /// this handle are not executed; use [`dispatch`](Self::dispatch).
    pub fn engine_mut(&mut self) -> &mut Engine<V> {
        &mut self.engine
    }

    #[must_use]
    pub fn client(&self) -> &C {
        &self.client
    }

    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    #[must_use]
    pub fn open_subscriptions(&self) -> usize {
        self.subscriptions.len()
    }

    fn execute(&mut self, cmd: Cmd) {
        for cmd in cmd.into_vec() {
            match cmd {
                Cmd::Fetch(fetch) => {
                    self.in_flight += 1;
                    let future = self.client.fetch(fetch.direction, fetch.request);
                    let tx = self.tx.clone();
                    let ticket = fetch.ticket;
                    tokio::task::spawn_local(async move {
                        let result = future.await;
                        // The receiver only goes away with the driver.
                        let _ = tx.send(Msg::Fetched { ticket, result });
                    });
                }
                Cmd::Subscribe { id, after } => {
                    let tx = self.tx.clone();
                    let handle = self.client.subscribe(
                        Box::new(move |record| {
                            let _ = tx.send(Msg::LivePush {
                                subscription: id,
                                record,
                            });
                        }),
                        SubscribeOptions::after(after),
                    );
                    self.subscriptions.insert(id, handle);
                }
                Cmd::Unsubscribe { id } => {
                    if let Some(handle) = self.subscriptions.remove(&id) {
                        handle.cancel();
                    }
                }
                Cmd::RequestFrame(frame) => self.local.push_back(Msg::AnimationFrame(frame)),
                Cmd::Paint(epoch) => self.local.push_back(Msg::Painted(epoch)),
                Cmd::None | Cmd::Batch(_) => {}
            }
        }
    }
}

impl<C, V> std::fmt::Debug for Driver<C, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver")
            .field("in_flight", &self.in_flight)
            .field("queued", &self.local.len())
            .field("subscriptions", &self.subscriptions.len())
            .finish_non_exhaustive()
    }
}
