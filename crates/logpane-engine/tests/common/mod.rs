//! Synchronous host for engine integration tests.
//!
//! `Pump` executes engine commands against a `MemoryLog` by hand, so tests
//! control exactly when each fetch resolves and when paints happen.

#![allow(dead_code)]

use std::collections::VecDeque;

use logpane_core::{Cursor, Direction, FetchError, FetchRequest, LogRecord, MemoryLog};
use logpane_engine::{
    Cmd, Engine, EngineConfig, FetchCmd, FixedViewport, FrameId, Msg, PaintEpoch, Position,
    SubscriptionId,
};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .try_init();
}

/// 10px rows, 200px tall, 10 rows of overscan.
pub fn viewport() -> FixedViewport {
    FixedViewport::new(10, 200).with_overscan(10)
}

pub struct Pump {
    pub engine: Engine<FixedViewport>,
    pub log: MemoryLog,
    pub fetches: VecDeque<FetchCmd>,
    /// Every fetch ever issued, with its generation.
    pub issued: Vec<(u64, Direction, FetchRequest)>,
    pub paints: VecDeque<PaintEpoch>,
    pub frames: VecDeque<FrameId>,
    pub subscribed: Vec<(SubscriptionId, Cursor)>,
    pub unsubscribed: Vec<SubscriptionId>,
    live: Option<SubscriptionId>,
}

impl Pump {
    pub fn new(log: MemoryLog, position: Position) -> Self {
        Self::with_engine(log, Engine::new(viewport(), position, EngineConfig::default()))
    }

    pub fn with_engine(log: MemoryLog, engine: Engine<FixedViewport>) -> Self {
        init_tracing();
        Self {
            engine,
            log,
            fetches: VecDeque::new(),
            issued: Vec::new(),
            paints: VecDeque::new(),
            frames: VecDeque::new(),
            subscribed: Vec::new(),
            unsubscribed: Vec::new(),
            live: None,
        }
    }

    pub fn init(&mut self) {
        let cmd = self.engine.init();
        self.absorb(cmd);
    }

    pub fn send(&mut self, msg: Msg) {
        let cmd = self.engine.update(msg);
        self.absorb(cmd);
    }

    pub fn scroll_to(&mut self, offset: u32) {
        self.send(Msg::Scrolled { offset });
    }

    /// Answer the oldest pending fetch from the log.
    pub fn answer_next(&mut self) -> bool {
        let Some(fetch) = self.fetches.pop_front() else {
            return false;
        };
        let result = self.log.query(fetch.direction, &fetch.request);
        self.send(Msg::Fetched {
            ticket: fetch.ticket,
            result: Ok(result),
        });
        true
    }

    /// Answer the newest pending fetch first.
    pub fn answer_last(&mut self) -> bool {
        let Some(fetch) = self.fetches.pop_back() else {
            return false;
        };
        let result = self.log.query(fetch.direction, &fetch.request);
        self.send(Msg::Fetched {
            ticket: fetch.ticket,
            result: Ok(result),
        });
        true
    }

    pub fn fail_next(&mut self, error: FetchError) -> bool {
        let Some(fetch) = self.fetches.pop_front() else {
            return false;
        };
        self.send(Msg::Fetched {
            ticket: fetch.ticket,
            result: Err(error),
        });
        true
    }

    pub fn paint(&mut self) {
        while let Some(epoch) = self.paints.pop_front() {
            self.send(Msg::Painted(epoch));
        }
    }

    pub fn frame(&mut self) {
        while let Some(frame) = self.frames.pop_front() {
            self.send(Msg::AnimationFrame(frame));
        }
    }

    /// Run everything pending until quiescent.
    pub fn settle(&mut self) {
        loop {
            if self.answer_next() {
                continue;
            }
            if !self.frames.is_empty() {
                self.frame();
                continue;
            }
            if !self.paints.is_empty() {
                self.paint();
                continue;
            }
            break;
        }
    }

    /// Append to the log and deliver to the live subscription, if any.
    pub fn push(&mut self, record: LogRecord) {
        assert!(self.log.push(record.clone()), "pushed cursor must increase");
        if let Some(id) = self.live {
            self.send(Msg::LivePush {
                subscription: id,
                record,
            });
        }
    }

    pub fn live(&self) -> Option<SubscriptionId> {
        self.live
    }

    pub fn messages(&self) -> Vec<String> {
        self.engine
            .store()
            .iter()
            .map(|r| r.record.message.clone())
            .collect()
    }

    pub fn issued_directions(&self) -> Vec<Direction> {
        self.issued.iter().map(|(_, d, _)| *d).collect()
    }

    fn absorb(&mut self, cmd: Cmd) {
        for cmd in cmd.into_vec() {
            match cmd {
                Cmd::Fetch(fetch) => {
                    self.issued.push((
                        fetch.ticket.generation,
                        fetch.direction,
                        fetch.request.clone(),
                    ));
                    self.fetches.push_back(fetch);
                }
                Cmd::Subscribe { id, after } => {
                    self.subscribed.push((id, after.clone()));
                    self.live = Some(id);
                    let replay = self
                        .log
                        .query(Direction::After, &FetchRequest::at(after, usize::MAX));
                    for record in replay.records {
                        self.send(Msg::LivePush {
                            subscription: id,
                            record,
                        });
                    }
                }
                Cmd::Unsubscribe { id } => {
                    self.unsubscribed.push(id);
                    if self.live == Some(id) {
                        self.live = None;
                    }
                }
                Cmd::RequestFrame(frame) => self.frames.push_back(frame),
                Cmd::Paint(epoch) => self.paints.push_back(epoch),
                Cmd::None | Cmd::Batch(_) => {}
            }
        }
    }
}
