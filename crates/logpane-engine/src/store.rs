#![forbid(unsafe_code)]

//! Single-owner record store over the double-tailed buffer.
//!
//! [`RecordStore`] is the only writer of the window buffer. Every insertion
//! assigns a fresh [`RecordKey`] from a [`KeyAllocator`], and every
//! notifying mutation bumps [`RecordStore::revision`], which the engine
//! watches to push the row count to the viewport.
//!
//! # Invariants
//!
//! 1. Keys are strictly increasing in assignment order and never reused,
//!    not across `replace` calls and not across engine remounts (the
//!    allocator is handed from one store to the next).
//! 2. `revision` changes exactly once per notifying mutation.
//! 3. `Signal::Silent` mutations leave `revision` untouched.

use logpane_core::{DoubleTailedBuffer, InternalRecord, LogRecord, RecordKey};

/// Monotonic key source.
#[derive(Debug, Clone, Default)]
pub struct KeyAllocator {
    next: u64,
}

impl KeyAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out the next key.
    pub fn next_key(&mut self) -> RecordKey {
        let key = RecordKey(self.next);
        self.next += 1;
        key
    }
}

/// Whether a mutation notifies the change-count signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Signal {
    #[default]
    Notify,
    Silent,
}

/// The materialized window.
#[derive(Debug)]
pub struct RecordStore {
    buffer: DoubleTailedBuffer<InternalRecord>,
    keys: KeyAllocator,
    revision: u64,
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new(KeyAllocator::new())
    }
}

impl RecordStore {
    /// Empty store drawing keys from `keys`.
    #[must_use]
    pub fn new(keys: KeyAllocator) -> Self {
        Self {
            buffer: DoubleTailedBuffer::new(),
            keys,
            revision: 0,
        }
    }

    /// Give up the allocator so a successor store continues the sequence.
    #[must_use]
    pub fn into_keys(self) -> KeyAllocator {
        self.keys
    }

    /// Replace the whole window.
    pub fn replace(&mut self, records: Vec<LogRecord>, signal: Signal) {
        let items = self.assign(records);
        self.buffer = DoubleTailedBuffer::from_items(items);
        if signal == Signal::Notify {
            self.bump();
        }
    }

    pub fn append(&mut self, records: Vec<LogRecord>) {
        if records.is_empty() {
            return;
        }
        let items = self.assign(records);
        self.buffer.append(items);
        self.bump();
    }

    pub fn prepend(&mut self, records: Vec<LogRecord>) {
        if records.is_empty() {
            return;
        }
        let items = self.assign(records);
        self.buffer.prepend(items);
        self.bump();
    }

    /// Oldest held record.
    #[must_use]
    pub fn first(&self) -> Option<&InternalRecord> {
        self.buffer.first().ok()
    }

    /// Newest held record.
    #[must_use]
    pub fn last(&self) -> Option<&InternalRecord> {
        self.buffer.last().ok()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&InternalRecord> {
        self.buffer.at(index).ok()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &InternalRecord> + '_ {
        self.buffer.iter()
    }

    /// Owned copy of the window.
    #[must_use]
    pub fn to_vec(&self) -> Vec<InternalRecord> {
        self.buffer.to_vec()
    }

    /// Change-count signal.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn assign(&mut self, records: Vec<LogRecord>) -> Vec<InternalRecord> {
        records
            .into_iter()
            .map(|record| InternalRecord {
                key: self.keys.next_key(),
                record,
            })
            .collect()
    }

    fn bump(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}
