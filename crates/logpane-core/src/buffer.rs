#![forbid(unsafe_code)]

//! Two-ended growable buffer for the materialized log window.
//!
//! [`DoubleTailedBuffer`] gives amortized O(1) `append` and `prepend` by
//! splitting storage into two ordinary vectors: `before` holds the front of
//! the window in reverse order, `after` holds the back in forward order.
//! Neither side is ever shifted when the other grows, which matters because
//! scrolling up (older pages) and live tailing (newer records) are equally
//! common.
//!
//! # Example
//!
//! ```
//! use logpane_core::DoubleTailedBuffer;
//!
//! let mut buf = DoubleTailedBuffer::new();
//! buf.append([3, 4]);
//! buf.prepend([1, 2]);
//!
//! assert_eq!(buf.to_vec(), vec![1, 2, 3, 4]);
//! assert_eq!(buf.at(0), Ok(&1));
//! assert!(buf.at(4).is_err());
//! ```
//!
//! # Invariants
//!
//! 1. Logical index 0 is the oldest held item.
//! 2. `len() == before.len() + after.len()`.
//! 3. A multi-item `prepend` keeps the items' relative order.
//! 4. The buffer never dedupes; callers own that.

use crate::error::IndexOutOfBounds;

/// Sequence container optimized for alternating prepend/append.
#[derive(Debug, Clone)]
pub struct DoubleTailedBuffer<T> {
    /// Front of the window, newest-first (reverse order).
    before: Vec<T>,
    /// Back of the window, oldest-first.
    after: Vec<T>,
}

impl<T> Default for DoubleTailedBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> DoubleTailedBuffer<T> {
    /// Create an empty buffer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            before: Vec::new(),
            after: Vec::new(),
        }
    }

    /// Create a buffer holding `items` in order.
    #[must_use]
    pub fn from_items(items: impl IntoIterator<Item = T>) -> Self {
        Self {
            before: Vec::new(),
            after: items.into_iter().collect(),
        }
    }

    /// Number of held items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.before.len() + self.after.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.before.is_empty() && self.after.is_empty()
    }

    /// Push items onto the back, in order.
    pub fn append(&mut self, items: impl IntoIterator<Item = T>) {
        self.after.extend(items);
    }

    /// Push items onto the front, keeping their relative order.
    pub fn prepend(&mut self, items: impl IntoIterator<Item = T>) {
        let items: Vec<T> = items.into_iter().collect();
        self.before.reserve(items.len());
        // `before` is reversed, so the last input item goes in first.
        self.before.extend(items.into_iter().rev());
    }

    /// Item at logical index `index`.
    pub fn at(&self, index: usize) -> Result<&T, IndexOutOfBounds> {
        let split = self.before.len();
        let slot = if index < split {
            self.before.get(split - 1 - index)
        } else {
            self.after.get(index - split)
        };
        slot.ok_or(IndexOutOfBounds {
            index,
            len: self.len(),
        })
    }

    /// Replace the item at `index`. Returns `false` if out of bounds.
    pub fn set(&mut self, index: usize, value: T) -> bool {
        let split = self.before.len();
        let slot = if index < split {
            self.before.get_mut(split - 1 - index)
        } else {
            self.after.get_mut(index - split)
        };
        match slot {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Oldest item.
    pub fn first(&self) -> Result<&T, IndexOutOfBounds> {
        self.at(0)
    }

    /// Newest item.
    pub fn last(&self) -> Result<&T, IndexOutOfBounds> {
        match self.len() {
            0 => Err(IndexOutOfBounds { index: 0, len: 0 }),
            len => self.at(len - 1),
        }
    }

    /// Iterate front to back.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + '_ {
        self.before.iter().rev().chain(self.after.iter())
    }

    /// Drop every item.
    pub fn clear(&mut self) {
        self.before.clear();
        self.after.clear();
    }
}

impl<T: Clone> DoubleTailedBuffer<T> {
    /// Owned copy of the window in logical order. Never aliases storage.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        let mut out = Vec::with_capacity(self.len());
        out.extend(self.iter().cloned());
        out
    }
}
