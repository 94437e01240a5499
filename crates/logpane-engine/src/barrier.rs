#![forbid(unsafe_code)]

//! Render-synchronization barrier.
//!
//! Work that must only happen after the host has painted the state that
//! scheduled it (scroll fix-ups, clearing the loading flag) is queued here.
//! Tasks scheduled during one engine update share an epoch; at the end of
//! the update the epoch is sealed and the engine asks the host to paint it
//! (`Cmd::Paint`). When the host reports `Msg::Painted` for that epoch,
//! every task up to and including it is released in FIFO order.
//!
//! A task scheduled after an epoch was sealed waits for the next paint,
//! even if an earlier paint report arrives first.

use std::collections::VecDeque;

/// Identifies one requested paint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PaintEpoch(pub u64);

/// FIFO queue of deferred tasks keyed by paint epoch.
#[derive(Debug)]
pub struct RenderBarrier<T> {
    queue: VecDeque<(PaintEpoch, T)>,
    open: Option<PaintEpoch>,
    next: u64,
}

impl<T> Default for RenderBarrier<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RenderBarrier<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            open: None,
            next: 0,
        }
    }

    /// Queue `task` behind the next paint.
    pub fn schedule(&mut self, task: T) {
        let epoch = match self.open {
            Some(epoch) => epoch,
            None => {
                let epoch = PaintEpoch(self.next);
                self.next += 1;
                self.open = Some(epoch);
                epoch
            }
        };
        self.queue.push_back((epoch, task));
    }

    /// Close the open epoch. Returns it if a paint must be requested.
    pub fn seal(&mut self) -> Option<PaintEpoch> {
        self.open.take()
    }

    /// Tasks unblocked by a paint of `painted`, oldest first.
    ///
    /// Tasks in the still-open epoch are never released.
    pub fn release(&mut self, painted: PaintEpoch) -> Vec<T> {
        let mut ready = Vec::new();
        while let Some((epoch, _)) = self.queue.front() {
            if *epoch > painted || Some(*epoch) == self.open {
                break;
            }
            if let Some((_, task)) = self.queue.pop_front() {
                ready.push(task);
            }
        }
        ready
    }

    /// Drop every queued task. Epoch numbering continues.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.open = None;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
