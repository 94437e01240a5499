#![forbid(unsafe_code)]

//! Auto-scroll state machine.
//!
//! Decides whether newly tailed records should drag the viewport to the
//! bottom. Scrolling back to within the tolerance of the bottom turns
//! auto-scroll on; scrolling up turns it off. Scrolls the engine performs
//! itself are tagged with their resulting offset so the sample they produce
//! does not count as a user gesture. Several tags may be outstanding when the
//! host echoes scrolls late; they are matched oldest first.

use std::collections::VecDeque;

use crate::viewport::ScrollMetrics;

/// Outstanding programmatic tags kept; older ones are forgotten.
const MAX_PENDING_TAGS: usize = 8;

#[derive(Debug, Clone)]
pub struct FollowController {
    auto_scroll: bool,
    tolerance: u32,
    last_offset: Option<u32>,
    programmatic: VecDeque<u32>,
}

impl FollowController {
    #[must_use]
    pub fn new(auto_scroll: bool, tolerance: u32) -> Self {
        Self {
            auto_scroll,
            tolerance,
            last_offset: None,
            programmatic: VecDeque::new(),
        }
    }

    #[must_use]
    pub fn auto_scroll(&self) -> bool {
        self.auto_scroll
    }

    /// Record an engine-initiated scroll that landed at `offset`.
    pub fn mark_programmatic(&mut self, offset: u32) {
        if self.programmatic.len() == MAX_PENDING_TAGS {
            self.programmatic.pop_front();
        }
        self.programmatic.push_back(offset);
        self.last_offset = Some(offset);
    }

    /// Feed a scroll sample.
    ///
    /// `inert` suppresses state changes (loading, or more records exist
    /// after the window) while still tracking the offset.
    pub fn on_scroll(&mut self, metrics: ScrollMetrics, inert: bool) {
        let offset = metrics.offset;
        // A match also retires the tags before it: the host skipped them.
        if let Some(pos) = self.programmatic.iter().position(|&tag| tag == offset) {
            self.programmatic.drain(..=pos);
            self.last_offset = Some(offset);
            return;
        }
        self.programmatic.clear();
        let previous = self.last_offset.replace(offset);
        if inert {
            return;
        }
        if metrics.is_at_bottom(self.tolerance) {
            if !self.auto_scroll {
                tracing::debug!(offset, "auto-scroll engaged");
            }
            self.auto_scroll = true;
        } else if previous.is_some_and(|p| offset < p) {
            if self.auto_scroll {
                tracing::debug!(offset, "auto-scroll released");
            }
            self.auto_scroll = false;
        }
    }
}
