#![forbid(unsafe_code)]

//! Pull-to-refresh gesture detection.
//!
//! With follow disabled and the window already at the true tail, a forward
//! wheel gesture while pinned at the bottom asks for one more fetch-after
//! cycle. The refresh flag stays up until that fetch settles.

/// Inputs for one wheel sample.
#[derive(Debug, Clone, Copy)]
pub struct RefreshGate {
    pub follow: bool,
    pub has_more_after: bool,
    pub at_bottom: bool,
    pub forward_in_flight: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RefreshController {
    refreshing: bool,
}

impl RefreshController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.refreshing
    }

    /// Whether a wheel gesture of `delta_y` should start a refresh.
    #[must_use]
    pub fn should_trigger(&self, delta_y: i32, gate: RefreshGate) -> bool {
        delta_y > 0
            && !gate.follow
            && !gate.has_more_after
            && gate.at_bottom
            && !gate.forward_in_flight
            && !self.refreshing
    }

    pub fn begin(&mut self) {
        self.refreshing = true;
    }

    pub fn finish(&mut self) {
        self.refreshing = false;
    }
}
