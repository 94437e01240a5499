#![forbid(unsafe_code)]

//! Engine tuning knobs.
//!
//! Every field has a default; hosts override with the `with_*` builders or
//! from the environment:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `LOGPANE_BATCH_INITIAL` | `batch_initial` |
//! | `LOGPANE_BATCH_REGULAR` | `batch_regular` |
//! | `LOGPANE_OVERSCAN` | `overscan` |
//! | `LOGPANE_LOAD_MORE_THRESHOLD` | `load_more_threshold` |
//! | `LOGPANE_BOTTOM_TOLERANCE_PX` | `bottom_tolerance_px` |
//!
//! Unparseable values are ignored.

/// Configuration for an [`Engine`](crate::Engine).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    /// Records requested by the initial fetch (per side in cursor mode).
    pub batch_initial: usize,
    /// Records requested by each incremental load.
    pub batch_regular: usize,
    /// Rows the viewport renders beyond the visible area on each side.
    pub overscan: usize,
    /// Distance from an edge, in rows, at which a load is triggered.
    pub load_more_threshold: usize,
    /// Slack in pixels for treating the viewport as pinned at the bottom.
    pub bottom_tolerance_px: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_initial: 300,
            batch_regular: 250,
            overscan: 10,
            load_more_threshold: 40,
            bottom_tolerance_px: 10,
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `LOGPANE_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable source.
    #[must_use]
    pub fn with_env<F>(mut self, get: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| get(key).and_then(|v| v.trim().parse::<usize>().ok());
        if let Some(v) = read("LOGPANE_BATCH_INITIAL") {
            self.batch_initial = v;
        }
        if let Some(v) = read("LOGPANE_BATCH_REGULAR") {
            self.batch_regular = v;
        }
        if let Some(v) = read("LOGPANE_OVERSCAN") {
            self.overscan = v;
        }
        if let Some(v) = read("LOGPANE_LOAD_MORE_THRESHOLD") {
            self.load_more_threshold = v;
        }
        if let Some(v) = get("LOGPANE_BOTTOM_TOLERANCE_PX").and_then(|v| v.trim().parse().ok()) {
            self.bottom_tolerance_px = v;
        }
        self
    }

    #[must_use]
    pub fn with_batch_initial(mut self, n: usize) -> Self {
        self.batch_initial = n;
        self
    }

    #[must_use]
    pub fn with_batch_regular(mut self, n: usize) -> Self {
        self.batch_regular = n;
        self
    }

    #[must_use]
    pub fn with_overscan(mut self, rows: usize) -> Self {
        self.overscan = rows;
        self
    }

    #[must_use]
    pub fn with_load_more_threshold(mut self, rows: usize) -> Self {
        self.load_more_threshold = rows;
        self
    }

    #[must_use]
    pub fn with_bottom_tolerance(mut self, px: u32) -> Self {
        self.bottom_tolerance_px = px;
        self
    }

    /// Rows between the rendered range and an edge that trigger a load.
    ///
    /// The viewport's range already includes overscan, so the overscan is
    /// subtracted from the threshold.
    #[must_use]
    pub fn load_gap(&self) -> usize {
        self.load_more_threshold.saturating_sub(self.overscan)
    }
}
