#![forbid(unsafe_code)]

//! Viewport adapter contract and a fixed-row-height reference adapter.
//!
//! The engine never lays rows out itself. It tells the [`Viewport`] how many
//! rows exist, asks it which rows are rendered and where the scroll position
//! is, and moves the scroll position when it needs to.
//!
//! All positions are in pixels; `VisibleRange::end_index` is inclusive and
//! covers the overscan rows on both sides.

/// One rendered row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualItem {
    pub index: usize,
    /// Offset of the row's top edge from the top of the content.
    pub start: u32,
    pub size: u32,
}

/// Rendered index range, overscan included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibleRange {
    pub start_index: usize,
    /// Inclusive.
    pub end_index: usize,
}

/// Where `scroll_to_index` places the target row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Start,
    Center,
    End,
}

/// Scroll container measurements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScrollMetrics {
    /// Distance scrolled from the top.
    pub offset: u32,
    /// Total content height.
    pub scroll_height: u32,
    /// Height of the visible area.
    pub client_height: u32,
}

impl ScrollMetrics {
    /// Largest reachable offset.
    #[must_use]
    pub fn max_offset(&self) -> u32 {
        self.scroll_height.saturating_sub(self.client_height)
    }

    #[must_use]
    pub fn distance_from_bottom(&self) -> u32 {
        self.max_offset().saturating_sub(self.offset)
    }

    /// Pinned at the bottom within `tolerance` pixels.
    #[must_use]
    pub fn is_at_bottom(&self, tolerance: u32) -> bool {
        self.distance_from_bottom() <= tolerance
    }
}

/// The virtualization layer the engine drives.
pub trait Viewport {
    /// Set the number of rows.
    fn set_count(&mut self, count: usize);

    fn count(&self) -> usize;

    /// Estimated height of row `index` before it is measured.
    fn estimate_size(&self, index: usize) -> u32;

    /// Rows currently rendered, top to bottom.
    fn virtual_items(&self) -> Vec<VirtualItem>;

    fn scroll_to_index(&mut self, index: usize, align: Align);

    /// Re-measure rendered rows.
    fn measure(&mut self);

    /// `None` when nothing is rendered.
    fn range(&self) -> Option<VisibleRange>;

    fn metrics(&self) -> ScrollMetrics;

    fn set_scroll_offset(&mut self, offset: u32);
}

/// Headless viewport with uniform row height.
///
/// Like a browser scroll container, growing or shrinking the row count keeps
/// the pixel offset (clamped to the new maximum), so rows prepended above
/// the fold push the visible rows down until the offset is corrected.
#[derive(Debug, Clone)]
pub struct FixedViewport {
    row_height: u32,
    client_height: u32,
    overscan: usize,
    count: usize,
    offset: u32,
    measure_passes: u64,
}

impl FixedViewport {
    /// `client_height` pixels tall showing rows of `row_height` pixels.
    #[must_use]
    pub fn new(row_height: u32, client_height: u32) -> Self {
        Self {
            row_height: row_height.max(1),
            client_height,
            overscan: 0,
            count: 0,
            offset: 0,
            measure_passes: 0,
        }
    }

    #[must_use]
    pub fn with_overscan(mut self, rows: usize) -> Self {
        self.overscan = rows;
        self
    }

    #[must_use]
    pub fn row_height(&self) -> u32 {
        self.row_height
    }

    /// Resize the visible area.
    pub fn set_client_height(&mut self, px: u32) {
        self.client_height = px;
        self.clamp();
    }

    /// Number of `measure` calls so far.
    #[must_use]
    pub fn measure_passes(&self) -> u64 {
        self.measure_passes
    }

    /// First fully or partially visible row.
    #[must_use]
    pub fn first_visible(&self) -> Option<usize> {
        if self.count == 0 {
            return None;
        }
        Some(((self.offset / self.row_height) as usize).min(self.count - 1))
    }

    fn scroll_height(&self) -> u32 {
        let rows = u32::try_from(self.count).unwrap_or(u32::MAX);
        rows.saturating_mul(self.row_height)
    }

    fn row_start(&self, index: usize) -> u32 {
        u32::try_from(index)
            .unwrap_or(u32::MAX)
            .saturating_mul(self.row_height)
    }

    fn clamp(&mut self) {
        let max = self.metrics().max_offset();
        self.offset = self.offset.min(max);
    }
}

impl Viewport for FixedViewport {
    fn set_count(&mut self, count: usize) {
        self.count = count;
        self.clamp();
    }

    fn count(&self) -> usize {
        self.count
    }

    fn estimate_size(&self, _index: usize) -> u32 {
        self.row_height
    }

    fn virtual_items(&self) -> Vec<VirtualItem> {
        let Some(range) = self.range() else {
            return Vec::new();
        };
        (range.start_index..=range.end_index)
            .map(|index| VirtualItem {
                index,
                start: self.row_start(index),
                size: self.row_height,
            })
            .collect()
    }

    fn scroll_to_index(&mut self, index: usize, align: Align) {
        if self.count == 0 {
            return;
        }
        let index = index.min(self.count - 1);
        let top = self.row_start(index);
        self.offset = match align {
            Align::Start => top,
            Align::End => top
                .saturating_add(self.row_height)
                .saturating_sub(self.client_height),
            Align::Center => top
                .saturating_add(self.row_height / 2)
                .saturating_sub(self.client_height / 2),
        };
        self.clamp();
    }

    fn measure(&mut self) {
        self.measure_passes += 1;
        self.clamp();
    }

    fn range(&self) -> Option<VisibleRange> {
        let first = self.first_visible()?;
        let bottom = self.offset.saturating_add(self.client_height.max(1)) - 1;
        let last = ((bottom / self.row_height) as usize).min(self.count - 1);
        Some(VisibleRange {
            start_index: first.saturating_sub(self.overscan),
            end_index: last.saturating_add(self.overscan).min(self.count - 1),
        })
    }

    fn metrics(&self) -> ScrollMetrics {
        ScrollMetrics {
            offset: self.offset,
            scroll_height: self.scroll_height(),
            client_height: self.client_height,
        }
    }

    fn set_scroll_offset(&mut self, offset: u32) {
        self.offset = offset;
        self.clamp();
    }
}
