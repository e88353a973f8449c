//! Row virtualization
//!
//! Only rows intersecting the viewport (plus an overscan margin on each side)
//! are materialized. Positions are absolute (`index * row_height`) so a row
//! can be placed without laying out its siblings, and the scrollable extent
//! always covers the full result set.

use std::ops::Range;
use tracing::trace;

pub const DEFAULT_OVERSCAN: usize = 10;

/// A row to render and where it goes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VirtualRow {
    pub index: usize,
    pub offset: f64,
}

/// The realized slice of the result set
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VirtualWindow {
    /// Row indices to materialize, `start..end` with `end <= row count`
    pub range: Range<usize>,
    /// Height of the whole result set
    pub total_extent: f64,
    pub row_height: f64,
}

impl VirtualWindow {
    pub fn rows(&self) -> impl Iterator<Item = VirtualRow> + '_ {
        self.range.clone().map(|index| VirtualRow {
            index,
            offset: index as f64 * self.row_height,
        })
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct RowVirtualizer {
    row_height: f64,
    overscan: usize,
    /// Range of the last `update`, for change detection
    last_range: Option<Range<usize>>,
}

impl RowVirtualizer {
    /// `row_height` is an estimate shared by all rows; values that are not
    /// strictly positive fall back to 1.
    pub fn new(row_height: f64, overscan: usize) -> Self {
        let row_height = if row_height.is_finite() && row_height > 0.0 {
            row_height
        } else {
            1.0
        };
        Self {
            row_height,
            overscan,
            last_range: None,
        }
    }

    pub fn row_height(&self) -> f64 {
        self.row_height
    }

    pub fn overscan(&self) -> usize {
        self.overscan
    }

    /// Compute the window for `row_count` rows scrolled to `scroll_offset`
    /// inside a viewport `viewport_height` tall.
    pub fn compute(&self, row_count: usize, scroll_offset: f64, viewport_height: f64) -> VirtualWindow {
        let scroll = sanitize(scroll_offset);
        let height = sanitize(viewport_height);

        let first_visible = ((scroll / self.row_height).floor() as usize).min(row_count);
        let last_visible = (((scroll + height) / self.row_height).ceil() as usize).min(row_count);

        let start = first_visible.saturating_sub(self.overscan);
        let end = last_visible.saturating_add(self.overscan).min(row_count);

        VirtualWindow {
            range: start..end,
            total_extent: row_count as f64 * self.row_height,
            row_height: self.row_height,
        }
    }

    /// Recompute and report whether the realized range moved since the last
    /// call.
    pub fn update(&mut self, row_count: usize, scroll_offset: f64, viewport_height: f64) -> (VirtualWindow, bool) {
        let window = self.compute(row_count, scroll_offset, viewport_height);
        let changed = self.last_range.as_ref() != Some(&window.range);
        if changed {
            trace!(target: "grid", "Row window {:?} of {}", window.range, row_count);
            self.last_range = Some(window.range.clone());
        }
        (window, changed)
    }

    /// Forget the last range, e.g. after the result set was replaced
    pub fn invalidate(&mut self) {
        self.last_range = None;
    }

    /// Row under a given offset, if any
    pub fn index_at_offset(&self, row_count: usize, offset: f64) -> Option<usize> {
        let index = (sanitize(offset) / self.row_height).floor() as usize;
        (index < row_count).then_some(index)
    }

    /// Largest scroll offset that still fills the viewport
    pub fn max_scroll_offset(&self, row_count: usize, viewport_height: f64) -> f64 {
        (row_count as f64 * self.row_height - sanitize(viewport_height)).max(0.0)
    }
}

impl Default for RowVirtualizer {
    fn default() -> Self {
        Self::new(1.0, DEFAULT_OVERSCAN)
    }
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}
