//! Column width resolution
//!
//! Widths come from the header title and one representative row rather than
//! from every row, so a resize costs O(columns). The result is cached until
//! the sample or the column spec changes.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::data::record::{ColumnKey, ColumnSpec, Record};
use crate::error::GridResult;
use crate::ui::text_measure::{TextMeasurer, TextStyle};

/// Floor applied to measured columns
pub const DEFAULT_MIN_COLUMN_WIDTH: f32 = 120.0;
pub const DEFAULT_FONT_SIZE: f32 = 16.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnWidth {
    /// Fixed width in px
    Fixed(f32),
    /// Share of the space left over after fixed columns
    Flexible(u16),
}

/// One width per column, in column order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnWidths {
    entries: Vec<(ColumnKey, ColumnWidth)>,
}

impl ColumnWidths {
    pub fn get(&self, key: ColumnKey) -> Option<ColumnWidth> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, width)| *width)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ColumnKey, ColumnWidth)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all fixed widths
    pub fn fixed_total(&self) -> f32 {
        self.entries
            .iter()
            .filter_map(|(_, width)| match width {
                ColumnWidth::Fixed(px) => Some(*px),
                ColumnWidth::Flexible(_) => None,
            })
            .sum()
    }

    /// Concrete pixel widths for a viewport `available` px wide. Flexible
    /// columns split whatever the fixed columns leave, never below zero.
    pub fn layout(&self, available: f32) -> Vec<(ColumnKey, f32)> {
        let leftover = (available - self.fixed_total()).max(0.0);
        let weights: u32 = self
            .entries
            .iter()
            .map(|(_, width)| match width {
                ColumnWidth::Flexible(weight) => u32::from(*weight),
                ColumnWidth::Fixed(_) => 0,
            })
            .sum();

        self.entries
            .iter()
            .map(|(key, width)| {
                let px = match width {
                    ColumnWidth::Fixed(px) => *px,
                    ColumnWidth::Flexible(weight) if weights > 0 => {
                        leftover * f32::from(*weight) / weights as f32
                    }
                    ColumnWidth::Flexible(_) => 0.0,
                };
                (*key, px)
            })
            .collect()
    }
}

pub struct ColumnWidthResolver {
    measurer: Arc<dyn TextMeasurer>,
    min_width: f32,
    flexible: ColumnKey,
    font_size: f32,
    /// Inputs of the last resolution; `None` forces a recompute
    resolved_for: Option<(ColumnSpec, Record)>,
    widths: ColumnWidths,
}

impl ColumnWidthResolver {
    pub fn new(measurer: Arc<dyn TextMeasurer>, flexible: ColumnKey) -> Self {
        Self {
            measurer,
            min_width: DEFAULT_MIN_COLUMN_WIDTH,
            flexible,
            font_size: DEFAULT_FONT_SIZE,
            resolved_for: None,
            widths: ColumnWidths::default(),
        }
    }

    pub fn with_min_width(mut self, min_width: f32) -> Self {
        self.min_width = min_width;
        self.resolved_for = None;
        self
    }

    pub fn with_font_size(mut self, font_size: f32) -> Self {
        self.font_size = font_size;
        self.resolved_for = None;
        self
    }

    pub fn flexible_column(&self) -> ColumnKey {
        self.flexible
    }

    /// Widths for `spec` sized against `sample`, served from cache when
    /// neither input changed since the last call.
    pub fn resolve(&mut self, spec: &ColumnSpec, sample: &Record) -> &ColumnWidths {
        let stale = match &self.resolved_for {
            Some((cached_spec, cached_sample)) => cached_spec != spec || cached_sample != sample,
            None => true,
        };

        if stale {
            self.widths = self.compute(spec, sample);
            self.resolved_for = Some((spec.clone(), sample.clone()));
        }
        &self.widths
    }

    /// The most recent resolution
    pub fn current(&self) -> &ColumnWidths {
        &self.widths
    }

    /// Drop the cached result so the next `resolve` recomputes
    pub fn invalidate(&mut self) {
        self.resolved_for = None;
    }

    fn compute(&self, spec: &ColumnSpec, sample: &Record) -> ColumnWidths {
        match self.measure_all(spec, sample) {
            Ok(widths) => {
                debug!(target: "grid", "Resolved column widths: {:?}", widths);
                widths
            }
            Err(e) => {
                warn!(target: "grid", "{}; using floor widths", e);
                self.floor_widths(spec)
            }
        }
    }

    fn measure_all(&self, spec: &ColumnSpec, sample: &Record) -> GridResult<ColumnWidths> {
        let header_style = TextStyle::bold(self.font_size);
        let cell_style = TextStyle::regular(self.font_size);

        let mut entries = Vec::with_capacity(spec.len());
        for (key, title) in spec.iter() {
            if key == self.flexible {
                entries.push((key, ColumnWidth::Flexible(1)));
                continue;
            }

            let title_width = self.measurer.measure(title, header_style)?;
            let value_width = self
                .measurer
                .measure(&sample.display_value(key), cell_style)?;
            let content = title_width.max(value_width);

            let width = if key.is_identifier() {
                content
            } else {
                content.max(self.min_width)
            };
            entries.push((key, ColumnWidth::Fixed(width)));
        }
        Ok(ColumnWidths { entries })
    }

    fn floor_widths(&self, spec: &ColumnSpec) -> ColumnWidths {
        ColumnWidths {
            entries: spec
                .keys()
                .map(|key| {
                    let width = if key == self.flexible {
                        ColumnWidth::Flexible(1)
                    } else {
                        ColumnWidth::Fixed(self.min_width)
                    };
                    (key, width)
                })
                .collect(),
        }
    }
}
