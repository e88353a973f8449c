use ratatui::text::Span;

use crate::error::{GridError, GridResult};

/// Width of a monospace cell relative to the font size
const CELL_ASPECT: f32 = 0.5;

/// Style a piece of text is measured in
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub font_size: f32,
    pub bold: bool,
}

impl TextStyle {
    pub fn regular(font_size: f32) -> Self {
        Self {
            font_size,
            bold: false,
        }
    }

    pub fn bold(font_size: f32) -> Self {
        Self {
            font_size,
            bold: true,
        }
    }
}

/// Returns the rendered pixel width of a string
pub trait TextMeasurer: Send + Sync {
    fn measure(&self, text: &str, style: TextStyle) -> GridResult<f32>;
}

/// Measures text as laid out on a monospace grid such as a terminal.
///
/// Each display column (wide glyphs count twice) is `font_size * 0.5` px.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonospaceMeasurer;

impl MonospaceMeasurer {
    /// Pixel width of one display column at `font_size`
    pub fn cell_width(font_size: f32) -> f32 {
        font_size * CELL_ASPECT
    }
}

impl TextMeasurer for MonospaceMeasurer {
    fn measure(&self, text: &str, style: TextStyle) -> GridResult<f32> {
        if !(style.font_size.is_finite() && style.font_size > 0.0) {
            return Err(GridError::MeasurementUnavailable(format!(
                "unusable font size {}",
                style.font_size
            )));
        }
        let columns = Span::raw(text).width() as f32;
        Ok(columns * Self::cell_width(style.font_size))
    }
}
