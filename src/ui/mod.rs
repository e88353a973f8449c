//! User interface layer
//!
//! The grid engine (controller, virtualizer, column widths, gestures) and the
//! terminal front end built on top of it.

pub mod column_widths;
pub mod gesture;
pub mod grid_controller;
pub mod text_measure;
pub mod tui_app;
pub mod virtualizer;

pub use grid_controller::{GridController, GridOptions, GridServices, GridStatus, GridViewModel};
