//! State management components
//!
//! The sort/filter controller is the only place query criteria change; the
//! grid controller owns it.

pub mod sort_filter;

pub use sort_filter::{StateChange, StateController};
