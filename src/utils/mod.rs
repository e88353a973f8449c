//! Utility helpers: application paths, logging and deferred tasks

pub mod app_paths;
pub mod deferred;
pub mod logging;
