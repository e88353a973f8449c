pub mod config;
pub mod data;
pub mod error;
pub mod services;
pub mod state;
pub mod ui;
pub mod utils;

pub use error::{GridError, GridResult};
