//! Data layer
//!
//! Records and their column set, the sort/filter criteria, and the local
//! pieces that load, query and persist rows.

// Core data modules
pub mod query_state;
pub mod record;

// Loading and persistence
pub mod csv_loader;
pub mod record_store;

// Query execution
pub mod query_engine;
