//! Collaborator contracts for the record store and the query gateway
//!
//! The grid engine only talks to these traits. `LocalBackend` is the
//! in-process implementation shipped with the crate; anything that can
//! answer the same calls (a database, a remote service) can replace it.

use async_trait::async_trait;
use std::path::Path;

use crate::data::query_state::QueryState;
use crate::data::record::Record;
use crate::error::GridResult;

/// Answers sort/filter queries over the current dataset
#[async_trait]
pub trait QueryGateway: Send + Sync {
    /// Rows matching `query.filter`, ordered by `query.sort`
    async fn query_rows(&self, query: &QueryState) -> GridResult<Vec<Record>>;

    /// One representative row used for column sizing
    async fn column_sample(&self) -> GridResult<Record>;

    /// Count of all stored rows, independent of filters
    async fn total_count(&self) -> GridResult<usize>;
}

/// Loads and persists the dataset behind the gateway
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Replace the dataset with the rows in persistent storage
    async fn load_stored_rows(&self) -> GridResult<Vec<Record>>;

    /// Replace the dataset with the rows of a spreadsheet file
    async fn load_from_spreadsheet(&self, path: &Path) -> GridResult<Vec<Record>>;

    /// Persist the current dataset, returning a status message
    async fn export_to_storage(&self) -> GridResult<String>;
}

/// Everything one synchronized query brings back
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResponse {
    pub rows: Vec<Record>,
    pub total_count: usize,
    pub sample: Record,
}

/// Run a full query round trip: rows, then the auxiliary metadata.
/// Any failure is reported as `QueryFailed`.
pub async fn fetch(gateway: &dyn QueryGateway, query: &QueryState) -> GridResult<QueryResponse> {
    let rows = gateway
        .query_rows(query)
        .await
        .map_err(|e| e.into_query_failure())?;
    let total_count = gateway
        .total_count()
        .await
        .map_err(|e| e.into_query_failure())?;
    let sample = gateway
        .column_sample()
        .await
        .map_err(|e| e.into_query_failure())?;

    Ok(QueryResponse {
        rows,
        total_count,
        sample,
    })
}
