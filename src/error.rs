use thiserror::Error;

/// Errors raised by the grid engine and its collaborators.
///
/// None of these terminate the process. `InvalidColumn` signals misuse by the
/// calling code; everything else degrades to "keep the last good view and
/// notify the user".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    /// A column key outside the fixed column set was used
    #[error("invalid column: {0}")]
    InvalidColumn(String),

    /// The query gateway failed to produce a result
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Rows could not be loaded from storage or a spreadsheet
    #[error("import failed: {0}")]
    ImportFailed(String),

    /// Rows could not be persisted
    #[error("export failed: {0}")]
    ExportFailed(String),

    /// The text measurement service cannot be used
    #[error("text measurement unavailable: {0}")]
    MeasurementUnavailable(String),
}

impl GridError {
    /// Fold any error into a `QueryFailed`, keeping an existing one as is
    pub fn into_query_failure(self) -> Self {
        match self {
            GridError::QueryFailed(_) => self,
            other => GridError::QueryFailed(other.to_string()),
        }
    }
}

pub type GridResult<T> = std::result::Result<T, GridError>;
