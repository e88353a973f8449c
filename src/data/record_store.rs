use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::data::record::Record;
use crate::error::{GridError, GridResult};

const STORE_FILE: &str = "stock_items.json";

/// Persists the dataset as a JSON document in the data directory
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Store living in `data_dir/stock_items.json`
    pub fn in_dir(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(STORE_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> GridResult<Vec<Record>> {
        if !self.path.exists() {
            return Err(GridError::ImportFailed(format!(
                "stored data not found at {}",
                self.path.display()
            )));
        }

        let contents = fs::read_to_string(&self.path)
            .map_err(|e| GridError::ImportFailed(e.to_string()))?;
        let rows: Vec<Record> = serde_json::from_str(&contents)
            .map_err(|e| GridError::ImportFailed(format!("corrupt store: {}", e)))?;

        if rows.is_empty() {
            return Err(GridError::ImportFailed("stored data is empty".to_string()));
        }

        debug!(target: "store", "Read {} rows from {}", rows.len(), self.path.display());
        Ok(rows)
    }

    /// Replace the stored rows. Writes to a sibling temp file first so a
    /// failed export never leaves a truncated store behind.
    pub fn save(&self, rows: &[Record]) -> GridResult<String> {
        let export_err = |e: std::io::Error| GridError::ExportFailed(e.to_string());

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(export_err)?;
        }

        let contents = serde_json::to_string_pretty(rows)
            .map_err(|e| GridError::ExportFailed(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, contents).map_err(export_err)?;
        fs::rename(&tmp, &self.path).map_err(export_err)?;

        info!(target: "store", "Exported {} rows to {}", rows.len(), self.path.display());
        Ok(format!(
            "Exported {} rows to {}",
            rows.len(),
            self.path.display()
        ))
    }
}
