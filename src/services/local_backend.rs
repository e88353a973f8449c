use async_trait::async_trait;
use std::path::Path;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{debug, info};

use crate::data::csv_loader::CsvImporter;
use crate::data::query_engine::QueryEngine;
use crate::data::query_state::QueryState;
use crate::data::record::Record;
use crate::data::record_store::JsonFileStore;
use crate::error::{GridError, GridResult};
use crate::services::gateway::{QueryGateway, RecordSource};

/// Dataset snapshot shared with in-flight queries
#[derive(Debug, Default)]
struct Dataset {
    rows: Arc<Vec<Record>>,
    sample: Record,
}

/// In-process query backend over a dataset loaded from storage or a
/// spreadsheet.
///
/// Queries run on the blocking pool against an immutable snapshot, so a
/// dataset replacement never races an executing query.
pub struct LocalBackend {
    dataset: RwLock<Dataset>,
    store: JsonFileStore,
    engine: QueryEngine,
    latency: Duration,
}

impl LocalBackend {
    pub fn new(store: JsonFileStore, case_insensitive: bool) -> Self {
        Self {
            dataset: RwLock::new(Dataset::default()),
            store,
            engine: QueryEngine::with_case_insensitive(case_insensitive),
            latency: Duration::ZERO,
        }
    }

    /// Delay every query, to exercise the grid against a slow source
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Seed the dataset directly
    pub fn with_rows(self, rows: Vec<Record>) -> Self {
        if let Ok(mut dataset) = self.dataset.write() {
            *dataset = Dataset::from_rows(rows);
        }
        self
    }

    fn snapshot(&self) -> GridResult<Arc<Vec<Record>>> {
        self.dataset
            .read()
            .map(|dataset| dataset.rows.clone())
            .map_err(|_| GridError::QueryFailed("dataset lock poisoned".to_string()))
    }

    fn install(&self, rows: Vec<Record>) -> GridResult<Vec<Record>> {
        let mut dataset = self
            .dataset
            .write()
            .map_err(|_| GridError::ImportFailed("dataset lock poisoned".to_string()))?;
        *dataset = Dataset::from_rows(rows);
        info!(target: "store", "Dataset replaced with {} rows", dataset.rows.len());
        Ok(dataset.rows.as_ref().clone())
    }
}

impl Dataset {
    fn from_rows(rows: Vec<Record>) -> Self {
        let mut sample = Record::widest_of(&rows);
        // Results are renumbered, so the widest id shown is the last index
        sample.id = rows.len().saturating_sub(1) as i64;
        Self {
            rows: Arc::new(rows),
            sample,
        }
    }
}

#[async_trait]
impl QueryGateway for LocalBackend {
    async fn query_rows(&self, query: &QueryState) -> GridResult<Vec<Record>> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let rows = self.snapshot()?;
        let engine = self.engine;
        let query = query.clone();
        tokio::task::spawn_blocking(move || engine.execute(&rows, &query))
            .await
            .map_err(|e| GridError::QueryFailed(e.to_string()))
    }

    async fn column_sample(&self) -> GridResult<Record> {
        self.dataset
            .read()
            .map(|dataset| dataset.sample.clone())
            .map_err(|_| GridError::QueryFailed("dataset lock poisoned".to_string()))
    }

    async fn total_count(&self) -> GridResult<usize> {
        Ok(self.snapshot()?.len())
    }
}

#[async_trait]
impl RecordSource for LocalBackend {
    async fn load_stored_rows(&self) -> GridResult<Vec<Record>> {
        let store = self.store.clone();
        let rows = tokio::task::spawn_blocking(move || store.load())
            .await
            .map_err(|e| GridError::ImportFailed(e.to_string()))??;
        self.install(rows)
    }

    async fn load_from_spreadsheet(&self, path: &Path) -> GridResult<Vec<Record>> {
        let path = path.to_path_buf();
        let rows = tokio::task::spawn_blocking(move || CsvImporter::load_file(path))
            .await
            .map_err(|e| GridError::ImportFailed(e.to_string()))??;
        self.install(rows)
    }

    async fn export_to_storage(&self) -> GridResult<String> {
        let rows = self
            .snapshot()
            .map_err(|e| GridError::ExportFailed(e.to_string()))?;
        debug!(target: "store", "Exporting {} rows", rows.len());
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.save(&rows))
            .await
            .map_err(|e| GridError::ExportFailed(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::record::ColumnKey;
    use crate::state::sort_filter::StateController;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn backend(dir: &TempDir) -> LocalBackend {
        LocalBackend::new(JsonFileStore::in_dir(dir.path()), true)
    }

    #[tokio::test]
    async fn test_spreadsheet_import_replaces_dataset() {
        let dir = TempDir::new().unwrap();
        let backend = backend(&dir).with_rows(vec![Record::default()]);

        let mut csv = NamedTempFile::new().unwrap();
        writeln!(csv, "BUSI-1,BUSI IRIDIUM,NGK,JAZZ,\"85,000\",AA,2024-03-03,25").unwrap();
        writeln!(csv, "KMP-9,KAMPAS REM DEPAN,AISIN,INNOVA,320000,BC,2024-03-05,8").unwrap();

        let rows = backend.load_from_spreadsheet(csv.path()).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(backend.total_count().await.unwrap(), 2);
        assert_eq!(
            backend.column_sample().await.unwrap().name,
            "KAMPAS REM DEPAN"
        );
    }

    #[tokio::test]
    async fn test_failed_import_keeps_dataset() {
        let dir = TempDir::new().unwrap();
        let backend = backend(&dir).with_rows(vec![Record::default(); 3]);

        let result = backend
            .load_from_spreadsheet(&dir.path().join("missing.csv"))
            .await;
        assert!(matches!(result, Err(GridError::ImportFailed(_))));
        assert_eq!(backend.total_count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_export_then_reload() {
        let dir = TempDir::new().unwrap();
        let rows = vec![
            Record {
                id: 0,
                code: "A".into(),
                ..Default::default()
            },
            Record {
                id: 1,
                code: "B".into(),
                ..Default::default()
            },
        ];
        let backend = backend(&dir).with_rows(rows.clone());
        backend.export_to_storage().await.unwrap();

        let fresh = LocalBackend::new(JsonFileStore::in_dir(dir.path()), true);
        assert_eq!(fresh.load_stored_rows().await.unwrap(), rows);
        assert_eq!(fresh.total_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_query_uses_current_state() {
        let dir = TempDir::new().unwrap();
        let backend = backend(&dir).with_rows(vec![
            Record {
                code: "X-2".into(),
                brand: "DENSO".into(),
                ..Default::default()
            },
            Record {
                code: "X-1".into(),
                brand: "BOSCH".into(),
                ..Default::default()
            },
        ]);

        let mut controller = StateController::new();
        controller.set_sort("code").unwrap();
        let rows = backend.query_rows(&controller.snapshot()).await.unwrap();
        assert_eq!(rows[0].code, "X-1");

        controller.set_filter("brand", "den").unwrap();
        let rows = backend.query_rows(&controller.snapshot()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].display_value(ColumnKey::Brand), "DENSO");
    }
}
