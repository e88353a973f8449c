use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use stock_grid::data::query_state::QueryState;
use stock_grid::data::record::{ColumnKey, Record};
use stock_grid::error::{GridError, GridResult};
use stock_grid::services::collaborators::{NotificationKind, StatusNotifier};
use stock_grid::data::record_store::JsonFileStore;
use stock_grid::services::gateway::{QueryGateway, RecordSource};
use stock_grid::services::local_backend::LocalBackend;
use stock_grid::state::sort_filter::StateChange;
use stock_grid::ui::column_widths::ColumnWidth;
use stock_grid::ui::grid_controller::{GridController, GridOptions, GridServices, GridStatus};
use stock_grid::ui::text_measure::{MonospaceMeasurer, TextMeasurer, TextStyle};

const ROWS: usize = 500;

/// Answers every query with `ROWS` rows tagged by the name filter
#[derive(Default)]
struct TaggingGateway {
    calls: Mutex<Vec<QueryState>>,
    delays: Mutex<VecDeque<Duration>>,
}

impl TaggingGateway {
    fn with_delays(delays: &[u64]) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            delays: Mutex::new(delays.iter().map(|ms| Duration::from_millis(*ms)).collect()),
        }
    }

    fn calls(&self) -> Vec<QueryState> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryGateway for TaggingGateway {
    async fn query_rows(&self, query: &QueryState) -> GridResult<Vec<Record>> {
        let delay = {
            self.calls.lock().unwrap().push(query.clone());
            self.delays.lock().unwrap().pop_front().unwrap_or_default()
        };
        tokio::time::sleep(delay).await;

        if query.filter.pattern(ColumnKey::Brand) == "FAIL" {
            return Err(GridError::QueryFailed("gateway unreachable".into()));
        }
        let tag = query.filter.pattern(ColumnKey::Name).to_string();
        Ok((1..=ROWS)
            .map(|i| Record {
                id: i as i64,
                code: format!("P-{i:05}"),
                name: tag.clone(),
                ..Record::default()
            })
            .collect())
    }

    async fn column_sample(&self) -> GridResult<Record> {
        Ok(Record {
            id: ROWS as i64,
            code: "A-VERY-LONG-PART-CODE-0001".into(),
            brand: "BOSCH".into(),
            ..Record::default()
        })
    }

    async fn total_count(&self) -> GridResult<usize> {
        Ok(10_000)
    }
}

/// Storage that is never available
struct OfflineStorage;

#[async_trait]
impl RecordSource for OfflineStorage {
    async fn load_stored_rows(&self) -> GridResult<Vec<Record>> {
        Err(GridError::ImportFailed("no stored rows".into()))
    }

    async fn load_from_spreadsheet(&self, path: &Path) -> GridResult<Vec<Record>> {
        Err(GridError::ImportFailed(format!("{} unreadable", path.display())))
    }

    async fn export_to_storage(&self) -> GridResult<String> {
        Err(GridError::ExportFailed("read-only".into()))
    }
}

fn grid_with(gateway: Arc<TaggingGateway>) -> (GridController, StatusNotifier) {
    let notifier = StatusNotifier::new();
    let services = GridServices {
        gateway,
        records: Arc::new(OfflineStorage),
        measurer: Arc::new(MonospaceMeasurer),
        notifier: Arc::new(notifier.clone()),
    };
    let mut grid = GridController::new(services, GridOptions::default());
    // 20 rows of 16px
    grid.resize(1_200.0, 320.0);
    (grid, notifier)
}

#[tokio::test(start_paused = true)]
async fn test_initial_refresh_populates_view_model() {
    let gateway = Arc::new(TaggingGateway::default());
    let (mut grid, _) = grid_with(gateway);

    grid.refresh();
    assert_eq!(grid.status(), GridStatus::Loading);
    assert_eq!(grid.recv_sync().await, Some(true));
    assert_eq!(grid.status(), GridStatus::Idle);

    let view = grid.view_model();
    assert_eq!(view.total_count, 10_000);
    assert_eq!(view.filtered_count, ROWS);
    assert_eq!(view.total_extent, ROWS as f64 * 16.0);
    // 20 visible + 10 overscan below
    assert_eq!(view.visible_rows.len(), 30);
    assert_eq!(view.visible_rows[3].offset, 48.0);

    // Widths follow the sample: the long code beats the floor, brand does not
    match view.column_widths.get(ColumnKey::Code) {
        Some(ColumnWidth::Fixed(px)) => assert!(px > 120.0),
        other => panic!("unexpected code width {other:?}"),
    }
    assert_eq!(
        view.column_widths.get(ColumnKey::Brand),
        Some(ColumnWidth::Fixed(120.0))
    );
    assert_eq!(
        view.column_widths.get(ColumnKey::Name),
        Some(ColumnWidth::Flexible(1))
    );
}

#[tokio::test(start_paused = true)]
async fn test_slow_stale_response_does_not_overwrite_newer() {
    let gateway = Arc::new(TaggingGateway::with_delays(&[500, 10]));
    let (mut grid, _) = grid_with(gateway.clone());

    grid.set_filter("name", "OLD").unwrap();
    tokio::time::sleep(Duration::from_millis(250)).await;
    grid.set_filter("name", "NEW").unwrap();

    assert_eq!(grid.recv_sync().await, Some(true));
    assert_eq!(grid.view_model().visible_rows[0].record.name, "NEW");

    // The slow first request lands afterwards and is dropped
    assert_eq!(grid.recv_sync().await, Some(false));
    let view = grid.view_model();
    assert_eq!(view.visible_rows[0].record.name, "NEW");
    assert_eq!(view.filter_state.pattern(ColumnKey::Name), "NEW");
    assert_eq!(gateway.calls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_failed_query_keeps_previous_window() {
    let gateway = Arc::new(TaggingGateway::default());
    let (mut grid, notifier) = grid_with(gateway);

    grid.set_filter("name", "KEEP").unwrap();
    grid.recv_sync().await;
    grid.scroll_to(800.0);

    grid.set_filter("brand", "FAIL").unwrap();
    assert_eq!(grid.recv_sync().await, Some(true));

    let view = grid.view_model();
    assert_eq!(view.filtered_count, ROWS);
    assert_eq!(view.scroll_offset, 800.0);
    assert_eq!(view.visible_rows[0].record.name, "KEEP");
    assert!(matches!(view.status, GridStatus::Failed(ref m) if m.contains("gateway unreachable")));
    assert_eq!(
        notifier.last().map(|(kind, _)| kind),
        Some(NotificationKind::Error)
    );

    // A later success clears the failure
    grid.set_filter("brand", "").unwrap();
    grid.recv_sync().await;
    assert_eq!(grid.status(), GridStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_clear_filters_issues_cleared_query() {
    let gateway = Arc::new(TaggingGateway::default());
    let (mut grid, _) = grid_with(gateway.clone());

    grid.set_filter("name", "foo").unwrap();
    assert_eq!(grid.clear_filters(), StateChange::Changed);
    grid.recv_sync().await;

    let calls = gateway.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].filter.entries().all(|(_, pattern)| pattern.is_empty()));
    assert!(grid.view_model().filter_state.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_double_press_clears_filters() {
    let gateway = Arc::new(TaggingGateway::default());
    let (mut grid, _) = grid_with(gateway.clone());

    grid.set_filter("code", "P-0").unwrap();
    grid.recv_sync().await;

    let t0 = Instant::now();
    assert!(!grid.press_reset_key_at(t0));
    assert!(!grid.state().filter().is_empty());
    assert!(grid.press_reset_key_at(t0 + Duration::from_millis(300)));
    assert!(grid.state().filter().is_empty());

    grid.recv_sync().await;
    let last = gateway.calls().pop().unwrap();
    assert!(last.filter.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_identifier_changes_never_reach_gateway() {
    let gateway = Arc::new(TaggingGateway::default());
    let (mut grid, _) = grid_with(gateway.clone());

    assert_eq!(grid.set_sort("id").unwrap(), StateChange::Ignored);
    assert_eq!(grid.set_filter("id", "x").unwrap(), StateChange::Ignored);
    assert!(grid.set_sort("colour").is_err());

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(gateway.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_scrolling_moves_window_with_overscan() {
    let gateway = Arc::new(TaggingGateway::default());
    let (mut grid, _) = grid_with(gateway);
    grid.refresh();
    grid.recv_sync().await;

    assert!(grid.scroll_to(100.0 * 16.0));
    let view = grid.view_model();
    let first = view.visible_rows.first().unwrap();
    let last = view.visible_rows.last().unwrap();
    assert_eq!((first.index, last.index), (90, 129));
    assert!(view.visible_rows.len() <= 20 + 2 * 10 + 1);

    // Past the end clamps to the last page
    grid.scroll_to(1.0e9);
    let view = grid.view_model();
    assert_eq!(view.scroll_offset, (ROWS as f64 - 20.0) * 16.0);
    assert_eq!(view.visible_rows.last().unwrap().index, ROWS - 1);
}

#[tokio::test(start_paused = true)]
async fn test_storage_failures_notify_without_touching_grid() {
    let gateway = Arc::new(TaggingGateway::default());
    let (mut grid, notifier) = grid_with(gateway.clone());
    grid.refresh();
    grid.recv_sync().await;

    assert!(!grid.reload_from_storage().await);
    assert_eq!(
        notifier.last(),
        Some((
            NotificationKind::Error,
            "import failed: no stored rows".to_string()
        ))
    );

    assert!(!grid.export_to_storage().await);
    assert_eq!(
        notifier.last(),
        Some((NotificationKind::Error, "export failed: read-only".to_string()))
    );

    assert_eq!(grid.view_model().filtered_count, ROWS);
    assert_eq!(gateway.calls().len(), 1);
}

#[tokio::test]
async fn test_identifier_column_fits_largest_row_number() {
    let dir = tempfile::TempDir::new().unwrap();
    // Stored ids are all zero; the grid shows renumbered ones
    let backend = Arc::new(
        LocalBackend::new(JsonFileStore::in_dir(dir.path()), true)
            .with_rows(vec![Record::default(); 1_000]),
    );
    let options = GridOptions::default();
    let font_size = options.font_size;
    let services = GridServices::local(
        backend,
        Arc::new(MonospaceMeasurer),
        Arc::new(StatusNotifier::new()),
    );
    let mut grid = GridController::new(services, options);
    grid.resize(1_200.0, 320.0);
    grid.refresh();
    assert_eq!(grid.recv_sync().await, Some(true));

    grid.scroll_to(1.0e9);
    let view = grid.view_model();
    let largest = view
        .visible_rows
        .iter()
        .map(|row| row.record.id)
        .max()
        .unwrap();
    assert_eq!(largest, 999);

    let needed = MonospaceMeasurer
        .measure(&largest.to_string(), TextStyle::regular(font_size))
        .unwrap();
    match view.column_widths.get(ColumnKey::Id) {
        Some(ColumnWidth::Fixed(px)) => assert!(px >= needed, "{px} < {needed}"),
        other => panic!("unexpected id width {other:?}"),
    }
}
