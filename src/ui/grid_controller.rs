//! Grid controller
//!
//! Single owner of the grid: it routes user intents to the state controller,
//! feeds resulting criteria to the synchronizer, applies query responses in
//! issuance order and exposes a read-only view model for rendering.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::config::Config;
use crate::data::query_state::{FilterState, SortState};
use crate::data::record::{ColumnKey, ColumnSpec, Record};
use crate::error::GridResult;
use crate::services::collaborators::{FilePicker, NotificationKind, Notifier};
use crate::services::gateway::{QueryGateway, RecordSource};
use crate::services::local_backend::LocalBackend;
use crate::services::synchronizer::{QuerySynchronizer, SyncEvent, DEFAULT_QUIESCENCE_MS};
use crate::state::sort_filter::{StateChange, StateController};
use crate::ui::column_widths::{
    ColumnWidthResolver, ColumnWidths, DEFAULT_FONT_SIZE, DEFAULT_MIN_COLUMN_WIDTH,
};
use crate::ui::gesture::{DoublePressDetector, DEFAULT_DOUBLE_PRESS_MS};
use crate::ui::text_measure::TextMeasurer;
use crate::ui::virtualizer::{RowVirtualizer, VirtualWindow, DEFAULT_OVERSCAN};

/// Extensions offered when importing a spreadsheet
pub const SPREADSHEET_EXTENSIONS: &[&str] = &["csv"];

/// Collaborators the grid talks to
#[derive(Clone)]
pub struct GridServices {
    pub gateway: Arc<dyn QueryGateway>,
    pub records: Arc<dyn RecordSource>,
    pub measurer: Arc<dyn TextMeasurer>,
    pub notifier: Arc<dyn Notifier>,
}

impl GridServices {
    /// Wire one in-process backend as both gateway and record source
    pub fn local(
        backend: Arc<LocalBackend>,
        measurer: Arc<dyn TextMeasurer>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            gateway: backend.clone(),
            records: backend,
            measurer,
            notifier,
        }
    }
}

/// Tunables of the grid engine
#[derive(Debug, Clone)]
pub struct GridOptions {
    pub quiescence: Duration,
    pub overscan: usize,
    pub row_height: f64,
    pub double_press: Duration,
    pub min_width: f32,
    pub flexible_column: ColumnKey,
    pub font_size: f32,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            quiescence: Duration::from_millis(DEFAULT_QUIESCENCE_MS),
            overscan: DEFAULT_OVERSCAN,
            row_height: 16.0,
            double_press: Duration::from_millis(DEFAULT_DOUBLE_PRESS_MS),
            min_width: DEFAULT_MIN_COLUMN_WIDTH,
            flexible_column: ColumnKey::Name,
            font_size: DEFAULT_FONT_SIZE,
        }
    }
}

impl From<&Config> for GridOptions {
    fn from(config: &Config) -> Self {
        Self {
            quiescence: config.grid.quiescence(),
            overscan: config.grid.overscan,
            row_height: config.grid.row_height,
            double_press: config.grid.double_press_window(),
            min_width: config.columns.min_width,
            flexible_column: config.columns.flexible_column,
            font_size: config.columns.font_size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridStatus {
    Idle,
    /// A query is scheduled or in flight
    Loading,
    /// The latest query failed; the previous rows are still shown
    Failed(String),
}

/// One realized row
#[derive(Debug, Clone, Copy)]
pub struct VisibleRow<'a> {
    pub index: usize,
    pub offset: f64,
    pub record: &'a Record,
}

/// Everything the presentation layer needs for one frame
#[derive(Debug)]
pub struct GridViewModel<'a> {
    pub columns: &'a ColumnSpec,
    pub column_widths: &'a ColumnWidths,
    pub visible_rows: Vec<VisibleRow<'a>>,
    pub sort_state: SortState,
    pub filter_state: &'a FilterState,
    pub total_count: usize,
    pub filtered_count: usize,
    pub total_extent: f64,
    pub scroll_offset: f64,
    pub status: GridStatus,
}

pub struct GridController {
    state: StateController,
    sync: QuerySynchronizer,
    sync_events: mpsc::UnboundedReceiver<SyncEvent>,
    /// Sequence number of the newest response applied so far
    last_applied: u64,
    last_failure: Option<String>,

    rows: Vec<Record>,
    total_count: usize,
    sample: Record,

    spec: ColumnSpec,
    widths: ColumnWidthResolver,
    virtualizer: RowVirtualizer,
    window: VirtualWindow,

    scroll_offset: f64,
    viewport_width: f32,
    viewport_height: f64,

    reset_gesture: DoublePressDetector,
    records: Arc<dyn RecordSource>,
    notifier: Arc<dyn Notifier>,
}

impl GridController {
    pub fn new(services: GridServices, options: GridOptions) -> Self {
        let (sync, sync_events) = QuerySynchronizer::new(services.gateway, options.quiescence);
        let spec = ColumnSpec::default();
        let sample = Record::default();

        let mut widths = ColumnWidthResolver::new(services.measurer, options.flexible_column)
            .with_min_width(options.min_width)
            .with_font_size(options.font_size);
        widths.resolve(&spec, &sample);

        Self {
            state: StateController::new(),
            sync,
            sync_events,
            last_applied: 0,
            last_failure: None,
            rows: Vec::new(),
            total_count: 0,
            sample,
            spec,
            widths,
            virtualizer: RowVirtualizer::new(options.row_height, options.overscan),
            window: VirtualWindow::default(),
            scroll_offset: 0.0,
            viewport_width: 0.0,
            viewport_height: 0.0,
            reset_gesture: DoublePressDetector::new(options.double_press),
            records: services.records,
            notifier: services.notifier,
        }
    }

    // ========== Sort / filter ==========

    pub fn set_sort(&mut self, column: &str) -> GridResult<StateChange> {
        let change = self.state.set_sort(column)?;
        self.schedule_if_changed(change);
        Ok(change)
    }

    pub fn set_filter(&mut self, column: &str, pattern: &str) -> GridResult<StateChange> {
        let change = self.state.set_filter(column, pattern)?;
        self.schedule_if_changed(change);
        Ok(change)
    }

    pub fn clear_filters(&mut self) -> StateChange {
        let change = self.state.clear_filters();
        self.schedule_if_changed(change);
        change
    }

    /// Press of the reset key; the second press within the double-press
    /// window clears all filters. Returns true when the filters were cleared.
    pub fn press_reset_key(&mut self) -> bool {
        self.press_reset_key_at(Instant::now())
    }

    pub fn press_reset_key_at(&mut self, now: Instant) -> bool {
        if self.reset_gesture.press_at(now) {
            info!(target: "grid", "Reset gesture: clearing filters");
            self.clear_filters();
            true
        } else {
            false
        }
    }

    /// Query the current criteria right away, skipping the quiet period
    pub fn refresh(&mut self) -> u64 {
        self.sync.request_now(self.state.snapshot())
    }

    fn schedule_if_changed(&mut self, change: StateChange) {
        if change.is_changed() {
            self.sync.notify(self.state.snapshot());
        }
    }

    // ========== Synchronization ==========

    /// Apply one completed request. Responses older than the newest applied
    /// one are dropped. Returns true when the event was applied.
    pub fn apply_sync_event(&mut self, event: SyncEvent) -> bool {
        if event.seq <= self.last_applied {
            debug!(
                target: "sync",
                "Dropping stale response #{} (applied #{})",
                event.seq,
                self.last_applied
            );
            return false;
        }
        self.last_applied = event.seq;

        match event.outcome {
            Ok(response) => {
                debug!(
                    target: "sync",
                    "Applying response #{} for {}: {} of {} rows",
                    event.seq,
                    event.query,
                    response.rows.len(),
                    response.total_count
                );
                self.last_failure = None;
                self.rows = response.rows;
                self.total_count = response.total_count;
                self.sample = response.sample;
                self.widths.resolve(&self.spec, &self.sample);
                self.virtualizer.invalidate();
                self.clamp_scroll();
                self.refresh_window();
            }
            Err(e) => {
                warn!(target: "sync", "Query #{} failed: {}", event.seq, e);
                let message = e.to_string();
                self.notifier.notify(NotificationKind::Error, &message);
                self.last_failure = Some(message);
            }
        }
        true
    }

    /// Wait for the next completed request and apply it
    pub async fn recv_sync(&mut self) -> Option<bool> {
        let event = self.sync_events.recv().await?;
        Some(self.apply_sync_event(event))
    }

    /// Apply every completed request without waiting. Returns how many were
    /// applied.
    pub fn drain_sync_events(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.sync_events.try_recv() {
            if self.apply_sync_event(event) {
                applied += 1;
            }
        }
        applied
    }

    pub fn status(&self) -> GridStatus {
        if self.sync.is_pending() || self.sync.last_issued() > self.last_applied {
            GridStatus::Loading
        } else if let Some(message) = &self.last_failure {
            GridStatus::Failed(message.clone())
        } else {
            GridStatus::Idle
        }
    }

    // ========== Storage ==========

    /// Replace the dataset with stored rows and requery
    pub async fn reload_from_storage(&mut self) -> bool {
        match self.records.load_stored_rows().await {
            Ok(rows) => {
                self.notifier.notify(
                    NotificationKind::Success,
                    &format!("Loaded {} rows from storage", rows.len()),
                );
                self.refresh();
                true
            }
            Err(e) => {
                self.notifier.notify(NotificationKind::Error, &e.to_string());
                false
            }
        }
    }

    /// Ask `picker` for a spreadsheet and import it. Cancelling the picker
    /// is not an error and changes nothing.
    pub async fn import_spreadsheet(&mut self, picker: &dyn FilePicker) -> bool {
        let Some(path) = picker.pick_file(SPREADSHEET_EXTENSIONS) else {
            debug!(target: "import", "Import cancelled");
            return false;
        };

        match self.records.load_from_spreadsheet(&path).await {
            Ok(rows) => {
                self.notifier.notify(
                    NotificationKind::Success,
                    &format!("Imported {} rows from {}", rows.len(), path.display()),
                );
                self.refresh();
                true
            }
            Err(e) => {
                self.notifier.notify(NotificationKind::Error, &e.to_string());
                false
            }
        }
    }

    pub async fn export_to_storage(&mut self) -> bool {
        match self.records.export_to_storage().await {
            Ok(message) => {
                self.notifier.notify(NotificationKind::Success, &message);
                true
            }
            Err(e) => {
                self.notifier.notify(NotificationKind::Error, &e.to_string());
                false
            }
        }
    }

    /// Empty the displayed rows. Storage and criteria are left alone; the
    /// next query brings rows back.
    pub fn clear_rows(&mut self) {
        self.rows.clear();
        self.scroll_offset = 0.0;
        self.virtualizer.invalidate();
        self.refresh_window();
        debug!(target: "grid", "Cleared displayed rows");
    }

    // ========== Viewport ==========

    /// Scroll to an absolute offset, clamped to the scrollable range.
    /// Returns true when the realized rows changed.
    pub fn scroll_to(&mut self, offset: f64) -> bool {
        self.scroll_offset = if offset.is_finite() { offset } else { 0.0 };
        self.clamp_scroll();
        self.refresh_window()
    }

    pub fn scroll_by(&mut self, delta: f64) -> bool {
        self.scroll_to(self.scroll_offset + delta)
    }

    pub fn resize(&mut self, width: f32, height: f64) -> bool {
        self.viewport_width = width.max(0.0);
        self.viewport_height = if height.is_finite() { height.max(0.0) } else { 0.0 };
        self.clamp_scroll();
        self.refresh_window()
    }

    fn clamp_scroll(&mut self) {
        let max = self
            .virtualizer
            .max_scroll_offset(self.rows.len(), self.viewport_height);
        self.scroll_offset = self.scroll_offset.clamp(0.0, max);
    }

    fn refresh_window(&mut self) -> bool {
        let (window, changed) =
            self.virtualizer
                .update(self.rows.len(), self.scroll_offset, self.viewport_height);
        self.window = window;
        changed
    }

    // ========== Read access ==========

    pub fn view_model(&self) -> GridViewModel<'_> {
        let visible_rows = self
            .window
            .rows()
            .filter_map(|row| {
                self.rows.get(row.index).map(|record| VisibleRow {
                    index: row.index,
                    offset: row.offset,
                    record,
                })
            })
            .collect();

        GridViewModel {
            columns: &self.spec,
            column_widths: self.widths.current(),
            visible_rows,
            sort_state: self.state.sort(),
            filter_state: self.state.filter(),
            total_count: self.total_count,
            filtered_count: self.rows.len(),
            total_extent: self.window.total_extent,
            scroll_offset: self.scroll_offset,
            status: self.status(),
        }
    }

    pub fn state(&self) -> &StateController {
        &self.state
    }

    pub fn row_height(&self) -> f64 {
        self.virtualizer.row_height()
    }

    pub fn viewport_width(&self) -> f32 {
        self.viewport_width
    }

    pub fn scroll_offset(&self) -> f64 {
        self.scroll_offset
    }

    pub fn max_scroll_offset(&self) -> f64 {
        self.virtualizer
            .max_scroll_offset(self.rows.len(), self.viewport_height)
    }
}
