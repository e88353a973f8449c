//! Terminal front end for the grid
//!
//! One terminal line per row and `row_height` px per line, so the grid's
//! pixel geometry maps onto cells without rounding drift.

use anyhow::Result;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame, Terminal,
};
use std::io;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tui_input::{backend::crossterm::EventHandler, Input};

use crate::data::query_state::SortDirection;
use crate::data::record::ColumnKey;
use crate::services::collaborators::{
    NotificationKind, Notifier, StaticFilePicker, StatusNotifier,
};
use crate::ui::grid_controller::{GridController, GridStatus};
use crate::ui::text_measure::MonospaceMeasurer;
use crate::utils::logging;

/// Rows moved per mouse wheel notch
const WHEEL_ROWS: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputMode {
    Browse,
    /// Editing the filter of the selected column
    Filter,
    /// Typing the path of a spreadsheet to import
    ImportPath,
}

pub struct TuiApp {
    grid: GridController,
    notifier: StatusNotifier,
    selected_column: usize,
    mode: InputMode,
    input: Input,
    /// Width of one terminal cell in px
    cell_width: f32,
    page_rows: usize,
    should_quit: bool,
}

impl TuiApp {
    pub fn new(grid: GridController, notifier: StatusNotifier, font_size: f32) -> Self {
        Self {
            grid,
            notifier,
            // Skip the identifier column, it cannot be sorted or filtered
            selected_column: 1,
            mode: InputMode::Browse,
            input: Input::default(),
            cell_width: MonospaceMeasurer::cell_width(font_size).max(1.0),
            page_rows: 1,
            should_quit: false,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        enable_raw_mode().map_err(|e| anyhow::anyhow!("Failed to enable raw mode: {}", e))?;

        let mut stdout = io::stdout();
        if let Err(e) = execute!(stdout, EnterAlternateScreen, EnableMouseCapture) {
            let _ = disable_raw_mode();
            return Err(anyhow::anyhow!("Failed to setup terminal: {}", e));
        }

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = match Terminal::new(backend) {
            Ok(t) => t,
            Err(e) => {
                let _ = disable_raw_mode();
                return Err(anyhow::anyhow!("Failed to create terminal: {}", e));
            }
        };

        let res = self.run_app(&mut terminal).await;

        // Always restore terminal, even on error
        let _ = disable_raw_mode();
        let _ = execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        );
        let _ = terminal.show_cursor();

        res.map_err(|e| anyhow::anyhow!("TUI error: {}", e))
    }

    async fn run_app<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        let mut events = spawn_event_reader();
        let mut tick = tokio::time::interval(Duration::from_millis(250));

        while !self.should_quit {
            terminal.draw(|f| self.draw(f))?;

            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => {
                        warn!(target: "input", "Terminal event reader stopped");
                        self.should_quit = true;
                    }
                },
                Some(applied) = self.grid.recv_sync() => {
                    debug!(target: "grid", "Sync event received (applied={})", applied);
                }
                _ = tick.tick() => {}
            }
        }

        info!(target: "app", "Leaving grid");
        Ok(())
    }

    // ========== Input ==========

    async fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => match self.mode {
                InputMode::Browse => self.handle_browse_key(key).await,
                InputMode::Filter => self.handle_filter_key(key),
                InputMode::ImportPath => self.handle_import_key(key).await,
            },
            Event::Mouse(mouse) => {
                let step = WHEEL_ROWS * self.grid.row_height();
                match mouse.kind {
                    MouseEventKind::ScrollDown => {
                        self.grid.scroll_by(step);
                    }
                    MouseEventKind::ScrollUp => {
                        self.grid.scroll_by(-step);
                    }
                    _ => {}
                }
            }
            _ => {}
        }
    }

    async fn handle_browse_key(&mut self, key: KeyEvent) {
        let row = self.grid.row_height();
        let page = self.page_rows as f64 * row;

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Down => {
                self.grid.scroll_by(row);
            }
            KeyCode::Up => {
                self.grid.scroll_by(-row);
            }
            KeyCode::PageDown => {
                self.grid.scroll_by(page);
            }
            KeyCode::PageUp => {
                self.grid.scroll_by(-page);
            }
            KeyCode::Home => {
                self.grid.scroll_to(0.0);
            }
            KeyCode::End => {
                let max = self.grid.max_scroll_offset();
                self.grid.scroll_to(max);
            }
            KeyCode::Left => self.selected_column = self.selected_column.saturating_sub(1),
            KeyCode::Right => {
                self.selected_column = (self.selected_column + 1).min(ColumnKey::ALL.len() - 1)
            }
            KeyCode::Char('s') => {
                let column = self.selected_key();
                if let Err(e) = self.grid.set_sort(column.as_str()) {
                    warn!(target: "input", "Sort rejected: {}", e);
                }
            }
            KeyCode::Char('/') => {
                let column = self.selected_key();
                if column.is_identifier() {
                    self.notifier.notify(
                        NotificationKind::Error,
                        &format!("{} cannot be filtered", column.default_title()),
                    );
                } else {
                    let current = self.grid.state().filter().pattern(column).to_string();
                    self.input = Input::new(current);
                    self.mode = InputMode::Filter;
                }
            }
            KeyCode::Esc => {
                self.grid.press_reset_key();
            }
            KeyCode::Char('r') => {
                self.grid.reload_from_storage().await;
            }
            KeyCode::Char('i') => {
                self.input = Input::default();
                self.mode = InputMode::ImportPath;
            }
            KeyCode::Char('e') => {
                self.grid.export_to_storage().await;
            }
            KeyCode::Char('x') => self.grid.clear_rows(),
            _ => {}
        }
    }

    fn handle_filter_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter | KeyCode::Esc => self.mode = InputMode::Browse,
            _ => {
                let changed = self.input.handle_event(&Event::Key(key));
                if changed.is_some_and(|state| state.value) {
                    let column = self.selected_key();
                    if let Err(e) = self.grid.set_filter(column.as_str(), self.input.value()) {
                        warn!(target: "input", "Filter rejected: {}", e);
                    }
                }
            }
        }
    }

    async fn handle_import_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.mode = InputMode::Browse,
            KeyCode::Enter => {
                self.mode = InputMode::Browse;
                let picker = StaticFilePicker::new(self.input.value().trim());
                self.grid.import_spreadsheet(&picker).await;
            }
            _ => {
                self.input.handle_event(&Event::Key(key));
            }
        }
    }

    fn selected_key(&self) -> ColumnKey {
        ColumnKey::ALL
            .get(self.selected_column)
            .copied()
            .unwrap_or(ColumnKey::Name)
    }

    // ========== Rendering ==========

    fn draw(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(3),    // Grid
                Constraint::Length(1), // Filter / prompt line
                Constraint::Length(1), // Status bar
            ])
            .split(f.area());

        // Borders and the header row are not part of the scrolling body
        let body_rows = chunks[0].height.saturating_sub(3);
        let body_cols = chunks[0].width.saturating_sub(2);
        self.page_rows = usize::from(body_rows.max(1));
        self.grid.resize(
            f32::from(body_cols) * self.cell_width,
            f64::from(body_rows) * self.grid.row_height(),
        );

        self.draw_grid(f, chunks[0], usize::from(body_rows));
        self.draw_prompt(f, chunks[1]);
        self.draw_status(f, chunks[2]);
    }

    fn draw_grid(&self, f: &mut Frame, area: Rect, body_rows: usize) {
        let view = self.grid.view_model();
        let selected = self.selected_key();

        let header = Row::new(view.columns.iter().map(|(key, title)| {
            let mut label = title.to_string();
            if view.sort_state.column == key && !key.is_identifier() {
                label.push_str(match view.sort_state.direction {
                    SortDirection::Ascending => " ▲",
                    SortDirection::Descending => " ▼",
                });
            }
            if !view.filter_state.pattern(key).is_empty() {
                label.push('*');
            }

            let mut style = Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD);
            if key == selected {
                style = style.bg(Color::Rgb(50, 50, 50));
            }
            Cell::from(label).style(style)
        }));

        // The window carries overscan rows; only the ones on screen are drawn
        let row_height = self.grid.row_height();
        let first_on_screen = (view.scroll_offset / row_height).floor() as usize;
        let rows: Vec<Row> = view
            .visible_rows
            .iter()
            .filter(|row| row.index >= first_on_screen)
            .take(body_rows)
            .map(|row| {
                Row::new(view.columns.keys().map(|key| {
                    let cell = Cell::from(row.record.display_value(key));
                    if key == selected {
                        cell.style(Style::default().bg(Color::Rgb(30, 30, 30)))
                    } else {
                        cell
                    }
                }))
            })
            .collect();

        let widths: Vec<Constraint> = view
            .column_widths
            .layout(self.grid.viewport_width())
            .into_iter()
            .map(|(_, px)| Constraint::Length((px / self.cell_width).round() as u16))
            .collect();

        let table = Table::new(rows, widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL).title(format!(
                "Stock ({} of {} rows)",
                view.filtered_count, view.total_count
            )))
            .column_spacing(0);

        f.render_widget(table, area);
    }

    fn draw_prompt(&self, f: &mut Frame, area: Rect) {
        let label = match self.mode {
            InputMode::Browse => {
                let active = self.grid.state().active_filters();
                let text = if active.is_empty() {
                    "No filters  (/ filter, s sort, Esc Esc clear)".to_string()
                } else {
                    active
                        .iter()
                        .map(|(key, pattern)| format!("{}~{}", key.default_title(), pattern))
                        .collect::<Vec<_>>()
                        .join("  ")
                };
                f.render_widget(
                    Paragraph::new(text).style(Style::default().fg(Color::DarkGray)),
                    area,
                );
                return;
            }
            InputMode::Filter => format!("Filter {}: ", self.selected_key().default_title()),
            InputMode::ImportPath => "Import CSV: ".to_string(),
        };

        let prefix = label.chars().count() as u16;
        let scroll = self.input.visual_scroll(area.width.saturating_sub(prefix + 1) as usize);
        let value: String = self.input.value().chars().skip(scroll).collect();
        f.render_widget(
            Paragraph::new(format!("{}{}", label, value))
                .style(Style::default().fg(Color::Yellow)),
            area,
        );

        let cursor = (self.input.visual_cursor().saturating_sub(scroll)) as u16;
        f.set_cursor_position((area.x + prefix + cursor, area.y));
    }

    fn draw_status(&self, f: &mut Frame, area: Rect) {
        let (status_text, status_style) = match self.grid.status() {
            GridStatus::Idle => ("READY".to_string(), Style::default().fg(Color::Green)),
            GridStatus::Loading => ("LOADING".to_string(), Style::default().fg(Color::Yellow)),
            GridStatus::Failed(_) => ("FAILED".to_string(), Style::default().fg(Color::Red)),
        };

        let message = match self.notifier.last() {
            Some((NotificationKind::Error, message)) => format!("✗ {}", message),
            Some((NotificationKind::Success, message)) => format!("✓ {}", message),
            None => logging::get_log_buffer()
                .and_then(|buffer| buffer.get_recent(1).pop())
                .map(|entry| entry.message)
                .unwrap_or_default(),
        };

        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(9), Constraint::Min(0)])
            .split(area);

        f.render_widget(Paragraph::new(status_text).style(status_style), chunks[0]);
        f.render_widget(
            Paragraph::new(format!(
                "{}  |  r reload  i import  e export  x reset  q quit",
                message
            )),
            chunks[1],
        );
    }
}

/// Forward terminal events from a reader thread. The thread stops once the
/// receiver is dropped.
fn spawn_event_reader() -> mpsc::UnboundedReceiver<Event> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        while !tx.is_closed() {
            match event::poll(Duration::from_millis(50)) {
                Ok(true) => match event::read() {
                    Ok(event) => {
                        if tx.send(event).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(target: "input", "Failed to read terminal event: {}", e);
                        break;
                    }
                },
                Ok(false) => {}
                Err(e) => {
                    warn!(target: "input", "Failed to poll terminal: {}", e);
                    break;
                }
            }
        }
    });
    rx
}
