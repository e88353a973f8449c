use anyhow::{Context, Result};
use crossterm::style::Stylize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use stock_grid::config::config::Config;
use stock_grid::data::record_store::JsonFileStore;
use stock_grid::services::collaborators::{StaticFilePicker, StatusNotifier};
use stock_grid::services::local_backend::LocalBackend;
use stock_grid::ui::grid_controller::{GridController, GridOptions, GridServices};
use stock_grid::ui::text_measure::MonospaceMeasurer;
use stock_grid::ui::tui_app::TuiApp;
use stock_grid::utils::app_paths::AppPaths;
use stock_grid::utils::logging;

#[derive(Debug, Default)]
struct Args {
    import: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    latency: Option<Duration>,
    generate_config: bool,
    help: bool,
}

impl Args {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self> {
        let mut parsed = Args::default();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--import" => {
                    let path = args.next().context("--import needs a CSV path")?;
                    parsed.import = Some(PathBuf::from(path));
                }
                "--data-dir" => {
                    let dir = args.next().context("--data-dir needs a directory")?;
                    parsed.data_dir = Some(PathBuf::from(dir));
                }
                "--latency" => {
                    let ms = args.next().context("--latency needs milliseconds")?;
                    let ms: u64 = ms
                        .parse()
                        .with_context(|| format!("invalid --latency value: {}", ms))?;
                    parsed.latency = Some(Duration::from_millis(ms));
                }
                "--generate-config" => parsed.generate_config = true,
                "--help" | "-h" => parsed.help = true,
                other => anyhow::bail!("unknown argument: {}", other),
            }
        }
        Ok(parsed)
    }
}

fn print_help() {
    println!("{}", "stock-grid - browse, sort and filter stock items".blue().bold());
    println!();
    println!("{}", "Usage:".yellow());
    println!("  stock-grid [OPTIONS]");
    println!();
    println!("{}", "Options:".yellow());
    println!("  {}     - Import a header-less CSV at startup", "--import <csv>".green());
    println!("  {}    - Directory holding stock_items.json", "--data-dir <dir>".green());
    println!("  {}   - Delay every query (demo)", "--latency <ms>".green());
    println!("  {}  - Print a config file with defaults", "--generate-config".green());
    println!();
    println!("{}", "Keys:".yellow());
    println!("  {}  - Scroll", "Up/Down PgUp/PgDn Home/End".green());
    println!("  {}            - Select column", "Left/Right".green());
    println!("  {}                  - Sort by selected column", "s".green());
    println!("  {}                  - Filter selected column", "/".green());
    println!("  {}            - Clear all filters", "Esc Esc".green());
    println!("  {}        - Reload / import / export", "r / i / e".green());
    println!("  {}                  - Reset view", "x".green());
    println!("  {}                  - Quit", "q".green());
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse(std::env::args().skip(1))?;

    if args.help {
        print_help();
        return Ok(());
    }

    if args.generate_config {
        println!("{}", Config::create_default_with_comments());
        return Ok(());
    }

    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Using default config: {:#}", e);
        Config::default()
    });

    let log_dir = AppPaths::log_dir().ok();
    let (_log_buffer, log_path) = logging::init_tracing(&config.logging.level, log_dir.as_deref());
    if let Some(path) = &log_path {
        eprintln!("Logs: {}", path.display());
    }

    let data_dir = match &args.data_dir {
        Some(dir) => AppPaths::resolve_data_dir(Some(dir))?,
        None => AppPaths::resolve_data_dir(config.behavior.data_dir.as_ref())?,
    };
    let store = JsonFileStore::in_dir(&data_dir);
    info!(target: "app", "Record store: {}", store.path().display());

    let mut backend = LocalBackend::new(store, config.behavior.case_insensitive);
    if let Some(latency) = args.latency {
        backend = backend.with_latency(latency);
    }

    let notifier = StatusNotifier::new();
    let services = GridServices::local(
        Arc::new(backend),
        Arc::new(MonospaceMeasurer),
        Arc::new(notifier.clone()),
    );
    let mut grid = GridController::new(services, GridOptions::from(&config));

    match &args.import {
        Some(path) => {
            grid.import_spreadsheet(&StaticFilePicker::new(path.clone()))
                .await;
        }
        None if config.behavior.load_on_start => {
            if !grid.reload_from_storage().await {
                warn!(target: "app", "Starting with an empty grid");
            }
        }
        None => {
            grid.refresh();
        }
    }

    TuiApp::new(grid, notifier, config.columns.font_size)
        .run()
        .await
}
