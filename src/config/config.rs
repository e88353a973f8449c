use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::data::record::ColumnKey;
use crate::services::synchronizer::DEFAULT_QUIESCENCE_MS;
use crate::ui::column_widths::{DEFAULT_FONT_SIZE, DEFAULT_MIN_COLUMN_WIDTH};
use crate::ui::gesture::DEFAULT_DOUBLE_PRESS_MS;
use crate::ui::virtualizer::DEFAULT_OVERSCAN;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub grid: GridConfig,
    pub columns: ColumnConfig,
    pub behavior: BehaviorConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Quiet period after the last sort/filter change before querying
    pub quiescence_ms: u64,

    /// Rows realized beyond each edge of the viewport
    pub overscan: usize,

    /// Estimated row height in px
    pub row_height: f64,

    /// Window for a double press of the reset key
    pub double_press_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    /// Floor for measured columns, in px
    pub min_width: f32,

    /// Column that absorbs leftover width
    pub flexible_column: ColumnKey,

    /// Font size used for text measurement, in px
    pub font_size: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Match filter patterns regardless of case
    pub case_insensitive: bool,

    /// Where stored rows live (defaults to the platform data directory)
    pub data_dir: Option<PathBuf>,

    /// Load stored rows when the application starts
    pub load_on_start: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence
    pub level: String,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            quiescence_ms: DEFAULT_QUIESCENCE_MS,
            overscan: DEFAULT_OVERSCAN,
            row_height: 16.0,
            double_press_ms: DEFAULT_DOUBLE_PRESS_MS,
        }
    }
}

impl GridConfig {
    pub fn quiescence(&self) -> Duration {
        Duration::from_millis(self.quiescence_ms)
    }

    pub fn double_press_window(&self) -> Duration {
        Duration::from_millis(self.double_press_ms)
    }
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            min_width: DEFAULT_MIN_COLUMN_WIDTH,
            flexible_column: ColumnKey::Name,
            font_size: DEFAULT_FONT_SIZE,
        }
    }
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            case_insensitive: true,
            data_dir: None,
            load_on_start: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load config from the default location, writing defaults on first run
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        if !config_path.exists() {
            let default_config = Self::default();
            default_config.save()?;
            return Ok(default_config);
        }

        let contents = fs::read_to_string(&config_path)
            .with_context(|| format!("reading {}", config_path.display()))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(contents)?;

        // The identifier column is never flexible
        if config.columns.flexible_column.is_identifier() {
            config.columns.flexible_column = ColumnKey::Name;
        }
        Ok(config)
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(&config_path, contents)?;

        Ok(())
    }

    /// Get the default config file path
    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("stock-grid").join("config.toml"))
    }

    /// Create a default config file with comments
    pub fn create_default_with_comments() -> String {
        r#"# stock-grid configuration
# Location: ~/.config/stock-grid/config.toml (Linux)
#           ~/Library/Application Support/stock-grid/config.toml (macOS)
#           %APPDATA%\stock-grid\config.toml (Windows)

[grid]
# Milliseconds without sort/filter changes before a query is sent
quiescence_ms = 200

# Extra rows kept above and below the visible ones
overscan = 10

# Estimated row height in px
row_height = 16.0

# Two presses of Esc within this many milliseconds clear all filters
double_press_ms = 400

[columns]
# Minimum width of measured columns in px
min_width = 120.0

# Column that takes the remaining width:
# code, name, brand, car_type, price, price_code, date, quantity
flexible_column = "name"

# Font size used to measure headers and values, in px
font_size = 16.0

[behavior]
# Match filters regardless of case
case_insensitive = true

# Directory holding stock_items.json (leave commented for the default)
# data_dir = "/path/to/data"

# Load stored rows at startup
load_on_start = true

[logging]
# Log filter; RUST_LOG overrides it
level = "info"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.grid.quiescence(), Duration::from_millis(200));
        assert_eq!(config.grid.overscan, 10);
        assert_eq!(config.columns.min_width, 120.0);
        assert_eq!(config.columns.flexible_column, ColumnKey::Name);
        assert!(config.behavior.case_insensitive);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed = Config::from_toml(&toml_str).unwrap();
        assert_eq!(config.grid.double_press_ms, parsed.grid.double_press_ms);
        assert_eq!(config.columns.flexible_column, parsed.columns.flexible_column);
    }

    #[test]
    fn test_commented_default_parses() {
        let config = Config::from_toml(&Config::create_default_with_comments()).unwrap();
        assert_eq!(config.grid.quiescence_ms, 200);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_file_and_identifier_flexible() {
        let config = Config::from_toml("[columns]\nflexible_column = \"id\"\n").unwrap();
        assert_eq!(config.columns.flexible_column, ColumnKey::Name);
        assert_eq!(config.grid.overscan, 10);

        let config = Config::from_toml("[grid]\noverscan = 3\n").unwrap();
        assert_eq!(config.grid.overscan, 3);
        assert_eq!(config.grid.quiescence_ms, 200);
    }
}
