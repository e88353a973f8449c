use anyhow::{anyhow, Result};
use std::fs;
use std::path::PathBuf;

const APP_DIR: &str = "stock-grid";

pub struct AppPaths;

impl AppPaths {
    /// Where stored rows live unless the config names another directory
    pub fn data_dir() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow!("Cannot determine data directory"))?
            .join(APP_DIR);

        fs::create_dir_all(&data_dir)?;
        Ok(data_dir)
    }

    pub fn log_dir() -> Result<PathBuf> {
        let log_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow!("Cannot determine cache directory"))?
            .join(APP_DIR)
            .join("logs");

        fs::create_dir_all(&log_dir)?;
        Ok(log_dir)
    }

    /// Data directory from config, falling back to the platform default
    pub fn resolve_data_dir(configured: Option<&PathBuf>) -> Result<PathBuf> {
        match configured {
            Some(dir) => {
                fs::create_dir_all(dir)?;
                Ok(dir.clone())
            }
            None => Self::data_dir(),
        }
    }
}
