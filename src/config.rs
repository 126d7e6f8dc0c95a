use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub const DB_ENV_VAR: &str = "EDUFORGE_DB";
const DEFAULT_DB_NAME: &str = "eduforge.db";
const CONFIG_FILE_NAME: &str = "config.toml";
const DEFAULT_LOG_LEVEL: &str = "warn";

/// Settings read from `<config_dir>/eduforge/config.toml`. Every field is
/// optional; a missing file means defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub database_path: Option<PathBuf>,
    pub log_level: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(app_dir().join(CONFIG_FILE_NAME))
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// `EDUFORGE_DB`, then the config file, then the default location.
    pub fn db_path(&self) -> PathBuf {
        if let Ok(path) = std::env::var(DB_ENV_VAR) {
            if !path.is_empty() {
                return PathBuf::from(path);
            }
        }
        if let Some(path) = &self.database_path {
            return path.clone();
        }

        let dir = app_dir();
        fs::create_dir_all(&dir).ok();
        dir.join(DEFAULT_DB_NAME)
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }
}

fn app_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("eduforge")
}
