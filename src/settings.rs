//! User settings read from `config.toml` in the platform config directory.
//!
//! Keys may be overridden with `PROMPTION_<KEY>` environment variables.

use std::fs;
use std::path::{Path, PathBuf};

use ::config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::export::Target;

pub const APP_DIR: &str = "promption";
pub const CONFIG_FILE: &str = "config.toml";
pub const DB_FILE: &str = "promption.db";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Database file. Defaults to `promption.db` next to the config file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db: Option<PathBuf>,

    /// Tool that `sync` writes for when `--target` is not given.
    #[serde(default)]
    pub default_target: Target,

    /// Directory that `export` and the TUI export action write to when no
    /// directory is given. Defaults to the current directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_dir: Option<PathBuf>,
}

/// `<platform config dir>/promption`.
pub fn app_dir() -> Result<PathBuf> {
    let base = dirs::config_dir()
        .ok_or_else(|| ConfigError::Message("could not determine config directory".into()))?;
    Ok(base.join(APP_DIR))
}

pub fn config_path() -> Result<PathBuf> {
    Ok(app_dir()?.join(CONFIG_FILE))
}

impl Settings {
    /// Load from the default location. A missing file yields defaults.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading settings");
        let settings = Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml).required(false))
            .add_source(Environment::with_prefix("PROMPTION"))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    /// Write these settings to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let text = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Message(format!("failed to serialize settings: {e}")))?;
        fs::write(path, text)?;
        Ok(())
    }

    /// Write the default settings to `path` unless a file is already there.
    /// Returns whether a file was written.
    pub fn init_at(path: &Path) -> Result<bool> {
        if path.exists() {
            return Ok(false);
        }
        Self::default().save_to(path)?;
        Ok(true)
    }

    /// Configured database path, or the default one in the app directory.
    pub fn db_path(&self) -> Result<PathBuf> {
        match &self.db {
            Some(path) => Ok(path.clone()),
            None => Ok(app_dir()?.join(DB_FILE)),
        }
    }

    pub fn export_dir(&self) -> PathBuf {
        self.export_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}
