//! Configuration loading
//!
//! Reads an optional `config.yaml`. Every field has a default, so an absent
//! file behaves the same as an empty one.

use crate::error::StorageError;
use crate::filter::{SortOrder, TaskFilter};
use crate::kv::{FileKv, KvStore, SqliteKv};
use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

const APP_DIR: &str = "tasklist";
const CONFIG_FILE: &str = "config.yaml";
const SQLITE_FILE: &str = "tasklist.db";

/// Which [`KvStore`] implementation holds the tasks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    File,
    Sqlite,
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "file" => Ok(Backend::File),
            "sqlite" => Ok(Backend::Sqlite),
            other => Err(format!("unknown backend '{}' (expected file, sqlite)", other)),
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::File => write!(f, "file"),
            Backend::Sqlite => write!(f, "sqlite"),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding stored tasks; platform data dir when unset
    pub data_dir: Option<PathBuf>,

    pub backend: Backend,

    /// Filter used by `list` when none is given
    pub default_filter: TaskFilter,

    /// Sort order used by `list` when none is given
    pub default_sort: SortOrder,
}

impl Config {
    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, the platform config file is
    /// used when present, otherwise defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => {
                    debug!("No config file found, using defaults");
                    Ok(Self::default())
                }
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).wrap_err_with(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::parse(&content).wrap_err_with(|| format!("Invalid config file {}", path.display()))?;
        debug!(path = ?path, ?config, "Loaded config");
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).context("Failed to parse YAML")
    }

    /// Resolved data directory
    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::data_dir()
                .map(|dir| dir.join(APP_DIR))
                .ok_or_else(|| eyre!("Could not determine a data directory; set data_dir in the config")),
        }
    }

    /// Open the configured storage backend
    pub fn open_storage(&self) -> Result<Box<dyn KvStore>> {
        let storage: Box<dyn KvStore> = match self.backend {
            Backend::File => Box::new(FileKv::open(self.data_dir()?).map_err(storage_report)?),
            Backend::Sqlite => Box::new(SqliteKv::open(self.data_dir()?.join(SQLITE_FILE)).map_err(storage_report)?),
        };
        debug!(backend = %self.backend, "Opened storage backend");
        Ok(storage)
    }
}

fn storage_report(e: StorageError) -> eyre::Report {
    eyre!(e).wrap_err("Failed to open task storage")
}

/// Platform location of the config file, e.g. `~/.config/tasklist/config.yaml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}
