//! Configuration loading
//!
//! Settings resolve in priority order:
//! 1. Command-line argument (highest priority, applied by the binary)
//! 2. Environment variable (`NDB_*`, applied by the binary)
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing config file is not an error. A config file that exists but does
//! not parse is.

use crate::db::init::DEFAULT_BUSY_TIMEOUT_MS;
use crate::sharing::Visibility;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "NDB_CONFIG";

/// Reconciliation settings loaded from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Database file of each store
    #[serde(default)]
    pub stores: StorePaths,

    /// Minimum visibility a Sample or Neuron needs to be searchable
    #[serde(default)]
    pub visibility: Visibility,

    /// Rewrite every qualifying record even when timestamps are unchanged
    #[serde(default)]
    pub force_update: bool,

    /// Number of chunks tracing sync is split into (processed concurrently)
    #[serde(default = "default_tracing_chunk_count")]
    pub tracing_chunk_count: usize,

    /// Rows per node bulk-copy window
    #[serde(default = "default_node_batch_size")]
    pub node_batch_size: usize,

    /// Rows per compartment content insert batch
    #[serde(default = "default_content_batch_size")]
    pub content_batch_size: usize,

    /// Upper bound on retrying a destination write blocked by a lock
    #[serde(default = "default_max_lock_wait_ms")]
    pub max_lock_wait_ms: u64,

    /// SQLite busy timeout applied to every connection
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Delete search samples that no longer qualify
    #[serde(default)]
    pub prune_samples: bool,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database file per store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorePaths {
    #[serde(default = "default_sample_path")]
    pub sample: PathBuf,
    #[serde(default = "default_raw_tracing_path")]
    pub raw_tracing: PathBuf,
    #[serde(default = "default_registered_tracing_path")]
    pub registered_tracing: PathBuf,
    #[serde(default = "default_search_path")]
    pub search: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            stores: StorePaths::default(),
            visibility: Visibility::default(),
            force_update: false,
            tracing_chunk_count: default_tracing_chunk_count(),
            node_batch_size: default_node_batch_size(),
            content_batch_size: default_content_batch_size(),
            max_lock_wait_ms: default_max_lock_wait_ms(),
            busy_timeout_ms: default_busy_timeout_ms(),
            prune_samples: false,
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for StorePaths {
    fn default() -> Self {
        Self {
            sample: default_sample_path(),
            raw_tracing: default_raw_tracing_path(),
            registered_tracing: default_registered_tracing_path(),
            search: default_search_path(),
        }
    }
}

impl StorePaths {
    /// All four stores as files inside one directory
    pub fn in_directory(dir: &Path) -> Self {
        Self {
            sample: dir.join("sample.db"),
            raw_tracing: dir.join("swc.db"),
            registered_tracing: dir.join("transform.db"),
            search: dir.join("search.db"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl SyncConfig {
    /// Reject settings that would make a run meaningless
    pub fn validate(&self) -> Result<()> {
        if self.node_batch_size == 0 {
            return Err(Error::Config("node_batch_size must be greater than zero".to_string()));
        }
        if self.content_batch_size == 0 {
            return Err(Error::Config("content_batch_size must be greater than zero".to_string()));
        }
        Ok(())
    }
}

fn default_tracing_chunk_count() -> usize {
    4
}

fn default_node_batch_size() -> usize {
    25_000
}

fn default_content_batch_size() -> usize {
    500
}

fn default_max_lock_wait_ms() -> u64 {
    5000
}

fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_sample_path() -> PathBuf {
    default_data_folder().join("sample.db")
}

fn default_raw_tracing_path() -> PathBuf {
    default_data_folder().join("swc.db")
}

fn default_registered_tracing_path() -> PathBuf {
    default_data_folder().join("transform.db")
}

fn default_search_path() -> PathBuf {
    default_data_folder().join("search.db")
}

/// OS-dependent default folder holding the store files
pub fn default_data_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("ndb"))
        .unwrap_or_else(|| PathBuf::from("./ndb_data"))
}

/// Locate the config file: explicit path, then `NDB_CONFIG`, then the user config dir
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    dirs::config_dir()
        .map(|d| d.join("ndb-sync").join("config.toml"))
        .filter(|path| path.exists())
}

/// Load configuration from a TOML file, falling back to defaults when absent
pub fn load_config(path: Option<&Path>) -> Result<SyncConfig> {
    let Some(path) = path else {
        info!("No config file found, using compiled defaults");
        return Ok(SyncConfig::default());
    };

    if !path.exists() {
        warn!("Config file not found: {} (using compiled defaults)", path.display());
        return Ok(SyncConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: SyncConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
    config.validate()?;

    info!("Loaded config from {}", path.display());
    Ok(config)
}
