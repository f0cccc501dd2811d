use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use stash_store::{LogConfig, SyncMode};

use crate::error::{StashError, StashResult};

/// Configuration for opening a [`Stash`](crate::Stash).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StashConfig {
    /// Log file for durable storage. `None` keeps records in memory only.
    pub path: Option<PathBuf>,
    pub sync_mode: SyncMode,
    /// Rewrite the log down to its live records when opening.
    pub compact_on_open: bool,
    /// Buffer size of the failure reporting channel.
    pub report_capacity: usize,
}

impl Default for StashConfig {
    fn default() -> Self {
        Self {
            path: None,
            sync_mode: SyncMode::default(),
            compact_on_open: true,
            report_capacity: 64,
        }
    }
}

impl StashConfig {
    /// An in-memory store with default settings.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// A durable store logging to `path`, with default settings.
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Parse a configuration from TOML. Missing fields take their defaults.
    pub fn from_toml_str(input: &str) -> StashResult<Self> {
        toml::from_str(input).map_err(|e| StashError::Config(e.to_string()))
    }

    pub(crate) fn log_config(&self) -> LogConfig {
        LogConfig {
            sync_mode: self.sync_mode,
            compact_on_open: self.compact_on_open,
        }
    }
}
