//! Connection configuration for [`SqliteClient`](crate::SqliteClient).

use crate::error::{OrmError, OrmResult};
use crate::monitor::MonitorConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// SQLite `journal_mode` pragma values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalMode {
    Delete,
    #[default]
    Wal,
    Memory,
    Off,
}

impl JournalMode {
    pub fn as_str(self) -> &'static str {
        match self {
            JournalMode::Delete => "DELETE",
            JournalMode::Wal => "WAL",
            JournalMode::Memory => "MEMORY",
            JournalMode::Off => "OFF",
        }
    }
}

/// Configuration for opening a SQLite connection.
///
/// Durations are read from config files as milliseconds:
///
/// ```json
/// { "path": "app.db", "busy_timeout_ms": 2000, "journal_mode": "wal", "query_timeout_ms": 500 }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SqliteConfig {
    /// Database file. `None` opens a private in-memory database.
    pub path: Option<PathBuf>,
    /// Open the file read-only.
    pub read_only: bool,
    /// How long a statement waits on a locked database before failing.
    pub busy_timeout_ms: u64,
    /// Enforce `FOREIGN KEY` constraints.
    pub foreign_keys: bool,
    /// Journal mode for file databases (ignored in memory).
    pub journal_mode: JournalMode,
    /// Interrupt statements running longer than this.
    pub query_timeout_ms: Option<u64>,
    /// Report statements slower than this to monitors.
    pub slow_query_threshold_ms: Option<u64>,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: None,
            read_only: false,
            busy_timeout_ms: 5_000,
            foreign_keys: true,
            journal_mode: JournalMode::default(),
            query_timeout_ms: None,
            slow_query_threshold_ms: None,
        }
    }
}

impl SqliteConfig {
    /// In-memory database with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// File database with defaults.
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self::default().path(path)
    }

    /// Parse a JSON config document; missing keys keep their defaults.
    pub fn from_json(json: &str) -> OrmResult<Self> {
        serde_json::from_str(json).map_err(|e| OrmError::Other(format!("invalid config: {e}")))
    }

    pub fn path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn in_memory(mut self) -> Self {
        self.path = None;
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout_ms = millis(timeout);
        self
    }

    pub fn foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }

    pub fn journal_mode(mut self, mode: JournalMode) -> Self {
        self.journal_mode = mode;
        self
    }

    /// Interrupt statements that run longer than `timeout`.
    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout_ms = Some(millis(timeout));
        self
    }

    pub fn slow_query_threshold(mut self, threshold: Duration) -> Self {
        self.slow_query_threshold_ms = Some(millis(threshold));
        self
    }

    pub fn busy_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    pub fn query_timeout_duration(&self) -> Option<Duration> {
        self.query_timeout_ms.map(Duration::from_millis)
    }

    pub fn slow_query_threshold_duration(&self) -> Option<Duration> {
        self.slow_query_threshold_ms.map(Duration::from_millis)
    }

    /// Monitoring settings derived from the timeout fields.
    ///
    /// Monitoring is enabled only when a slow query threshold is configured.
    pub fn monitor_config(&self) -> MonitorConfig {
        let mut config = MonitorConfig::new();
        if let Some(timeout) = self.query_timeout_duration() {
            config = config.with_query_timeout(timeout);
        }
        if let Some(threshold) = self.slow_query_threshold_duration() {
            config = config.with_slow_query_threshold(threshold).enable_monitoring();
        }
        config
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
