//! Environment-driven configuration for store and logging bootstrap.
//!
//! # Responsibility
//! - Resolve where the notes store lives (file or ephemeral).
//! - Resolve optional logging level/directory for hosts without their own
//!   logging setup (CLI, tests).
//!
//! # Invariants
//! - Resolution never panics; malformed values surface as `ConfigError`.
//! - Blank variables are treated as unset.

use crate::logging::default_log_level;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Selects ephemeral mode when set to `ephemeral` (or `memory`).
pub const STORE_MODE_ENV: &str = "FIELDNOTE_STORE";
/// Overrides the on-disk store path.
pub const DB_PATH_ENV: &str = "FIELDNOTE_DB_PATH";
pub const LOG_LEVEL_ENV: &str = "FIELDNOTE_LOG_LEVEL";
pub const LOG_DIR_ENV: &str = "FIELDNOTE_LOG_DIR";

/// Fixed store file name used when no explicit path is configured.
pub const DEFAULT_DB_FILE_NAME: &str = "fieldnote.sqlite3";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    UnknownStoreMode(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownStoreMode(value) => write!(
                f,
                "unsupported {STORE_MODE_ENV} value `{value}`; expected file|ephemeral"
            ),
        }
    }
}

impl Error for ConfigError {}

/// Where the notes store lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    /// On-disk SQLite file, created when missing.
    File(PathBuf),
    /// In-memory store that disappears with its last connection.
    Ephemeral,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub location: StoreLocation,
}

impl StoreConfig {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            location: StoreLocation::File(path.into()),
        }
    }

    pub fn ephemeral() -> Self {
        Self {
            location: StoreLocation::Ephemeral,
        }
    }

    /// Resolves store configuration from process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mode = non_blank(lookup(STORE_MODE_ENV)).map(|value| value.to_ascii_lowercase());
        match mode.as_deref() {
            Some("ephemeral" | "memory") => return Ok(Self::ephemeral()),
            Some("file") | None => {}
            Some(other) => return Err(ConfigError::UnknownStoreMode(other.to_string())),
        }

        let path = non_blank(lookup(DB_PATH_ENV))
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_DB_FILE_NAME));
        Ok(Self::file(path))
    }
}

/// Logging bootstrap settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub level: String,
    pub log_dir: String,
}

impl LogConfig {
    pub fn new(level: impl Into<String>, log_dir: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            log_dir: log_dir.into(),
        }
    }

    /// Returns `None` when no log directory is configured.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let log_dir = non_blank(lookup(LOG_DIR_ENV))?;
        let level =
            non_blank(lookup(LOG_LEVEL_ENV)).unwrap_or_else(|| default_log_level().to_string());
        Some(Self { level, log_dir })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
}
