//! Notes store: connection bootstrap, schema versions and the `Store` handle.
//!
//! A connection handed out by this module has foreign keys enabled, a busy
//! timeout set and every known migration applied. File stores run in WAL mode
//! so commits from background connections reach the main one.
//!
//! # Invariants
//! - `notes.uuid` is unique at the storage level; a colliding insert is
//!   rejected by SQLite, never silently persisted.
//! - Deleting a note cascades to its `note_tags` links; tags themselves are
//!   only removed by the orphan sweep.
//! - A database written by a newer build is refused, not downgraded.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;
mod store;

pub use open::{open_db, open_db_in_memory, open_db_shared_memory};
pub use store::{Store, PREVIEW_SAMPLE_COUNT, STORE_UNAVAILABLE_EXIT_CODE};

pub type DbResult<T> = Result<T, DbError>;

/// Failures while opening or migrating the notes store.
#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "notes store schema v{db_version} was written by a newer build (this build knows up to v{latest_supported})"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
