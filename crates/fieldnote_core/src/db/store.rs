//! Store handle: configured location, main connection and bootstrap policy.
//!
//! # Responsibility
//! - Open the notes store from `StoreConfig`.
//! - Terminate the process when the store cannot be loaded at startup.
//! - Provide seeded ephemeral stores for previews and tests.
//! - Open background connections whose commits the main connection observes.
//!
//! # Invariants
//! - The main connection stays open for the store lifetime, which keeps
//!   ephemeral data alive while background connections come and go.
//! - Background connections go through the same bootstrap as the main one.

use super::open::{open_db, open_db_shared_memory};
use super::DbResult;
use crate::config::{StoreConfig, StoreLocation};
use crate::repo::note_repo::SqliteNoteRepository;
use crate::service::sample_data::seed_sample_notes;
use log::{error, info, warn};
use rusqlite::Connection;
use std::path::PathBuf;
use uuid::Uuid;

/// Number of sample notes written into a preview store.
pub const PREVIEW_SAMPLE_COUNT: usize = 10;

/// Process exit code used when the store cannot be opened (`EX_IOERR`).
pub const STORE_UNAVAILABLE_EXIT_CODE: i32 = 74;

/// An open notes store.
pub struct Store {
    conn: Connection,
    location: StoreLocation,
    backing: Backing,
}

enum Backing {
    File(PathBuf),
    SharedMemory(String),
}

impl Store {
    /// Opens the configured store, creating it when missing.
    pub fn open(config: &StoreConfig) -> DbResult<Self> {
        match &config.location {
            StoreLocation::File(path) => Ok(Self {
                conn: open_db(path)?,
                location: config.location.clone(),
                backing: Backing::File(path.clone()),
            }),
            StoreLocation::Ephemeral => {
                let name = format!("fieldnote-{}", Uuid::new_v4().simple());
                Ok(Self {
                    conn: open_db_shared_memory(&name)?,
                    location: StoreLocation::Ephemeral,
                    backing: Backing::SharedMemory(name),
                })
            }
        }
    }

    /// Opens the configured store or terminates the process.
    ///
    /// Nothing in the application works without its store, so a load failure
    /// here is fatal. Exits with [`STORE_UNAVAILABLE_EXIT_CODE`].
    pub fn open_or_exit(config: &StoreConfig) -> Self {
        match Self::open(config) {
            Ok(store) => store,
            Err(err) => {
                error!(
                    "event=db_open module=store status=fatal location={} error={}",
                    location_label(&config.location),
                    err
                );
                log::logger().flush();
                eprintln!("fieldnote: unable to open store: {err}");
                std::process::exit(STORE_UNAVAILABLE_EXIT_CODE);
            }
        }
    }

    /// Opens an ephemeral store seeded with [`PREVIEW_SAMPLE_COUNT`] sample notes.
    ///
    /// Seeding failures are logged and leave the store empty or partial.
    pub fn preview() -> DbResult<Self> {
        let mut store = Self::open(&StoreConfig::ephemeral())?;
        match SqliteNoteRepository::try_new(&mut store.conn) {
            Ok(mut repo) => {
                let written = seed_sample_notes(&mut repo, PREVIEW_SAMPLE_COUNT);
                info!("event=store_preview module=store status=ok seeded={written}");
            }
            Err(err) => {
                warn!("event=store_preview module=store status=error error={err}");
            }
        }
        Ok(store)
    }

    /// Opens an additional connection to the same store.
    ///
    /// Writes committed on the returned connection are visible to the next
    /// read on [`Store::connection`]; no explicit merge step exists.
    pub fn background_connection(&self) -> DbResult<Connection> {
        match &self.backing {
            Backing::File(path) => open_db(path),
            Backing::SharedMemory(name) => open_db_shared_memory(name),
        }
    }

    pub fn location(&self) -> &StoreLocation {
        &self.location
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }
}

fn location_label(location: &StoreLocation) -> String {
    match location {
        StoreLocation::File(path) => path.display().to_string(),
        StoreLocation::Ephemeral => "ephemeral".to_string(),
    }
}
