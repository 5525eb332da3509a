//! Core domain logic for Fieldnote.
//! This crate is the single source of truth for note/tag invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, LogConfig, StoreConfig, StoreLocation};
pub use db::{DbError, DbResult, Store};
pub use logging::{default_log_level, init_logging, init_logging_from_env, logging_status};
pub use model::note::{Note, NoteDraft, NoteId, NoteValidationError};
pub use model::tag::{parse_tag_text, Tag, TagId};
pub use repo::note_repo::{NoteListQuery, NoteRepository, SqliteNoteRepository};
pub use repo::tag_repo::TagRepository;
pub use repo::{RepoError, RepoResult};
pub use service::id_collision::{
    is_uniqueness_violation, reassign_duplicate_ids, resolve_id_collisions,
    save_with_id_recovery, CollisionResolution, IdReassignment, SaveReport,
};
pub use service::note_service::{
    DeleteOutcome, ImportReport, NoteService, NoteServiceError, NotesListResult,
};
pub use service::tag_gc::{orphaned_tags, SweepReport, SweepTrigger};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
