//! Domain model for notes and tags.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Own tag-name normalization shared by repositories and services.
//!
//! # Invariants
//! - Every note is identified by a stable, non-nil `NoteId`.
//! - A tag only exists while at least one note references it.

pub mod note;
pub mod tag;
