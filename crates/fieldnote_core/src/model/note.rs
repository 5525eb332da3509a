//! Note domain model.
//!
//! # Responsibility
//! - Define the user-authored note record.
//! - Validate write-time invariants before persistence.
//!
//! # Invariants
//! - `uuid` is never nil once a note reaches storage.
//! - `uuid` is unique across all persisted notes; collisions are repaired by
//!   `service::id_collision` before the store accepts the write.
//! - `created_at` is epoch milliseconds and never negative.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Stable identifier for every note.
pub type NoteId = Uuid;

/// User-authored note with its tag relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub uuid: NoteId,
    pub title: String,
    pub body: String,
    /// Free-text tag string as typed by the user.
    pub tag_text: String,
    /// Creation timestamp in epoch milliseconds.
    pub created_at: i64,
    /// Linked tag names, normalized to lowercase and sorted.
    pub tags: Vec<String>,
}

/// Input for creating a note from UI actions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteDraft {
    pub title: String,
    pub body: String,
    pub tag_text: String,
}

impl NoteDraft {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            tag_text: String::new(),
        }
    }

    pub fn with_tag_text(mut self, tag_text: impl Into<String>) -> Self {
        self.tag_text = tag_text.into();
        self
    }
}

/// Write-time validation failures for notes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteValidationError {
    NilId,
    NegativeCreatedAt(i64),
}

impl Display for NoteValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilId => write!(f, "note uuid must not be nil"),
            Self::NegativeCreatedAt(value) => {
                write!(f, "note created_at must be >= 0, got {value}")
            }
        }
    }
}

impl Error for NoteValidationError {}

impl Note {
    /// Creates a note with a freshly generated id and the current timestamp.
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), title, body)
    }

    /// Creates a note with a caller-provided id.
    ///
    /// Used by import paths where identity already exists externally. The id
    /// is not checked for uniqueness here; the save path repairs collisions.
    pub fn with_id(uuid: NoteId, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            uuid,
            title: title.into(),
            body: body.into(),
            tag_text: String::new(),
            created_at: now_epoch_ms(),
            tags: Vec::new(),
        }
    }

    /// Builds a note from a UI draft; tags are not derived here.
    pub fn from_draft(draft: NoteDraft) -> Self {
        let mut note = Self::new(draft.title, draft.body);
        note.tag_text = draft.tag_text;
        note
    }

    /// Checks invariants required before persistence.
    pub fn validate(&self) -> Result<(), NoteValidationError> {
        if self.uuid.is_nil() {
            return Err(NoteValidationError::NilId);
        }
        if self.created_at < 0 {
            return Err(NoteValidationError::NegativeCreatedAt(self.created_at));
        }
        Ok(())
    }
}

/// Current wall clock in epoch milliseconds, clamped to 0 before the epoch.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
