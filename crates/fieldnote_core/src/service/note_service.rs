//! Note use-case service.
//!
//! # Responsibility
//! - Provide note create/import/update/get/list/delete APIs.
//! - Derive tag links from the free-text tag string.
//! - Run id collision recovery on every insert path.
//! - Sweep orphaned tags after every mutation that removes note links.
//!
//! # Invariants
//! - Note list is always sorted by `created_at DESC, uuid ASC`.
//! - Tag names are normalized to lowercase and deduplicated.
//! - Cleanup outcome never changes the result of the primary mutation.

use crate::model::note::{Note, NoteDraft, NoteId};
use crate::model::tag::{normalize_tag, normalize_tags, parse_tag_text, Tag};
use crate::repo::note_repo::{normalize_note_limit, NoteListQuery, NoteRepository};
use crate::repo::tag_repo::TagRepository;
use crate::repo::{RepoError, RepoResult};
use crate::service::id_collision::{insert_with_id_recovery, IdReassignment};
use crate::service::tag_gc::{
    sweep_all, sweep_deleted_note_tags, sweep_tag, sweep_tags, SweepReport,
};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for note use-cases.
#[derive(Debug)]
pub enum NoteServiceError {
    /// Tag input is blank.
    InvalidTag(String),
    /// Target note does not exist.
    NoteNotFound(NoteId),
    /// Persistence-layer failure.
    Repo(RepoError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl Display for NoteServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTag(value) => write!(f, "invalid tag: `{value}`"),
            Self::NoteNotFound(id) => write!(f, "note not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent note state: {details}"),
        }
    }
}

impl Error for NoteServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for NoteServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NoteNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// List result envelope used by service callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotesListResult {
    /// List items sorted by `created_at DESC, uuid ASC`.
    pub items: Vec<Note>,
    /// Effective normalized limit used by the query.
    pub applied_limit: u32,
}

/// Result of importing externally identified notes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    /// Final ids in input order, after any reassignment.
    pub ids: Vec<NoteId>,
    pub reassigned: Vec<IdReassignment>,
}

/// Result of a delete, including the orphan sweep it triggered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub deleted: usize,
    pub cleanup: SweepReport,
}

/// Note service facade over repository implementations.
pub struct NoteService<R: NoteRepository + TagRepository> {
    repo: R,
}

impl<R: NoteRepository + TagRepository> NoteService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates one note; tags are parsed from `draft.tag_text`.
    pub fn create_note(&mut self, draft: NoteDraft) -> Result<Note, NoteServiceError> {
        let mut note = Note::from_draft(draft);
        note.tags = parse_tag_text(&note.tag_text);

        let mut batch = [note];
        insert_with_id_recovery(&mut self.repo, &mut batch)?;
        let [note] = batch;
        self.read_back(note.uuid, "created note not found in read-back")
    }

    /// Saves notes that already carry identifiers (import/sync paths).
    ///
    /// Ids that collide with stored notes or with earlier notes of the batch
    /// are replaced; the whole batch is stored or nothing is.
    pub fn import_notes(&mut self, notes: Vec<Note>) -> Result<ImportReport, NoteServiceError> {
        let mut pending: Vec<Note> = notes
            .into_iter()
            .map(|mut note| {
                note.tags = normalize_tags(&note.tags);
                note
            })
            .collect();
        let report = insert_with_id_recovery(&mut self.repo, &mut pending)?;
        Ok(ImportReport {
            ids: pending.iter().map(|note| note.uuid).collect(),
            reassigned: report.reassigned,
        })
    }

    /// Gets one note by stable ID.
    pub fn get_note(&self, id: NoteId) -> RepoResult<Option<Note>> {
        self.repo.get_note(id)
    }

    /// Lists notes using optional single-tag filter and pagination.
    pub fn list_notes(
        &self,
        tag: Option<String>,
        limit: Option<u32>,
        offset: u32,
    ) -> Result<NotesListResult, NoteServiceError> {
        let normalized_tag = tag.and_then(|value| normalize_tag(value.as_str()));
        let applied_limit = normalize_note_limit(limit);
        let query = NoteListQuery {
            tag: normalized_tag,
            limit: Some(applied_limit),
            offset,
        };
        let items = self.repo.list_notes(&query)?;
        Ok(NotesListResult {
            items,
            applied_limit,
        })
    }

    pub fn count_notes(&self) -> RepoResult<u64> {
        self.repo.count_notes()
    }

    /// Lists tags with their note counts.
    pub fn list_tags(&self) -> RepoResult<Vec<Tag>> {
        self.repo.list_tags()
    }

    /// Replaces title and body.
    pub fn update_note(
        &mut self,
        id: NoteId,
        title: &str,
        body: &str,
    ) -> Result<Note, NoteServiceError> {
        self.repo.update_note(id, title, body)?;
        self.read_back(id, "updated note not found in read-back")
    }

    /// Replaces the free-text tag string and re-derives tag links from it.
    pub fn set_tag_text(&mut self, id: NoteId, tag_text: &str) -> Result<Note, NoteServiceError> {
        let tags = parse_tag_text(tag_text);
        let detached = self.repo.replace_tags(id, tag_text, &tags)?;
        sweep_tags(&mut self.repo, &detached);
        self.read_back(id, "note missing after tag replacement")
    }

    /// Links one tag to a note.
    pub fn add_tag(&mut self, id: NoteId, tag: &str) -> Result<Note, NoteServiceError> {
        let name = normalize_tag(tag).ok_or_else(|| NoteServiceError::InvalidTag(tag.to_string()))?;
        self.repo.attach_tag(id, &name)?;
        self.read_back(id, "note missing after tag attach")
    }

    /// Unlinks one tag from a note and deletes it when no note uses it anymore.
    pub fn remove_tag(&mut self, id: NoteId, tag: &str) -> Result<Note, NoteServiceError> {
        let name = normalize_tag(tag).ok_or_else(|| NoteServiceError::InvalidTag(tag.to_string()))?;
        if let Some(tag_id) = self.repo.detach_tag(id, &name)? {
            sweep_tag(&mut self.repo, tag_id);
        }
        self.read_back(id, "note missing after tag detach")
    }

    /// Deletes one note, then sweeps the tags it was linked to.
    pub fn delete_note(&mut self, id: NoteId) -> Result<DeleteOutcome, NoteServiceError> {
        let linked = self.repo.delete_note(id)?;
        let cleanup = sweep_deleted_note_tags(&mut self.repo, &linked);
        Ok(DeleteOutcome {
            deleted: 1,
            cleanup,
        })
    }

    /// Deletes many notes atomically, then sweeps every tag they used.
    pub fn delete_notes(&mut self, ids: &[NoteId]) -> Result<DeleteOutcome, NoteServiceError> {
        let unique: Vec<NoteId> = ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
        let linked = self.repo.delete_notes(&unique)?;
        let cleanup = sweep_tags(&mut self.repo, &linked);
        Ok(DeleteOutcome {
            deleted: unique.len(),
            cleanup,
        })
    }

    /// Sweeps every tag in the store.
    pub fn sweep_orphan_tags(&mut self) -> SweepReport {
        sweep_all(&mut self.repo)
    }

    fn read_back(&self, id: NoteId, details: &'static str) -> Result<Note, NoteServiceError> {
        self.repo
            .get_note(id)?
            .ok_or(NoteServiceError::InconsistentState(details))
    }
}
