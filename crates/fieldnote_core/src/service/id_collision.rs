//! Note identifier collision recovery.
//!
//! # Responsibility
//! - Recognize a uniqueness-constraint rejection from the store.
//! - Reassign identifiers of pending notes that collide with persisted notes
//!   or with earlier notes in the same batch.
//! - Retry the rejected save exactly once.
//!
//! # Invariants
//! - The first note encountered per identifier keeps it; persisted notes
//!   always come first.
//! - Reassigned identifiers are unique among persisted and pending notes.
//! - Failures that are not uniqueness violations pass through untouched.
//! - A failing id fetch or a failing retry propagates; there is no second
//!   retry.

use crate::db::DbError;
use crate::model::note::{Note, NoteId};
use crate::repo::note_repo::NoteRepository;
use crate::repo::{RepoError, RepoResult};
use log::{info, warn};
use rusqlite::{ffi, ErrorCode};
use std::collections::HashSet;
use uuid::Uuid;

/// One identifier change applied to a pending note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdReassignment {
    /// Position of the note inside the pending batch.
    pub index: usize,
    pub previous: NoteId,
    pub assigned: NoteId,
}

/// Outcome of inspecting a failed save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollisionResolution {
    /// The failure was not an id collision; nothing was changed.
    NotApplicable,
    /// Pending notes were given new identifiers.
    Repaired(Vec<IdReassignment>),
}

impl CollisionResolution {
    pub fn is_handled(&self) -> bool {
        matches!(self, Self::Repaired(_))
    }
}

/// Result of a save that went through collision recovery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveReport {
    pub saved: usize,
    /// Empty when the first attempt succeeded.
    pub reassigned: Vec<IdReassignment>,
}

/// Returns whether `err` is the store rejecting a duplicate unique key.
///
/// Matches the SQLite result code (`SQLITE_CONSTRAINT`) together with the
/// extended code for unique/primary-key constraints. CHECK, NOT NULL and
/// foreign-key failures share the primary code and are not matched.
pub fn is_uniqueness_violation(err: &RepoError) -> bool {
    match err {
        RepoError::Db(DbError::Sqlite(rusqlite::Error::SqliteFailure(failure, _))) => {
            failure.code == ErrorCode::ConstraintViolation
                && matches!(
                    failure.extended_code,
                    ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                )
        }
        _ => false,
    }
}

/// Gives every pending note beyond the first per identifier a fresh id.
///
/// `persisted` ids are treated as encountered before any pending note.
pub fn reassign_duplicate_ids(persisted: &[NoteId], pending: &mut [Note]) -> Vec<IdReassignment> {
    let mut reserved: HashSet<NoteId> = persisted.iter().copied().collect();
    reserved.extend(pending.iter().map(|note| note.uuid));

    let mut seen: HashSet<NoteId> = persisted.iter().copied().collect();
    let mut reassigned = Vec::new();
    for (index, note) in pending.iter_mut().enumerate() {
        if seen.insert(note.uuid) {
            continue;
        }

        let assigned = fresh_id(&reserved);
        reserved.insert(assigned);
        seen.insert(assigned);
        reassigned.push(IdReassignment {
            index,
            previous: note.uuid,
            assigned,
        });
        note.uuid = assigned;
    }
    reassigned
}

/// Inspects a failed save and repairs colliding pending ids.
///
/// Returns `NotApplicable` when `err` is not a uniqueness violation, or when
/// no duplicate id can be found (another unique constraint fired).
pub fn resolve_id_collisions<R: NoteRepository + ?Sized>(
    repo: &R,
    err: &RepoError,
    pending: &mut [Note],
) -> RepoResult<CollisionResolution> {
    if !is_uniqueness_violation(err) {
        return Ok(CollisionResolution::NotApplicable);
    }

    let persisted = repo.note_ids()?;
    let reassigned = reassign_duplicate_ids(&persisted, pending);
    if reassigned.is_empty() {
        return Ok(CollisionResolution::NotApplicable);
    }

    for change in &reassigned {
        warn!(
            "event=note_id_reassigned module=id_collision status=ok index={} previous={} assigned={}",
            change.index, change.previous, change.assigned
        );
    }
    Ok(CollisionResolution::Repaired(reassigned))
}

/// Runs `save`, repairing id collisions and retrying once on rejection.
pub fn save_with_id_recovery<R, F>(
    repo: &mut R,
    pending: &mut [Note],
    mut save: F,
) -> RepoResult<SaveReport>
where
    R: NoteRepository + ?Sized,
    F: FnMut(&mut R, &[Note]) -> RepoResult<()>,
{
    let err = match save(repo, pending) {
        Ok(()) => {
            return Ok(SaveReport {
                saved: pending.len(),
                reassigned: Vec::new(),
            })
        }
        Err(err) => err,
    };

    let reassigned = match resolve_id_collisions(repo, &err, pending)? {
        CollisionResolution::NotApplicable => return Err(err),
        CollisionResolution::Repaired(reassigned) => reassigned,
    };

    if let Err(retry_err) = save(repo, pending) {
        warn!(
            "event=note_save_retry module=id_collision status=error reassigned={} error={}",
            reassigned.len(),
            retry_err
        );
        return Err(retry_err);
    }

    info!(
        "event=note_save_retry module=id_collision status=ok saved={} reassigned={}",
        pending.len(),
        reassigned.len()
    );
    Ok(SaveReport {
        saved: pending.len(),
        reassigned,
    })
}

/// Inserts `pending` through the repository with collision recovery.
pub fn insert_with_id_recovery<R: NoteRepository + ?Sized>(
    repo: &mut R,
    pending: &mut [Note],
) -> RepoResult<SaveReport> {
    save_with_id_recovery(repo, pending, |repo, notes| repo.insert_notes(notes))
}

fn fresh_id(reserved: &HashSet<NoteId>) -> NoteId {
    loop {
        let candidate = Uuid::new_v4();
        if !reserved.contains(&candidate) {
            return candidate;
        }
    }
}
