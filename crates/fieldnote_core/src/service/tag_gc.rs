//! Orphan tag garbage collection.
//!
//! # Responsibility
//! - Decide which tags violate the "linked to at least one note" invariant.
//! - Delete those tags in one batch after a mutation removed note links.
//!
//! # Invariants
//! - `orphaned_tags` is the single source of truth for orphan status.
//! - Sweeps are best-effort: failures are logged and reported, never
//!   returned as errors, so the triggering mutation is never blocked.
//! - Tags with one or more links are never deleted.

use crate::model::tag::TagId;
use crate::repo::tag_repo::TagRepository;
use crate::repo::RepoResult;
use log::{debug, info, warn};
use std::collections::{BTreeMap, BTreeSet};

/// What caused a sweep; carried into logs and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepTrigger {
    BulkOperation,
    TagDetached,
    NoteDeleted,
    FullScan,
}

impl SweepTrigger {
    fn label(self) -> &'static str {
        match self {
            Self::BulkOperation => "bulk_operation",
            Self::TagDetached => "tag_detached",
            Self::NoteDeleted => "note_deleted",
            Self::FullScan => "full_scan",
        }
    }
}

/// Outcome of one sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub trigger: SweepTrigger,
    pub deleted: Vec<TagId>,
    /// Set when the sweep failed; `deleted` is then empty.
    pub error: Option<String>,
}

impl SweepReport {
    fn empty(trigger: SweepTrigger) -> Self {
        Self {
            trigger,
            deleted: Vec::new(),
            error: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Returns every tag whose note count is zero.
pub fn orphaned_tags(note_counts: &BTreeMap<TagId, u64>) -> BTreeSet<TagId> {
    note_counts
        .iter()
        .filter(|(_, count)| **count == 0)
        .map(|(id, _)| *id)
        .collect()
}

/// Sweeps an explicit set of tags, typically after a bulk operation.
pub fn sweep_tags<R: TagRepository + ?Sized>(repo: &mut R, candidates: &[TagId]) -> SweepReport {
    sweep(repo, candidates, SweepTrigger::BulkOperation)
}

/// Sweeps one tag right after it was detached from a note.
pub fn sweep_tag<R: TagRepository + ?Sized>(repo: &mut R, tag: TagId) -> SweepReport {
    sweep(repo, &[tag], SweepTrigger::TagDetached)
}

/// Sweeps the tags a just-deleted note was linked to.
pub fn sweep_deleted_note_tags<R: TagRepository + ?Sized>(
    repo: &mut R,
    linked: &[TagId],
) -> SweepReport {
    sweep(repo, linked, SweepTrigger::NoteDeleted)
}

/// Sweeps every tag in the store.
pub fn sweep_all<R: TagRepository + ?Sized>(repo: &mut R) -> SweepReport {
    match repo.all_tag_ids() {
        Ok(ids) => sweep(repo, &ids, SweepTrigger::FullScan),
        Err(err) => failed(SweepTrigger::FullScan, &err.to_string()),
    }
}

fn sweep<R: TagRepository + ?Sized>(
    repo: &mut R,
    candidates: &[TagId],
    trigger: SweepTrigger,
) -> SweepReport {
    if candidates.is_empty() {
        return SweepReport::empty(trigger);
    }

    match try_sweep(repo, candidates) {
        Ok(deleted) => {
            if deleted.is_empty() {
                debug!(
                    "event=tag_gc module=tag_gc status=ok trigger={} candidates={} deleted=0",
                    trigger.label(),
                    candidates.len()
                );
            } else {
                info!(
                    "event=tag_gc module=tag_gc status=ok trigger={} candidates={} deleted={}",
                    trigger.label(),
                    candidates.len(),
                    deleted.len()
                );
            }
            SweepReport {
                trigger,
                deleted,
                error: None,
            }
        }
        Err(err) => failed(trigger, &err.to_string()),
    }
}

fn try_sweep<R: TagRepository + ?Sized>(repo: &mut R, candidates: &[TagId]) -> RepoResult<Vec<TagId>> {
    let counts = repo.tag_note_counts(candidates)?;
    let orphans = orphaned_tags(&counts);
    if orphans.is_empty() {
        return Ok(Vec::new());
    }
    let marked: Vec<TagId> = orphans.into_iter().collect();
    repo.delete_orphan_tags(&marked)
}

fn failed(trigger: SweepTrigger, error: &str) -> SweepReport {
    warn!(
        "event=tag_gc module=tag_gc status=error trigger={} error={}",
        trigger.label(),
        error
    );
    SweepReport {
        trigger,
        deleted: Vec::new(),
        error: Some(error.to_string()),
    }
}
