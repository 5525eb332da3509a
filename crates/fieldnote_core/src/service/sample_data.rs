//! Placeholder notes for previews and ephemeral stores.

use crate::model::note::{now_epoch_ms, Note};
use crate::repo::note_repo::NoteRepository;
use crate::service::id_collision::insert_with_id_recovery;
use log::warn;

/// Builds `count` sample notes titled `Sample Note 1..=count`.
///
/// Timestamps increase with the index so newest-first listing starts at the
/// highest number.
pub fn sample_notes(count: usize) -> Vec<Note> {
    let base = now_epoch_ms();
    (1..=count)
        .map(|n| {
            let mut note = Note::new(format!("Sample Note {n}"), format!("Sample body {n}"));
            note.created_at = base.saturating_add(i64::try_from(n).unwrap_or(i64::MAX));
            note
        })
        .collect()
}

/// Writes `count` sample notes in one save and returns how many were written.
///
/// A failed save is logged and reported as zero; it is never fatal.
pub fn seed_sample_notes<R: NoteRepository + ?Sized>(repo: &mut R, count: usize) -> usize {
    let mut notes = sample_notes(count);
    match insert_with_id_recovery(repo, &mut notes) {
        Ok(report) => report.saved,
        Err(err) => {
            warn!("event=sample_seed module=sample_data status=error count={count} error={err}");
            0
        }
    }
}
