//! Tag repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Read tags together with their live note counts.
//! - Delete orphaned tags in one batch.
//!
//! # Invariants
//! - `delete_orphan_tags` re-checks the zero-link condition inside its
//!   transaction; a tag relinked since the caller's scan survives.

use crate::model::tag::{Tag, TagId};
use crate::repo::note_repo::SqliteNoteRepository;
use crate::repo::{RepoError, RepoResult};
use rusqlite::{OptionalExtension, TransactionBehavior};
use std::collections::BTreeMap;

/// Repository interface for tag reads and orphan deletion.
pub trait TagRepository {
    /// Returns all tags sorted by name, each with its note count.
    fn list_tags(&self) -> RepoResult<Vec<Tag>>;
    /// Returns every persisted tag id.
    fn all_tag_ids(&self) -> RepoResult<Vec<TagId>>;
    /// Returns note counts for the given tags. Ids no longer present are
    /// omitted from the result.
    fn tag_note_counts(&self, ids: &[TagId]) -> RepoResult<BTreeMap<TagId, u64>>;
    /// Deletes the given tags that still have zero note links, in one
    /// transaction. Returns the ids actually deleted.
    fn delete_orphan_tags(&mut self, ids: &[TagId]) -> RepoResult<Vec<TagId>>;
}

impl TagRepository for SqliteNoteRepository<'_> {
    fn list_tags(&self) -> RepoResult<Vec<Tag>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                t.id,
                t.name,
                COUNT(nt.note_uuid) AS note_count
             FROM tags t
             LEFT JOIN note_tags nt ON nt.tag_id = t.id
             GROUP BY t.id, t.name
             ORDER BY t.name COLLATE NOCASE ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut tags = Vec::new();
        while let Some(row) = rows.next()? {
            let name: String = row.get("name")?;
            tags.push(Tag {
                id: TagId(row.get("id")?),
                name: name.to_lowercase(),
                note_count: to_count(row.get("note_count")?)?,
            });
        }
        Ok(tags)
    }

    fn all_tag_ids(&self) -> RepoResult<Vec<TagId>> {
        let mut stmt = self.conn.prepare("SELECT id FROM tags ORDER BY id ASC;")?;
        let mut rows = stmt.query([])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            ids.push(TagId(row.get(0)?));
        }
        Ok(ids)
    }

    fn tag_note_counts(&self, ids: &[TagId]) -> RepoResult<BTreeMap<TagId, u64>> {
        let mut stmt = self.conn.prepare(
            "SELECT (SELECT COUNT(*) FROM note_tags WHERE tag_id = tags.id)
             FROM tags
             WHERE id = ?1;",
        )?;
        let mut counts = BTreeMap::new();
        for id in ids {
            let count: Option<i64> = stmt.query_row([id.0], |row| row.get(0)).optional()?;
            if let Some(count) = count {
                counts.insert(*id, to_count(count)?);
            }
        }
        Ok(counts)
    }

    fn delete_orphan_tags(&mut self, ids: &[TagId]) -> RepoResult<Vec<TagId>> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut deleted = Vec::new();
        {
            let mut stmt = tx.prepare(
                "DELETE FROM tags
                 WHERE id = ?1
                   AND NOT EXISTS (SELECT 1 FROM note_tags WHERE tag_id = ?1);",
            )?;
            for id in ids {
                if stmt.execute([id.0])? > 0 {
                    deleted.push(*id);
                }
            }
        }
        tx.commit()?;
        Ok(deleted)
    }
}

fn to_count(value: i64) -> RepoResult<u64> {
    u64::try_from(value).map_err(|_| RepoError::InvalidData(format!("negative count `{value}`")))
}
