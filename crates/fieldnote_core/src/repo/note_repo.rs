//! Note repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide note persistence APIs over the `notes` table.
//! - Own note/tag link mutation with atomic semantics.
//! - Report which tags lost a link so callers can sweep orphans.
//!
//! # Invariants
//! - `insert_notes` is all-or-nothing: one colliding id rolls back the batch.
//! - Tag names are normalized to lowercase before persistence.
//! - Link-removing writes return the affected tag ids; they never delete tags
//!   themselves (see `service::tag_gc`).

use crate::model::note::{Note, NoteId};
use crate::model::tag::{normalize_tag, normalize_tags, TagId};
use crate::repo::{ensure_connection_ready, RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, Transaction, TransactionBehavior,
};
use std::collections::BTreeSet;
use uuid::Uuid;

const NOTES_DEFAULT_LIMIT: u32 = 10;
const NOTES_LIMIT_MAX: u32 = 50;

const NOTE_SELECT_SQL: &str = "SELECT
    uuid,
    title,
    body,
    tag_text,
    created_at
FROM notes";

/// Query options for note list use-cases.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteListQuery {
    /// Optional single-tag exact match filter.
    pub tag: Option<String>,
    /// Maximum rows to return. Defaults to 10 and clamps to 50.
    pub limit: Option<u32>,
    /// Number of rows to skip.
    pub offset: u32,
}

/// Repository interface for note operations.
pub trait NoteRepository {
    /// Inserts notes and their tag links in a single transaction.
    fn insert_notes(&mut self, notes: &[Note]) -> RepoResult<()>;
    /// Returns every persisted note id in insertion order.
    fn note_ids(&self) -> RepoResult<Vec<NoteId>>;
    /// Gets one note by id.
    fn get_note(&self, id: NoteId) -> RepoResult<Option<Note>>;
    /// Lists notes using single-tag filter + pagination.
    fn list_notes(&self, query: &NoteListQuery) -> RepoResult<Vec<Note>>;
    /// Counts all persisted notes.
    fn count_notes(&self) -> RepoResult<u64>;
    /// Replaces title and body.
    fn update_note(&mut self, id: NoteId, title: &str, body: &str) -> RepoResult<()>;
    /// Deletes one note and returns the tags it was linked to.
    fn delete_note(&mut self, id: NoteId) -> RepoResult<Vec<TagId>>;
    /// Deletes many notes atomically and returns every tag they were linked to.
    ///
    /// Repeated ids are deleted once; any missing id aborts the whole batch.
    fn delete_notes(&mut self, ids: &[NoteId]) -> RepoResult<Vec<TagId>>;
    /// Links one tag (created on demand) to a note.
    fn attach_tag(&mut self, id: NoteId, tag: &str) -> RepoResult<TagId>;
    /// Unlinks one tag from a note. Returns `None` when no link existed.
    fn detach_tag(&mut self, id: NoteId, tag: &str) -> RepoResult<Option<TagId>>;
    /// Replaces the free-text tag string and the full tag set of a note.
    /// Returns ids of tags that lost their link to this note.
    fn replace_tags(&mut self, id: NoteId, tag_text: &str, tags: &[String])
        -> RepoResult<Vec<TagId>>;
}

/// SQLite-backed notes/tags repository.
pub struct SqliteNoteRepository<'conn> {
    pub(crate) conn: &'conn mut Connection,
}

impl<'conn> SqliteNoteRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl NoteRepository for SqliteNoteRepository<'_> {
    fn insert_notes(&mut self, notes: &[Note]) -> RepoResult<()> {
        for note in notes {
            note.validate()?;
        }

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        for note in notes {
            let uuid = note.uuid.to_string();
            tx.execute(
                "INSERT INTO notes (
                    uuid,
                    title,
                    body,
                    tag_text,
                    created_at,
                    updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?5);",
                params![
                    uuid.as_str(),
                    note.title.as_str(),
                    note.body.as_str(),
                    note.tag_text.as_str(),
                    note.created_at,
                ],
            )?;
            for tag in normalize_tags(&note.tags) {
                link_tag_in_tx(&tx, uuid.as_str(), tag.as_str())?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn note_ids(&self) -> RepoResult<Vec<NoteId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT uuid FROM notes ORDER BY rowid ASC;")?;
        let mut rows = stmt.query([])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            let value: String = row.get(0)?;
            ids.push(parse_uuid(&value)?);
        }
        Ok(ids)
    }

    fn get_note(&self, id: NoteId) -> RepoResult<Option<Note>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{NOTE_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_note_row(self.conn, row)?));
        }
        Ok(None)
    }

    fn list_notes(&self, query: &NoteListQuery) -> RepoResult<Vec<Note>> {
        let mut sql = format!("{NOTE_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(tag) = query.tag.as_ref() {
            sql.push_str(
                " AND EXISTS (
                    SELECT 1
                    FROM note_tags nt
                    INNER JOIN tags t ON t.id = nt.tag_id
                    WHERE nt.note_uuid = notes.uuid
                      AND t.name = ? COLLATE NOCASE
                )",
            );
            bind_values.push(Value::Text(tag.clone()));
        }

        sql.push_str(" ORDER BY created_at DESC, uuid ASC");
        let limit = normalize_note_limit(query.limit);
        sql.push_str(" LIMIT ?");
        bind_values.push(Value::Integer(i64::from(limit)));
        if query.offset > 0 {
            sql.push_str(" OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            notes.push(parse_note_row(self.conn, row)?);
        }
        Ok(notes)
    }

    fn count_notes(&self) -> RepoResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM notes;", [], |row| row.get(0))?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative note count `{count}`")))
    }

    fn update_note(&mut self, id: NoteId, title: &str, body: &str) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE notes
             SET
                title = ?2,
                body = ?3,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;",
            params![id.to_string(), title, body],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn delete_note(&mut self, id: NoteId) -> RepoResult<Vec<TagId>> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let linked = delete_note_in_tx(&tx, id)?;
        tx.commit()?;
        Ok(linked)
    }

    fn delete_notes(&mut self, ids: &[NoteId]) -> RepoResult<Vec<TagId>> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let unique: BTreeSet<NoteId> = ids.iter().copied().collect();
        let mut linked = BTreeSet::new();
        for id in unique {
            linked.extend(delete_note_in_tx(&tx, id)?);
        }
        tx.commit()?;
        Ok(linked.into_iter().collect())
    }

    fn attach_tag(&mut self, id: NoteId, tag: &str) -> RepoResult<TagId> {
        let name = required_tag_name(tag)?;
        let uuid = id.to_string();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        if !note_exists_in_tx(&tx, uuid.as_str())? {
            return Err(RepoError::NotFound(id));
        }
        let tag_id = link_tag_in_tx(&tx, uuid.as_str(), name.as_str())?;
        touch_note_in_tx(&tx, uuid.as_str())?;
        tx.commit()?;
        Ok(tag_id)
    }

    fn detach_tag(&mut self, id: NoteId, tag: &str) -> RepoResult<Option<TagId>> {
        let name = required_tag_name(tag)?;
        let uuid = id.to_string();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        if !note_exists_in_tx(&tx, uuid.as_str())? {
            return Err(RepoError::NotFound(id));
        }

        let tag_id = find_tag_id_in_tx(&tx, name.as_str())?;
        let detached = match tag_id {
            Some(tag_id) => {
                let changed = tx.execute(
                    "DELETE FROM note_tags WHERE note_uuid = ?1 AND tag_id = ?2;",
                    params![uuid.as_str(), tag_id.0],
                )?;
                (changed > 0).then_some(tag_id)
            }
            None => None,
        };
        if detached.is_some() {
            touch_note_in_tx(&tx, uuid.as_str())?;
        }
        tx.commit()?;
        Ok(detached)
    }

    fn replace_tags(
        &mut self,
        id: NoteId,
        tag_text: &str,
        tags: &[String],
    ) -> RepoResult<Vec<TagId>> {
        let uuid = id.to_string();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        if !note_exists_in_tx(&tx, uuid.as_str())? {
            return Err(RepoError::NotFound(id));
        }

        let previous = linked_tag_ids_in_tx(&tx, uuid.as_str())?;
        tx.execute(
            "DELETE FROM note_tags WHERE note_uuid = ?1;",
            [uuid.as_str()],
        )?;

        let mut current = BTreeSet::new();
        for tag in normalize_tags(tags) {
            current.insert(link_tag_in_tx(&tx, uuid.as_str(), tag.as_str())?);
        }

        tx.execute(
            "UPDATE notes
             SET
                tag_text = ?2,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;",
            params![uuid.as_str(), tag_text],
        )?;
        tx.commit()?;

        Ok(previous
            .into_iter()
            .filter(|tag_id| !current.contains(tag_id))
            .collect())
    }
}

/// Normalizes list limit according to notes contract.
pub fn normalize_note_limit(limit: Option<u32>) -> u32 {
    match limit {
        Some(0) | None => NOTES_DEFAULT_LIMIT,
        Some(value) if value > NOTES_LIMIT_MAX => NOTES_LIMIT_MAX,
        Some(value) => value,
    }
}

fn required_tag_name(tag: &str) -> RepoResult<String> {
    normalize_tag(tag).ok_or_else(|| RepoError::InvalidData(format!("blank tag name `{tag}`")))
}

fn parse_uuid(value: &str) -> RepoResult<NoteId> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in notes.uuid")))
}

fn parse_note_row(conn: &Connection, row: &Row<'_>) -> RepoResult<Note> {
    let uuid_text: String = row.get("uuid")?;
    let note = Note {
        uuid: parse_uuid(&uuid_text)?,
        title: row.get("title")?,
        body: row.get("body")?,
        tag_text: row.get("tag_text")?,
        created_at: row.get("created_at")?,
        tags: load_tags_for_note(conn, &uuid_text)?,
    };
    note.validate()?;
    Ok(note)
}

fn load_tags_for_note(conn: &Connection, note_uuid: &str) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT t.name
         FROM note_tags nt
         INNER JOIN tags t ON t.id = nt.tag_id
         WHERE nt.note_uuid = ?1
         ORDER BY t.name COLLATE NOCASE ASC;",
    )?;
    let mut rows = stmt.query([note_uuid])?;
    let mut tags = Vec::new();
    while let Some(row) = rows.next()? {
        let value: String = row.get(0)?;
        tags.push(value.to_lowercase());
    }
    Ok(tags)
}

fn delete_note_in_tx(tx: &Transaction<'_>, id: NoteId) -> RepoResult<Vec<TagId>> {
    let uuid = id.to_string();
    // Links cascade with the note, so collect them first.
    let linked = linked_tag_ids_in_tx(tx, uuid.as_str())?;
    let changed = tx.execute("DELETE FROM notes WHERE uuid = ?1;", [uuid.as_str()])?;
    if changed == 0 {
        return Err(RepoError::NotFound(id));
    }
    Ok(linked)
}

fn linked_tag_ids_in_tx(tx: &Transaction<'_>, note_uuid: &str) -> RepoResult<Vec<TagId>> {
    let mut stmt = tx.prepare(
        "SELECT tag_id
         FROM note_tags
         WHERE note_uuid = ?1
         ORDER BY tag_id ASC;",
    )?;
    let mut rows = stmt.query([note_uuid])?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        ids.push(TagId(row.get(0)?));
    }
    Ok(ids)
}

fn link_tag_in_tx(tx: &Transaction<'_>, note_uuid: &str, name: &str) -> RepoResult<TagId> {
    tx.execute("INSERT OR IGNORE INTO tags (name) VALUES (?1);", [name])?;
    let tag_id = find_tag_id_in_tx(tx, name)?.ok_or_else(|| {
        RepoError::InvalidData(format!("tag `{name}` missing right after insert"))
    })?;
    tx.execute(
        "INSERT OR IGNORE INTO note_tags (note_uuid, tag_id) VALUES (?1, ?2);",
        params![note_uuid, tag_id.0],
    )?;
    Ok(tag_id)
}

fn find_tag_id_in_tx(tx: &Transaction<'_>, name: &str) -> RepoResult<Option<TagId>> {
    let id = tx
        .query_row(
            "SELECT id FROM tags WHERE name = ?1 COLLATE NOCASE;",
            [name],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    Ok(id.map(TagId))
}

fn note_exists_in_tx(tx: &Transaction<'_>, note_uuid: &str) -> RepoResult<bool> {
    let exists: i64 = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM notes WHERE uuid = ?1);",
        [note_uuid],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn touch_note_in_tx(tx: &Transaction<'_>, note_uuid: &str) -> RepoResult<()> {
    tx.execute(
        "UPDATE notes
         SET updated_at = (strftime('%s', 'now') * 1000)
         WHERE uuid = ?1;",
        [note_uuid],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::normalize_note_limit;

    #[test]
    fn note_limit_defaults_and_clamps() {
        assert_eq!(normalize_note_limit(None), 10);
        assert_eq!(normalize_note_limit(Some(0)), 10);
        assert_eq!(normalize_note_limit(Some(7)), 7);
        assert_eq!(normalize_note_limit(Some(500)), 50);
    }
}
