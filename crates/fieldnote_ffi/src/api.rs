//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose note/tag use-cases to Dart via FRB.
//! - Keep error semantics simple: envelopes with `ok` + message.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Note ids cross the boundary as canonical UUID strings.
//! - All calls share one process-wide store handle, so writes from any call
//!   are visible to the next one, including in ephemeral mode.

use fieldnote_core::config::DEFAULT_DB_FILE_NAME;
use fieldnote_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    LogConfig, Note, NoteDraft, NoteId, NoteService, NoteServiceError, SqliteNoteRepository,
    Store, StoreConfig,
};
use log::warn;
use std::sync::{Mutex, OnceLock, PoisonError};
use uuid::Uuid;

static STORE_SLOT: OnceLock<StoreSlot> = OnceLock::new();

/// Lazily opened store shared by every FFI call.
///
/// Ephemeral stores live only as long as their `Store`, so the handle must
/// outlive individual calls. A failed open is retried on the next call.
struct StoreSlot {
    config: StoreConfig,
    store: Mutex<Option<Store>>,
}

impl StoreSlot {
    fn new(config: StoreConfig) -> Self {
        Self {
            config,
            store: Mutex::new(None),
        }
    }

    fn with_service<T>(
        &self,
        f: impl FnOnce(&mut NoteService<SqliteNoteRepository<'_>>) -> Result<T, String>,
    ) -> Result<T, String> {
        let mut guard = self.store.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.is_none() {
            let opened =
                Store::open(&self.config).map_err(|err| format!("store open failed: {err}"))?;
            *guard = Some(opened);
        }
        let store = guard
            .as_mut()
            .ok_or_else(|| "store open failed: no store handle".to_string())?;
        let repo = SqliteNoteRepository::try_new(store.connection_mut())
            .map_err(|err| format!("note repo init failed: {err}"))?;
        let mut service = NoteService::new(repo);
        f(&mut service)
    }
}

/// Minimal health-check API for FRB smoke integration.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(&LogConfig::new(level, log_dir)) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Note item returned to the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteItem {
    pub id: String,
    pub title: String,
    pub body: String,
    pub tag_text: String,
    /// Epoch milliseconds.
    pub created_at: i64,
    pub tags: Vec<String>,
}

/// Tag item returned to the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagItem {
    pub name: String,
    pub note_count: u64,
}

/// Result envelope for single-note actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteActionResponse {
    pub ok: bool,
    pub note: Option<NoteItem>,
    pub message: String,
}

impl NoteActionResponse {
    fn success(message: impl Into<String>, note: Option<NoteItem>) -> Self {
        Self {
            ok: true,
            note,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            note: None,
            message: message.into(),
        }
    }
}

/// List envelope for note list calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotesListResponse {
    pub ok: bool,
    pub items: Vec<NoteItem>,
    pub applied_limit: u32,
    pub message: String,
}

/// Creates a note; tags are derived from `tag_text`.
#[flutter_rust_bridge::frb(sync)]
pub fn note_create(title: String, body: String, tag_text: String) -> NoteActionResponse {
    let draft = NoteDraft::new(title.trim(), body).with_tag_text(tag_text);
    respond("note_create", "Note created.", |service| {
        service.create_note(draft).map(Some)
    })
}

/// Replaces title and body of a note.
#[flutter_rust_bridge::frb(sync)]
pub fn note_update(note_id: String, title: String, body: String) -> NoteActionResponse {
    respond_for_note("note_update", "Note updated.", &note_id, |service, id| {
        service.update_note(id, title.trim(), &body).map(Some)
    })
}

/// Replaces the free-text tag string and its derived tag links.
#[flutter_rust_bridge::frb(sync)]
pub fn note_set_tag_text(note_id: String, tag_text: String) -> NoteActionResponse {
    respond_for_note("note_set_tag_text", "Tags updated.", &note_id, |service, id| {
        service.set_tag_text(id, &tag_text).map(Some)
    })
}

/// Links one tag to a note.
#[flutter_rust_bridge::frb(sync)]
pub fn note_add_tag(note_id: String, tag: String) -> NoteActionResponse {
    respond_for_note("note_add_tag", "Tag added.", &note_id, |service, id| {
        service.add_tag(id, &tag).map(Some)
    })
}

/// Unlinks one tag from a note; the tag disappears once unused.
#[flutter_rust_bridge::frb(sync)]
pub fn note_remove_tag(note_id: String, tag: String) -> NoteActionResponse {
    respond_for_note("note_remove_tag", "Tag removed.", &note_id, |service, id| {
        service.remove_tag(id, &tag).map(Some)
    })
}

/// Deletes a note; tags left without notes are removed best-effort.
#[flutter_rust_bridge::frb(sync)]
pub fn note_delete(note_id: String) -> NoteActionResponse {
    respond_for_note("note_delete", "Note deleted.", &note_id, |service, id| {
        service.delete_note(id).map(|_| None)
    })
}

/// Lists notes newest first with optional tag filter.
#[flutter_rust_bridge::frb(sync)]
pub fn notes_list(tag: Option<String>, limit: Option<u32>, offset: u32) -> NotesListResponse {
    let result = with_service(|service| {
        service
            .list_notes(tag, limit, offset)
            .map_err(|err| err.to_string())
    });
    match result {
        Ok(listed) => NotesListResponse {
            ok: true,
            message: format!("Found {} note(s).", listed.items.len()),
            items: listed.items.into_iter().map(to_note_item).collect(),
            applied_limit: listed.applied_limit,
        },
        Err(err) => NotesListResponse {
            ok: false,
            items: Vec::new(),
            applied_limit: 0,
            message: format!("notes_list failed: {err}"),
        },
    }
}

/// Lists all tags with note counts. Returns an empty list on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn tags_list() -> Vec<TagItem> {
    let result = with_service(|service| service.list_tags().map_err(|err| err.to_string()));
    match result {
        Ok(tags) => tags
            .into_iter()
            .map(|tag| TagItem {
                name: tag.name,
                note_count: tag.note_count,
            })
            .collect(),
        Err(err) => {
            warn!("event=ffi_call module=ffi call=tags_list status=error error={err}");
            Vec::new()
        }
    }
}

fn respond(
    call: &str,
    message: &str,
    f: impl FnOnce(
        &mut NoteService<SqliteNoteRepository<'_>>,
    ) -> Result<Option<Note>, NoteServiceError>,
) -> NoteActionResponse {
    match with_service(|service| f(service).map_err(|err| err.to_string())) {
        Ok(note) => NoteActionResponse::success(message, note.map(to_note_item)),
        Err(err) => NoteActionResponse::failure(format!("{call} failed: {err}")),
    }
}

fn respond_for_note(
    call: &str,
    message: &str,
    note_id: &str,
    f: impl FnOnce(
        &mut NoteService<SqliteNoteRepository<'_>>,
        NoteId,
    ) -> Result<Option<Note>, NoteServiceError>,
) -> NoteActionResponse {
    let id: NoteId = match Uuid::parse_str(note_id.trim()) {
        Ok(id) => id,
        Err(_) => {
            return NoteActionResponse::failure(format!("{call} failed: invalid note id `{note_id}`"))
        }
    };
    respond(call, message, |service| f(service, id))
}

fn store_slot() -> &'static StoreSlot {
    STORE_SLOT.get_or_init(|| {
        let config = StoreConfig::from_env().unwrap_or_else(|err| {
            warn!("event=ffi_config module=ffi status=error error={err}");
            StoreConfig::file(std::env::temp_dir().join(DEFAULT_DB_FILE_NAME))
        });
        StoreSlot::new(config)
    })
}

fn with_service<T>(
    f: impl FnOnce(&mut NoteService<SqliteNoteRepository<'_>>) -> Result<T, String>,
) -> Result<T, String> {
    store_slot().with_service(f)
}

fn to_note_item(note: Note) -> NoteItem {
    NoteItem {
        id: note.uuid.to_string(),
        title: note.title,
        body: note.body,
        tag_text: note.tag_text,
        created_at: note.created_at,
        tags: note.tags,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        core_version, init_logging, note_add_tag, note_create, note_delete, note_remove_tag,
        note_set_tag_text, note_update, notes_list, ping, tags_list, StoreSlot,
    };
    use fieldnote_core::{NoteDraft, StoreConfig};
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_empty_log_dir() {
        let error = init_logging("info".to_string(), String::new());
        assert!(!error.is_empty());
    }

    #[test]
    fn init_logging_rejects_unsupported_level() {
        let error = init_logging("verbose".to_string(), "/tmp/logs".to_string());
        assert!(!error.is_empty());
    }

    #[test]
    fn create_update_and_list_round_trip_through_store() {
        let token = unique_token("ffi-create");
        let created = note_create(token.clone(), "body".to_string(), format!("#{token}"));
        assert!(created.ok, "{}", created.message);
        let note = created.note.expect("created note should be returned");
        assert_eq!(note.tags, vec![token.to_lowercase()]);

        let updated = note_update(note.id.clone(), "renamed".to_string(), "new".to_string());
        assert!(updated.ok, "{}", updated.message);
        assert_eq!(updated.note.expect("updated note").title, "renamed");

        let listed = notes_list(Some(token), Some(5), 0);
        assert!(listed.ok, "{}", listed.message);
        assert_eq!(listed.applied_limit, 5);
        assert!(listed.items.iter().any(|item| item.id == note.id));
    }

    #[test]
    fn tag_lifecycle_removes_unused_tags() {
        let token = unique_token("ffi-tag");
        let created = note_create("tagged".to_string(), String::new(), String::new());
        let note_id = created.note.expect("created note").id;

        assert!(note_add_tag(note_id.clone(), token.clone()).ok);
        assert!(tags_list().iter().any(|tag| tag.name == token));

        let removed = note_remove_tag(note_id.clone(), token.clone());
        assert!(removed.ok, "{}", removed.message);
        assert!(!tags_list().iter().any(|tag| tag.name == token));

        let retagged = note_set_tag_text(note_id.clone(), token.clone());
        assert!(retagged.ok, "{}", retagged.message);
        assert!(note_delete(note_id).ok);
        assert!(!tags_list().iter().any(|tag| tag.name == token));
    }

    #[test]
    fn invalid_note_id_is_reported_not_panicked() {
        let response = note_delete("not-a-uuid".to_string());
        assert!(!response.ok);
        assert!(response.message.contains("invalid note id"));
    }

    #[test]
    fn ephemeral_slot_keeps_writes_between_calls() {
        let slot = StoreSlot::new(StoreConfig::ephemeral());

        let created = slot
            .with_service(|service| {
                service
                    .create_note(NoteDraft::new("kept", "").with_tag_text("memo"))
                    .map_err(|err| err.to_string())
            })
            .unwrap();
        let listed = slot
            .with_service(|service| {
                service
                    .list_notes(None, None, 0)
                    .map_err(|err| err.to_string())
            })
            .unwrap();
        let tags = slot
            .with_service(|service| service.list_tags().map_err(|err| err.to_string()))
            .unwrap();

        assert_eq!(listed.items.len(), 1);
        assert_eq!(listed.items[0].uuid, created.uuid);
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "memo");
    }

    #[test]
    fn separate_ephemeral_slots_do_not_share_notes() {
        let first = StoreSlot::new(StoreConfig::ephemeral());
        let second = StoreSlot::new(StoreConfig::ephemeral());

        first
            .with_service(|service| {
                service
                    .create_note(NoteDraft::new("only here", ""))
                    .map_err(|err| err.to_string())
            })
            .unwrap();
        let count = second
            .with_service(|service| service.count_notes().map_err(|err| err.to_string()))
            .unwrap();

        assert_eq!(count, 0);
    }

    fn unique_token(prefix: &str) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time went backwards")
            .as_nanos();
        format!("{prefix}-{nanos}")
    }
}
