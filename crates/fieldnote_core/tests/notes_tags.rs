use fieldnote_core::db::open_db_in_memory;
use fieldnote_core::{
    Note, NoteDraft, NoteRepository, NoteService, NoteServiceError, RepoError,
    SqliteNoteRepository,
};
use rusqlite::params;
use uuid::Uuid;

#[test]
fn create_note_derives_tags_from_tag_text() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteNoteRepository::try_new(&mut conn).unwrap();
    let mut service = NoteService::new(repo);

    let created = service
        .create_note(NoteDraft::new("Groceries", "milk, eggs").with_tag_text("#Home, errands #home"))
        .unwrap();

    assert_eq!(created.title, "Groceries");
    assert_eq!(created.body, "milk, eggs");
    assert_eq!(created.tag_text, "#Home, errands #home");
    assert_eq!(created.tags, vec!["errands".to_string(), "home".to_string()]);
    assert!(created.created_at > 0);
}

#[test]
fn notes_list_is_newest_first() {
    let mut conn = open_db_in_memory().unwrap();
    let (first_id, second_id) = {
        let repo = SqliteNoteRepository::try_new(&mut conn).unwrap();
        let mut service = NoteService::new(repo);
        let first = service.create_note(NoteDraft::new("first", "")).unwrap();
        let second = service.create_note(NoteDraft::new("second", "")).unwrap();
        (first.uuid.to_string(), second.uuid.to_string())
    };

    conn.execute(
        "UPDATE notes SET created_at = 2000 WHERE uuid = ?1;",
        params![first_id],
    )
    .unwrap();
    conn.execute(
        "UPDATE notes SET created_at = 1000 WHERE uuid = ?1;",
        params![second_id],
    )
    .unwrap();

    let repo = SqliteNoteRepository::try_new(&mut conn).unwrap();
    let service = NoteService::new(repo);
    let listed = service.list_notes(None, Some(10), 0).unwrap();
    assert_eq!(listed.items.len(), 2);
    assert_eq!(listed.items[0].uuid.to_string(), first_id);
    assert_eq!(listed.items[1].uuid.to_string(), second_id);
}

#[test]
fn notes_list_supports_single_tag_filter() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteNoteRepository::try_new(&mut conn).unwrap();
    let mut service = NoteService::new(repo);
    let work = service
        .create_note(NoteDraft::new("work note", "").with_tag_text("Work"))
        .unwrap();
    service
        .create_note(NoteDraft::new("other note", "").with_tag_text("Personal"))
        .unwrap();

    let filtered = service
        .list_notes(Some("WORK".to_string()), Some(10), 0)
        .unwrap();
    assert_eq!(filtered.items.len(), 1);
    assert_eq!(filtered.items[0].uuid, work.uuid);
}

#[test]
fn notes_list_limit_defaults_to_10_and_caps_at_50() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteNoteRepository::try_new(&mut conn).unwrap();
    let mut service = NoteService::new(repo);
    for idx in 0..60 {
        service
            .create_note(NoteDraft::new(format!("note {idx}"), ""))
            .unwrap();
    }

    let defaulted = service.list_notes(None, None, 0).unwrap();
    assert_eq!(defaulted.applied_limit, 10);
    assert_eq!(defaulted.items.len(), 10);

    let capped = service.list_notes(None, Some(500), 0).unwrap();
    assert_eq!(capped.applied_limit, 50);
    assert_eq!(capped.items.len(), 50);
    assert_eq!(service.count_notes().unwrap(), 60);
}

#[test]
fn update_note_replaces_title_and_body() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteNoteRepository::try_new(&mut conn).unwrap();
    let mut service = NoteService::new(repo);
    let created = service
        .create_note(NoteDraft::new("draft", "old").with_tag_text("keep"))
        .unwrap();

    let updated = service.update_note(created.uuid, "final", "new").unwrap();

    assert_eq!(updated.title, "final");
    assert_eq!(updated.body, "new");
    assert_eq!(updated.tags, vec!["keep".to_string()]);
    assert_eq!(updated.created_at, created.created_at);
}

#[test]
fn set_tag_text_replaces_links() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteNoteRepository::try_new(&mut conn).unwrap();
    let mut service = NoteService::new(repo);
    let created = service
        .create_note(NoteDraft::new("t", "").with_tag_text("work important"))
        .unwrap();

    let replaced = service.set_tag_text(created.uuid, "#Personal").unwrap();

    assert_eq!(replaced.tag_text, "#Personal");
    assert_eq!(replaced.tags, vec!["personal".to_string()]);
}

#[test]
fn add_and_remove_tag_reject_blank_names() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteNoteRepository::try_new(&mut conn).unwrap();
    let mut service = NoteService::new(repo);
    let created = service.create_note(NoteDraft::new("t", "")).unwrap();

    let err = service.add_tag(created.uuid, "   ").unwrap_err();
    assert!(matches!(err, NoteServiceError::InvalidTag(_)));
    let err = service.remove_tag(created.uuid, "").unwrap_err();
    assert!(matches!(err, NoteServiceError::InvalidTag(_)));
}

#[test]
fn operations_on_missing_note_report_not_found() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteNoteRepository::try_new(&mut conn).unwrap();
    let mut service = NoteService::new(repo);
    let missing = Uuid::new_v4();

    assert!(matches!(
        service.update_note(missing, "t", "b").unwrap_err(),
        NoteServiceError::NoteNotFound(id) if id == missing
    ));
    assert!(matches!(
        service.add_tag(missing, "work").unwrap_err(),
        NoteServiceError::NoteNotFound(_)
    ));
    assert!(matches!(
        service.delete_note(missing).unwrap_err(),
        NoteServiceError::NoteNotFound(_)
    ));
    assert!(service.get_note(missing).unwrap().is_none());
}

#[test]
fn repository_rejects_unmigrated_connection() {
    let mut conn = rusqlite::Connection::open_in_memory().unwrap();
    assert!(SqliteNoteRepository::try_new(&mut conn).is_err());
}

#[test]
fn repository_bulk_delete_tolerates_repeated_ids() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteNoteRepository::try_new(&mut conn).unwrap();
    let first = Note::new("a", "");
    let second = Note::new("b", "");
    repo.insert_notes(&[first.clone(), second.clone()]).unwrap();
    repo.attach_tag(first.uuid, "work").unwrap();

    let linked = repo
        .delete_notes(&[first.uuid, first.uuid, second.uuid])
        .unwrap();

    assert_eq!(linked.len(), 1);
    assert_eq!(repo.count_notes().unwrap(), 0);
}

#[test]
fn repository_bulk_delete_with_missing_id_keeps_every_note() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteNoteRepository::try_new(&mut conn).unwrap();
    let kept = Note::new("a", "");
    repo.insert_notes(&[kept.clone()]).unwrap();
    let missing = Uuid::new_v4();

    let err = repo.delete_notes(&[kept.uuid, missing]).unwrap_err();

    assert!(matches!(err, RepoError::NotFound(id) if id == missing));
    assert_eq!(repo.count_notes().unwrap(), 1);
}
