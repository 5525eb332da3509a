use fieldnote_core::db::open_db_in_memory;
use fieldnote_core::{
    is_uniqueness_violation, resolve_id_collisions, save_with_id_recovery, CollisionResolution,
    DbError, Note, NoteRepository, NoteService, RepoError, SqliteNoteRepository,
};
use rusqlite::ffi;
use std::collections::HashSet;
use uuid::Uuid;

fn sqlite_failure(code: i32) -> RepoError {
    RepoError::Db(DbError::Sqlite(rusqlite::Error::SqliteFailure(
        ffi::Error::new(code),
        None,
    )))
}

#[test]
fn store_reports_duplicate_insert_as_uniqueness_violation() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteNoteRepository::try_new(&mut conn).unwrap();
    let note = Note::new("original", "");
    repo.insert_notes(&[note.clone()]).unwrap();

    let err = repo
        .insert_notes(&[Note::with_id(note.uuid, "copy", "")])
        .unwrap_err();

    assert!(is_uniqueness_violation(&err), "unexpected error: {err}");
    assert_eq!(repo.count_notes().unwrap(), 1);
}

#[test]
fn import_with_duplicate_ids_keeps_first_and_makes_all_distinct() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteNoteRepository::try_new(&mut conn).unwrap();
    let mut service = NoteService::new(repo);

    let persisted = service
        .import_notes(vec![Note::new("already stored", "")])
        .unwrap()
        .ids[0];
    let shared = Uuid::new_v4();
    let batch = vec![
        Note::with_id(persisted, "collides with stored", ""),
        Note::with_id(shared, "first shared", ""),
        Note::with_id(shared, "second shared", ""),
        Note::with_id(shared, "third shared", ""),
    ];

    let report = service.import_notes(batch).unwrap();

    assert_eq!(report.reassigned.len(), 3);
    assert_ne!(report.ids[0], persisted);
    assert_eq!(report.ids[1], shared);
    let distinct: HashSet<_> = report.ids.iter().chain([&persisted]).collect();
    assert_eq!(distinct.len(), 5);

    let stored = service.get_note(persisted).unwrap().unwrap();
    assert_eq!(stored.title, "already stored");
    let first_shared = service.get_note(shared).unwrap().unwrap();
    assert_eq!(first_shared.title, "first shared");
    assert_eq!(service.count_notes().unwrap(), 5);
}

#[test]
fn batch_without_collisions_is_saved_untouched() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteNoteRepository::try_new(&mut conn).unwrap();
    let mut service = NoteService::new(repo);
    let notes = vec![Note::new("a", ""), Note::new("b", "")];
    let expected: Vec<_> = notes.iter().map(|note| note.uuid).collect();

    let report = service.import_notes(notes).unwrap();

    assert!(report.reassigned.is_empty());
    assert_eq!(report.ids, expected);
}

#[test]
fn non_uniqueness_failure_is_not_intercepted() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteNoteRepository::try_new(&mut conn).unwrap();
    let mut pending = vec![Note::new("a", "")];
    let mut calls = 0;

    let err = save_with_id_recovery(&mut repo, &mut pending, |_, _| {
        calls += 1;
        Err(sqlite_failure(ffi::SQLITE_CONSTRAINT_CHECK))
    })
    .unwrap_err();

    assert_eq!(calls, 1);
    assert!(!is_uniqueness_violation(&err));

    let resolution =
        resolve_id_collisions(&repo, &sqlite_failure(ffi::SQLITE_IOERR), &mut pending).unwrap();
    assert_eq!(resolution, CollisionResolution::NotApplicable);
    assert!(!resolution.is_handled());
}

#[test]
fn uniqueness_violation_without_duplicates_is_not_handled() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteNoteRepository::try_new(&mut conn).unwrap();
    let mut pending = vec![Note::new("a", "")];

    let resolution = resolve_id_collisions(
        &repo,
        &sqlite_failure(ffi::SQLITE_CONSTRAINT_UNIQUE),
        &mut pending,
    )
    .unwrap();

    assert_eq!(resolution, CollisionResolution::NotApplicable);
}

#[test]
fn failing_retry_propagates_without_second_retry() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteNoteRepository::try_new(&mut conn).unwrap();
    let shared = Uuid::new_v4();
    let mut pending = vec![
        Note::with_id(shared, "a", ""),
        Note::with_id(shared, "b", ""),
    ];
    let mut calls = 0;

    let err = save_with_id_recovery(&mut repo, &mut pending, |_, _| {
        calls += 1;
        if calls == 1 {
            Err(sqlite_failure(ffi::SQLITE_CONSTRAINT_UNIQUE))
        } else {
            Err(sqlite_failure(ffi::SQLITE_FULL))
        }
    })
    .unwrap_err();

    assert_eq!(calls, 2);
    assert!(matches!(err, RepoError::Db(_)));
    assert_ne!(pending[0].uuid, pending[1].uuid);
    assert_eq!(pending[0].uuid, shared);
}

#[test]
fn nil_id_is_rejected_before_reaching_the_store() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteNoteRepository::try_new(&mut conn).unwrap();
    let mut service = NoteService::new(repo);

    let err = service
        .import_notes(vec![Note::with_id(Uuid::nil(), "nil", "")])
        .unwrap_err();

    assert!(err.to_string().contains("nil"));
    assert_eq!(service.count_notes().unwrap(), 0);
}
