use fieldnote_core::db::{PREVIEW_SAMPLE_COUNT, Store};
use fieldnote_core::service::sample_data::seed_sample_notes;
use fieldnote_core::{
    Note, NoteRepository, NoteService, SqliteNoteRepository, StoreConfig, StoreLocation,
};

#[test]
fn preview_store_reads_back_ten_sample_notes() {
    let mut store = Store::preview().unwrap();
    assert_eq!(store.location(), &StoreLocation::Ephemeral);

    let repo = SqliteNoteRepository::try_new(store.connection_mut()).unwrap();
    let service = NoteService::new(repo);
    let listed = service.list_notes(None, Some(50), 0).unwrap();

    assert_eq!(PREVIEW_SAMPLE_COUNT, 10);
    assert_eq!(listed.items.len(), 10);
    let titles: Vec<_> = listed.items.iter().map(|note| note.title.clone()).collect();
    let expected: Vec<_> = (1..=10).rev().map(|n| format!("Sample Note {n}")).collect();
    assert_eq!(titles, expected);
    assert!(listed
        .items
        .iter()
        .all(|note| note.tags.is_empty() && note.tag_text.is_empty()));
    assert!(service.list_tags().unwrap().is_empty());
}

#[test]
fn ephemeral_stores_are_isolated_from_each_other() {
    let mut first = Store::open(&StoreConfig::ephemeral()).unwrap();
    let mut second = Store::open(&StoreConfig::ephemeral()).unwrap();

    {
        let mut repo = SqliteNoteRepository::try_new(first.connection_mut()).unwrap();
        assert_eq!(seed_sample_notes(&mut repo, 3), 3);
    }

    let repo = SqliteNoteRepository::try_new(second.connection_mut()).unwrap();
    assert_eq!(repo.count_notes().unwrap(), 0);
}

#[test]
fn background_writes_are_visible_on_main_connection() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = Store::open(&StoreConfig::file(dir.path().join("notes.db"))).unwrap();
    let note = Note::new("written in background", "");

    {
        let mut background = store.background_connection().unwrap();
        let mut repo = SqliteNoteRepository::try_new(&mut background).unwrap();
        repo.insert_notes(&[note.clone()]).unwrap();
    }

    let repo = SqliteNoteRepository::try_new(store.connection_mut()).unwrap();
    let loaded = repo.get_note(note.uuid).unwrap().unwrap();
    assert_eq!(loaded.title, "written in background");
}

#[test]
fn ephemeral_background_writes_are_visible_on_main_connection() {
    let mut store = Store::open(&StoreConfig::ephemeral()).unwrap();

    {
        let mut background = store.background_connection().unwrap();
        let mut repo = SqliteNoteRepository::try_new(&mut background).unwrap();
        assert_eq!(seed_sample_notes(&mut repo, 4), 4);
    }

    let repo = SqliteNoteRepository::try_new(store.connection_mut()).unwrap();
    assert_eq!(repo.count_notes().unwrap(), 4);
}

#[test]
fn file_store_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::file(dir.path().join("notes.db"));

    {
        let mut store = Store::open(&config).unwrap();
        let mut repo = SqliteNoteRepository::try_new(store.connection_mut()).unwrap();
        assert_eq!(seed_sample_notes(&mut repo, 2), 2);
    }

    let mut reopened = Store::open(&config).unwrap();
    let repo = SqliteNoteRepository::try_new(reopened.connection_mut()).unwrap();
    assert_eq!(repo.count_notes().unwrap(), 2);
}

#[test]
fn open_reports_unloadable_store() {
    let dir = tempfile::tempdir().unwrap();
    // SQLite never creates missing parent directories.
    let result = Store::open(&StoreConfig::file(dir.path().join("missing/notes.db")));
    assert!(result.is_err());
}
