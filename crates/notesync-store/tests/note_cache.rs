use chrono::{TimeZone, Utc};
use notesync_core::Note;
use notesync_fs::init_workspace;
use notesync_store::{NoteCache, SyncBookkeeping};

fn fixture_note(id: &str, synced: bool) -> Note {
    Note {
        id: id.to_string(),
        title: format!("title {id}"),
        content: format!("content {id}"),
        updated_at: Utc
            .with_ymd_and_hms(2025, 3, 1, 10, 0, 0)
            .single()
            .expect("timestamp"),
        synced,
    }
}

fn open_cache(temp: &tempfile::TempDir) -> NoteCache {
    let root = temp.path().join("workspace");
    let init = init_workspace(Some(&root), None).expect("init workspace");
    NoteCache::from_workspace(&init.paths).expect("note cache")
}

#[test]
fn put_get_delete_round_trip() {
    let temp = tempfile::tempdir().expect("tempdir");
    let cache = open_cache(&temp);

    cache.put(&fixture_note("n1", false)).expect("put");
    let loaded = cache.get("n1").expect("get").expect("cached note");
    assert_eq!(loaded.title, "title n1");
    assert!(!loaded.synced);

    let mut edited = loaded.clone();
    edited.set_content("rewritten");
    cache.put(&edited).expect("overwrite");
    assert_eq!(cache.load_all().expect("load all").len(), 1);
    assert_eq!(
        cache.get("n1").expect("get").expect("note").content,
        "rewritten"
    );

    cache.delete("n1").expect("delete");
    assert!(cache.get("n1").expect("get after delete").is_none());
}

#[test]
fn delete_unknown_id_is_a_no_op() {
    let temp = tempfile::tempdir().expect("tempdir");
    let cache = open_cache(&temp);

    cache.put(&fixture_note("keep", true)).expect("put");
    cache.delete("does-not-exist").expect("delete unknown");
    assert_eq!(cache.load_all().expect("load all").len(), 1);
}

#[test]
fn replace_all_overwrites_contents() {
    let temp = tempfile::tempdir().expect("tempdir");
    let cache = open_cache(&temp);

    cache.put(&fixture_note("old-1", false)).expect("put");
    cache.put(&fixture_note("old-2", true)).expect("put");

    cache
        .replace_all(&[fixture_note("new-1", true), fixture_note("new-2", true)])
        .expect("replace all");

    let ids: Vec<String> = cache
        .load_all()
        .expect("load all")
        .into_iter()
        .map(|note| note.id)
        .collect();
    assert_eq!(ids, vec!["new-1".to_string(), "new-2".to_string()]);

    cache.clear().expect("clear");
    assert!(cache.load_all().expect("load all").is_empty());
}

#[test]
fn pending_notes_are_the_unsynced_ones() {
    let temp = tempfile::tempdir().expect("tempdir");
    let cache = open_cache(&temp);

    cache.put(&fixture_note("a", true)).expect("put");
    cache.put(&fixture_note("b", false)).expect("put");

    let pending = cache.load_pending().expect("pending");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, "b");
}

#[test]
fn cache_survives_reopen() {
    let temp = tempfile::tempdir().expect("tempdir");
    let root = temp.path().join("workspace");
    let init = init_workspace(Some(&root), None).expect("init workspace");

    {
        let cache = NoteCache::from_workspace(&init.paths).expect("note cache");
        cache.put(&fixture_note("persisted", false)).expect("put");
        let mut state = SyncBookkeeping::default();
        state.mark_ok();
        cache.save_bookkeeping(&state).expect("save bookkeeping");
    }

    let reopened = NoteCache::from_workspace(&init.paths).expect("reopen cache");
    assert!(reopened.get("persisted").expect("get").is_some());
    assert_eq!(
        reopened
            .load_bookkeeping()
            .expect("bookkeeping")
            .last_sync_status
            .as_deref(),
        Some("ok")
    );
}

#[test]
fn corrupted_database_reports_rebuild_hint() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("cache.db");
    std::fs::write(&path, b"this is definitely not sqlite, just some padding bytes here")
        .expect("write junk");

    let error = NoteCache::open(&path).expect_err("junk is not a database");
    assert_eq!(error.kind, notesync_core::ErrorKind::Io);
    assert!(error.message.contains("corrupted"));
}
