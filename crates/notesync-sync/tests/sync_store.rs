use httpmock::Method::{DELETE, GET, POST, PUT};
use httpmock::MockServer;
use notesync_api::NotesApi;
use notesync_core::{ErrorKind, LoadPolicy, Note};
use notesync_fs::init_workspace;
use notesync_store::NoteCache;
use notesync_sync::{SyncOperation, SyncStatus, SyncStore, ToggleConnectivity};
use serde_json::json;
use std::sync::Arc;
use std::sync::mpsc::Receiver;
use tempfile::TempDir;

struct Harness {
    _temp: TempDir,
    server: MockServer,
    cache: NoteCache,
    network: Arc<ToggleConnectivity>,
    store: SyncStore,
    statuses: Receiver<SyncStatus>,
}

fn harness(online: bool, policy: LoadPolicy) -> Harness {
    let temp = tempfile::tempdir().expect("tempdir");
    let server = MockServer::start();
    let init = init_workspace(Some(&temp.path().join("workspace")), Some(&server.base_url()))
        .expect("init workspace");

    let cache = NoteCache::from_workspace(&init.paths).expect("note cache");
    let api = NotesApi::new(&server.base_url()).expect("api client");
    let network = Arc::new(ToggleConnectivity::new(online));
    let mut store = SyncStore::new(api, cache.clone(), network.clone()).with_load_policy(policy);
    let statuses = store.subscribe_channel();

    Harness {
        _temp: temp,
        server,
        cache,
        network,
        store,
        statuses,
    }
}

fn drain(statuses: &Receiver<SyncStatus>) -> Vec<SyncStatus> {
    statuses.try_iter().collect()
}

fn remote_note(id: &str, title: &str) -> serde_json::Value {
    json!({
        "id": id,
        "title": title,
        "content": format!("{title} body"),
        "updatedAt": "2025-03-01T10:00:00.000Z",
        "synced": false
    })
}

#[test]
fn offline_create_is_visible_to_offline_load_all() {
    let h = harness(false, LoadPolicy::Reconcile);
    let any_request = h.server.mock(|_when, then| {
        then.status(500);
    });

    let note = Note::new("Offline idea", "write it down");
    let created = h.store.create(note.clone()).expect("offline create");
    assert_eq!(created, note);

    let loaded = h.store.load_all().expect("offline load");
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].id, note.id);
    assert!(!loaded[0].synced);

    any_request.assert_hits(0);
    assert!(drain(&h.statuses).is_empty(), "offline calls emit no sync status");
}

#[test]
fn online_create_takes_server_representation() {
    let h = harness(true, LoadPolicy::Reconcile);
    let create = h.server.mock(|when, then| {
        when.method(POST).path("/notes");
        then.status(201).json_body(remote_note("server-42", "Groceries"));
    });

    let created = h
        .store
        .create(Note::new("Groceries", "milk"))
        .expect("online create");
    create.assert_hits(1);
    assert_eq!(created.id, "server-42");
    assert!(created.synced);

    h.network.set_online(false);
    let loaded = h.store.load_all().expect("offline load");
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].id, "server-42");

    assert_eq!(
        drain(&h.statuses),
        vec![
            SyncStatus::Started {
                operation: SyncOperation::Create
            },
            SyncStatus::Finished {
                operation: SyncOperation::Create,
                ok: true
            },
        ]
    );
}

#[test]
fn online_create_failure_skips_local_write_and_still_finishes() {
    let h = harness(true, LoadPolicy::Reconcile);
    h.server.mock(|when, then| {
        when.method(POST).path("/notes");
        then.status(503).body("maintenance");
    });

    let error = h
        .store
        .create(Note::new("Lost", "never stored"))
        .expect_err("remote failure");
    assert_eq!(error.kind, ErrorKind::Remote);
    assert!(h.cache.load_all().expect("cache").is_empty());

    assert_eq!(
        drain(&h.statuses),
        vec![
            SyncStatus::Started {
                operation: SyncOperation::Create
            },
            SyncStatus::Finished {
                operation: SyncOperation::Create,
                ok: false
            },
        ]
    );

    let report = h.store.status().expect("status");
    assert!(
        report
            .last_sync_status
            .as_deref()
            .is_some_and(|status| status.starts_with("error:"))
    );
}

#[test]
fn replace_policy_discards_notes_created_offline() {
    let h = harness(false, LoadPolicy::Replace);
    let list = h.server.mock(|when, then| {
        when.method(GET).path("/notes");
        then.status(200).json_body(json!([remote_note("remote-1", "From server")]));
    });

    let offline = h
        .store
        .create(Note::new("Drafted on a plane", ""))
        .expect("offline create");

    h.network.set_online(true);
    let loaded = h.store.load_all().expect("online load");
    list.assert_hits(1);

    // Destructive overwrite: the offline note is gone from both views.
    assert!(loaded.iter().all(|note| note.id != offline.id));
    assert!(h.cache.get(&offline.id).expect("cache lookup").is_none());
    assert_eq!(h.cache.load_all().expect("cache").len(), 1);
}

#[test]
fn reconcile_policy_pushes_notes_created_offline() {
    let h = harness(false, LoadPolicy::Reconcile);
    let offline = h
        .store
        .create(Note::new("Drafted on a plane", "keep me"))
        .expect("offline create");

    let list = h.server.mock(|when, then| {
        when.method(GET).path("/notes");
        then.status(200).json_body(json!([remote_note("remote-1", "From server")]));
    });
    let offline_id = offline.id.clone();
    let push = h.server.mock(|when, then| {
        when.method(POST)
            .path("/notes")
            .json_body_partial(json!({"id": offline_id, "content": "keep me"}).to_string());
        then.status(201).json_body(json!({
            "id": offline.id,
            "title": "Drafted on a plane",
            "content": "keep me",
            "updatedAt": "2025-03-02T08:00:00Z",
            "synced": false
        }));
    });

    h.network.set_online(true);
    let loaded = h.store.load_all().expect("online load");
    list.assert_hits(1);
    push.assert_hits(1);

    assert_eq!(loaded.len(), 2);
    let survivor = h
        .cache
        .get(&offline.id)
        .expect("cache lookup")
        .expect("offline note survives");
    assert!(survivor.synced);
    assert!(h.cache.load_pending().expect("pending").is_empty());
}

#[test]
fn reconcile_policy_updates_pending_notes_known_remotely() {
    let h = harness(false, LoadPolicy::Reconcile);
    let mut edited: Note =
        serde_json::from_value(remote_note("remote-1", "Old title")).expect("note");
    edited.set_title("Edited offline");
    h.store.update(edited).expect("offline update");

    h.server.mock(|when, then| {
        when.method(GET).path("/notes");
        then.status(200).json_body(json!([remote_note("remote-1", "Old title")]));
    });
    let put = h.server.mock(|when, then| {
        when.method(PUT)
            .path("/notes/remote-1")
            .json_body_partial(json!({"title": "Edited offline"}).to_string());
        then.status(200).json_body(remote_note("remote-1", "Edited offline"));
    });

    h.network.set_online(true);
    let loaded = h.store.load_all().expect("online load");
    put.assert_hits(1);
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].title, "Edited offline");
}

#[test]
fn failed_load_all_leaves_cache_untouched() {
    let h = harness(false, LoadPolicy::Replace);
    h.store
        .create(Note::new("Local", "only"))
        .expect("offline create");

    h.server.mock(|when, then| {
        when.method(GET).path("/notes");
        then.status(500);
    });

    h.network.set_online(true);
    let error = h.store.load_all().expect_err("remote failure");
    assert!(error.is_remote());
    assert_eq!(h.cache.load_all().expect("cache").len(), 1);

    let statuses = drain(&h.statuses);
    assert_eq!(statuses.len(), 2);
    assert!(statuses[0].is_syncing());
    assert_eq!(
        statuses[1],
        SyncStatus::Finished {
            operation: SyncOperation::LoadAll,
            ok: false
        }
    );
}

#[test]
fn update_online_persists_response_and_offline_marks_pending() {
    let h = harness(true, LoadPolicy::Reconcile);
    let put = h.server.mock(|when, then| {
        when.method(PUT).path("/notes/n-1");
        then.status(200).json_body(remote_note("n-1", "Server says"));
    });

    let mut note: Note = serde_json::from_value(remote_note("n-1", "Mine")).expect("note");
    note.synced = true;
    let saved = h.store.update(note.clone()).expect("online update");
    put.assert_hits(1);
    assert_eq!(saved.title, "Server says");
    assert_eq!(
        h.cache.get("n-1").expect("get").expect("note").title,
        "Server says"
    );

    h.network.set_online(false);
    note.set_content("edited offline");
    let local = h.store.update(note).expect("offline update");
    assert!(!local.synced);
    assert_eq!(h.cache.load_pending().expect("pending").len(), 1);
}

#[test]
fn delete_online_hits_remote_then_cache() {
    let h = harness(true, LoadPolicy::Reconcile);
    h.server.mock(|when, then| {
        when.method(POST).path("/notes");
        then.status(201).json_body(remote_note("doomed", "Doomed"));
    });
    let delete = h.server.mock(|when, then| {
        when.method(DELETE).path("/notes/doomed");
        then.status(200);
    });

    h.store.create(Note::new("Doomed", "")).expect("create");
    h.store.delete("doomed").expect("delete");

    delete.assert_hits(1);
    assert!(h.cache.get("doomed").expect("get").is_none());
}

#[test]
fn delete_unknown_id_offline_is_a_no_op() {
    let h = harness(false, LoadPolicy::Reconcile);
    h.store.create(Note::new("Keep", "")).expect("create");

    h.store.delete("missing").expect("delete unknown");
    assert_eq!(h.store.load_all().expect("load").len(), 1);
}

#[test]
fn status_counts_pending_notes() {
    let h = harness(false, LoadPolicy::Replace);
    h.store.create(Note::new("a", "")).expect("create");
    h.store.create(Note::new("b", "")).expect("create");

    let report = h.store.status().expect("status");
    assert!(!report.online);
    assert_eq!(report.cached_notes, 2);
    assert_eq!(report.pending_notes, 2);
    assert_eq!(report.load_policy, LoadPolicy::Replace);
    assert!(report.last_sync_at.is_none());
}

#[test]
fn online_update_failure_skips_local_write() {
    let h = harness(true, LoadPolicy::Reconcile);
    let cached: Note = serde_json::from_value(remote_note("n-1", "Cached")).expect("note");
    h.cache.put(&cached).expect("seed cache");
    h.server.mock(|when, then| {
        when.method(PUT).path("/notes/n-1");
        then.status(500).body("boom");
    });

    let mut edited = cached.clone();
    edited.set_title("Never stored");
    let error = h.store.update(edited).expect_err("remote failure");
    assert!(error.is_remote());
    assert_eq!(h.cache.get("n-1").expect("get"), Some(cached));

    assert_eq!(
        drain(&h.statuses),
        vec![
            SyncStatus::Started {
                operation: SyncOperation::Update
            },
            SyncStatus::Finished {
                operation: SyncOperation::Update,
                ok: false
            },
        ]
    );
}

#[test]
fn online_delete_failure_keeps_cached_note() {
    let h = harness(true, LoadPolicy::Reconcile);
    let mut cached: Note = serde_json::from_value(remote_note("n-1", "Cached")).expect("note");
    cached.synced = true;
    h.cache.put(&cached).expect("seed cache");
    let delete = h.server.mock(|when, then| {
        when.method(DELETE).path("/notes/n-1");
        then.status(500);
    });

    let error = h.store.delete("n-1").expect_err("remote failure");
    assert!(error.is_remote());
    delete.assert_hits(1);
    assert!(h.cache.get("n-1").expect("get").is_some());

    assert_eq!(
        drain(&h.statuses),
        vec![
            SyncStatus::Started {
                operation: SyncOperation::Delete
            },
            SyncStatus::Finished {
                operation: SyncOperation::Delete,
                ok: false
            },
        ]
    );
}

#[test]
fn online_delete_of_synced_note_missing_remotely_is_an_error() {
    let h = harness(true, LoadPolicy::Reconcile);
    let mut cached: Note = serde_json::from_value(remote_note("n-1", "Cached")).expect("note");
    cached.synced = true;
    h.cache.put(&cached).expect("seed cache");
    h.server.mock(|when, then| {
        when.method(DELETE).path("/notes/n-1");
        then.status(404).json_body(json!({}));
    });

    let error = h.store.delete("n-1").expect_err("not found");
    assert!(error.message.contains("http_status=404"));
    assert!(h.cache.get("n-1").expect("get").is_some());
}

#[test]
fn online_delete_of_note_created_offline_removes_it_locally() {
    let h = harness(false, LoadPolicy::Reconcile);
    let offline = h
        .store
        .create(Note::new("Second thoughts", ""))
        .expect("offline create");

    let path = format!("/notes/{}", offline.id);
    let delete = h.server.mock(|when, then| {
        when.method(DELETE).path(path.as_str());
        then.status(404).json_body(json!({}));
    });

    h.network.set_online(true);
    h.store.delete(&offline.id).expect("delete never-synced note");
    delete.assert_hits(1);
    assert!(h.cache.get(&offline.id).expect("get").is_none());

    let statuses = drain(&h.statuses);
    assert_eq!(
        statuses.last(),
        Some(&SyncStatus::Finished {
            operation: SyncOperation::Delete,
            ok: true
        })
    );
}

#[test]
fn online_update_of_note_created_offline_falls_back_to_create() {
    let h = harness(false, LoadPolicy::Reconcile);
    let offline = h
        .store
        .create(Note::new("Draft", ""))
        .expect("offline create");

    let path = format!("/notes/{}", offline.id);
    let put = h.server.mock(|when, then| {
        when.method(PUT).path(path.as_str());
        then.status(404).json_body(json!({}));
    });
    let offline_id = offline.id.clone();
    let post = h.server.mock(|when, then| {
        when.method(POST)
            .path("/notes")
            .json_body_partial(json!({"id": offline_id, "title": "Draft, edited"}).to_string());
        then.status(201).json_body(json!({
            "id": offline.id,
            "title": "Draft, edited",
            "content": "",
            "updatedAt": "2025-03-02T08:00:00Z"
        }));
    });

    h.network.set_online(true);
    let mut edited = offline.clone();
    edited.set_title("Draft, edited");
    let saved = h.store.update(edited).expect("update falls back to create");

    put.assert_hits(1);
    post.assert_hits(1);
    assert!(saved.synced);
    assert!(h.cache.load_pending().expect("pending").is_empty());
    assert_eq!(
        h.cache.get(&offline.id).expect("get").expect("note").title,
        "Draft, edited"
    );
}
