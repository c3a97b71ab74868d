mod connectivity;
mod status;

pub use connectivity::{
    Connectivity, ConnectivityEvent, ConnectivityWatch, ProbeConnectivity, ToggleConnectivity,
};
pub use status::{SyncOperation, SyncStatus, SyncStatusObserver};

use notesync_api::{NotesApi, is_not_found};
use notesync_core::{LoadPolicy, Note, NoteResult};
use notesync_store::NoteCache;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};

/// Snapshot of the store's sync bookkeeping, for status output.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub online: bool,
    pub load_policy: LoadPolicy,
    pub cached_notes: usize,
    pub pending_notes: usize,
    pub last_sync_at: Option<String>,
    pub last_sync_status: Option<String>,
    pub last_error: Option<String>,
}

/// Single point of access to notes.
///
/// Every operation reads connectivity afresh and then either talks to the
/// remote service (mirroring the result into the cache) or to the cache alone.
/// Nothing is retried or queued; a failed online call leaves the cache as it
/// was and surfaces the error.
pub struct SyncStore {
    api: NotesApi,
    cache: NoteCache,
    connectivity: Arc<dyn Connectivity>,
    observers: Vec<Box<dyn SyncStatusObserver>>,
    load_policy: LoadPolicy,
}

impl SyncStore {
    pub fn new(api: NotesApi, cache: NoteCache, connectivity: Arc<dyn Connectivity>) -> Self {
        Self {
            api,
            cache,
            connectivity,
            observers: Vec::new(),
            load_policy: LoadPolicy::default(),
        }
    }

    pub fn with_load_policy(mut self, load_policy: LoadPolicy) -> Self {
        self.load_policy = load_policy;
        self
    }

    pub fn subscribe(&mut self, observer: Box<dyn SyncStatusObserver>) {
        self.observers.push(observer);
    }

    pub fn subscribe_channel(&mut self) -> Receiver<SyncStatus> {
        let (sender, receiver) = mpsc::channel();
        self.subscribe(Box::new(sender));
        receiver
    }

    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    pub fn connectivity(&self) -> &dyn Connectivity {
        self.connectivity.as_ref()
    }

    pub fn cache(&self) -> &NoteCache {
        &self.cache
    }

    pub fn load_policy(&self) -> LoadPolicy {
        self.load_policy
    }

    pub fn create(&self, note: Note) -> NoteResult<Note> {
        if !self.is_online() {
            tracing::info!(id = %note.id, "offline: creating note in local cache only");
            let mut note = note;
            note.synced = false;
            self.cache.put(&note)?;
            return Ok(note);
        }

        self.remote(SyncOperation::Create, || {
            let mut saved = self.api.create_note(&note)?;
            saved.synced = true;
            self.cache.put(&saved)?;
            Ok(saved)
        })
    }

    pub fn load_all(&self) -> NoteResult<Vec<Note>> {
        if !self.is_online() {
            tracing::info!("offline: loading notes from local cache");
            return self.cache.load_all();
        }

        let pending = match self.load_policy {
            LoadPolicy::Replace => Vec::new(),
            LoadPolicy::Reconcile => self.cache.load_pending()?,
        };

        self.remote(SyncOperation::LoadAll, || {
            let mut notes = self.api.list_notes()?;
            if !pending.is_empty() {
                self.push_pending(&mut notes, pending)?;
            }

            for note in &mut notes {
                note.synced = true;
            }
            self.cache.replace_all(&notes)?;
            tracing::info!(count = notes.len(), policy = %self.load_policy, "loaded notes from remote");
            Ok(notes)
        })
    }

    pub fn update(&self, note: Note) -> NoteResult<Note> {
        if !self.is_online() {
            tracing::info!(id = %note.id, "offline: updating note in local cache only");
            let mut note = note;
            note.synced = false;
            self.cache.put(&note)?;
            return Ok(note);
        }

        self.remote(SyncOperation::Update, || {
            let mut saved = match self.api.update_note(&note) {
                Ok(saved) => saved,
                Err(err) if is_not_found(&err) && self.is_pending(&note.id)? => {
                    tracing::info!(id = %note.id, "note never reached the server; creating it");
                    self.api.create_note(&note)?
                }
                Err(err) => return Err(err),
            };
            saved.synced = true;
            self.cache.put(&saved)?;
            Ok(saved)
        })
    }

    pub fn delete(&self, id: &str) -> NoteResult<()> {
        if !self.is_online() {
            tracing::info!(%id, "offline: deleting note from local cache only");
            return self.cache.delete(id);
        }

        self.remote(SyncOperation::Delete, || {
            match self.api.delete_note(id) {
                Ok(()) => {}
                Err(err) if is_not_found(&err) && self.is_pending(id)? => {
                    tracing::info!(%id, "note never reached the server; deleting local copy");
                }
                Err(err) => return Err(err),
            }
            self.cache.delete(id)
        })
    }

    pub fn status(&self) -> NoteResult<SyncReport> {
        let notes = self.cache.load_all()?;
        let bookkeeping = self.cache.load_bookkeeping()?;

        Ok(SyncReport {
            online: self.is_online(),
            load_policy: self.load_policy,
            cached_notes: notes.len(),
            pending_notes: notes.iter().filter(|note| !note.synced).count(),
            last_sync_at: bookkeeping.last_sync_at,
            last_sync_status: bookkeeping.last_sync_status,
            last_error: bookkeeping.last_error,
        })
    }

    /// A cached note that has only been written locally.
    fn is_pending(&self, id: &str) -> NoteResult<bool> {
        Ok(self.cache.get(id)?.is_some_and(|note| !note.synced))
    }

    /// Pushes notes that were only written locally. A pending note whose id is
    /// already known remotely is sent as an update, otherwise as a create; the
    /// local version wins either way.
    fn push_pending(&self, remote: &mut Vec<Note>, pending: Vec<Note>) -> NoteResult<()> {
        let known: HashSet<String> = remote.iter().map(|note| note.id.clone()).collect();
        tracing::info!(pending = pending.len(), "pushing locally pending notes");

        for note in pending {
            let saved = if known.contains(&note.id) {
                self.api.update_note(&note)?
            } else {
                self.api.create_note(&note)?
            };

            remote.retain(|existing| existing.id != note.id && existing.id != saved.id);
            remote.push(saved);
        }

        Ok(())
    }

    fn remote<T>(
        &self,
        operation: SyncOperation,
        run: impl FnOnce() -> NoteResult<T>,
    ) -> NoteResult<T> {
        self.broadcast(SyncStatus::Started { operation });
        let result = run();
        self.record_outcome(operation, &result);
        self.broadcast(SyncStatus::Finished {
            operation,
            ok: result.is_ok(),
        });
        result
    }

    fn record_outcome<T>(&self, operation: SyncOperation, result: &NoteResult<T>) {
        let mut bookkeeping = match self.cache.load_bookkeeping() {
            Ok(state) => state,
            Err(err) => {
                tracing::warn!(error = %err, "could not read sync bookkeeping");
                return;
            }
        };

        match result {
            Ok(_) => bookkeeping.mark_ok(),
            Err(err) => {
                tracing::warn!(?operation, error = %err, "remote operation failed");
                bookkeeping.mark_error(&err.message);
            }
        }

        if let Err(err) = self.cache.save_bookkeeping(&bookkeeping) {
            tracing::warn!(error = %err, "could not persist sync bookkeeping");
        }
    }

    fn broadcast(&self, status: SyncStatus) {
        tracing::debug!(?status, "sync status");
        for observer in &self.observers {
            observer.on_sync_status(status);
        }
    }
}
