mod clock;
mod session;

pub use clock::{Clock, ManualClock, SystemClock};
pub use session::{EditField, EditSession, PendingSave};

use notesync_core::{Note, NoteError, NoteResult, sort_by_recent};
use notesync_sync::{ConnectivityEvent, SyncStore};
use std::time::{Duration, Instant};

pub const DEFAULT_AUTOSAVE_DELAY: Duration = Duration::from_secs(5);

/// Holds the working set of notes, the search query and at most one edit
/// session.
///
/// The controller is driven from a single event loop: the host forwards user
/// actions, calls [`NoteListController::run_pending`] when the deadline from
/// [`NoteListController::next_deadline`] passes, and forwards connectivity
/// edges through [`NoteListController::handle_connectivity`].
pub struct NoteListController<C: Clock = SystemClock> {
    store: SyncStore,
    clock: C,
    autosave_delay: Duration,
    notes: Vec<Note>,
    query: String,
    session: Option<EditSession>,
}

impl NoteListController<SystemClock> {
    pub fn new(store: SyncStore, autosave_delay: Duration) -> Self {
        Self::with_clock(store, autosave_delay, SystemClock)
    }
}

impl<C: Clock> NoteListController<C> {
    pub fn with_clock(store: SyncStore, autosave_delay: Duration, clock: C) -> Self {
        Self {
            store,
            clock,
            autosave_delay,
            notes: Vec::new(),
            query: String::new(),
            session: None,
        }
    }

    pub fn store(&self) -> &SyncStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut SyncStore {
        &mut self.store
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn find(&self, id: &str) -> Option<&Note> {
        self.notes.iter().find(|note| note.id == id)
    }

    pub fn refresh(&mut self) -> NoteResult<()> {
        let mut notes = self.store.load_all()?;
        sort_by_recent(&mut notes);
        tracing::debug!(count = notes.len(), "refreshed note list");
        self.notes = notes;
        Ok(())
    }

    pub fn add_note(
        &mut self,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> NoteResult<Note> {
        let created = self.store.create(Note::new(title, content))?;
        self.refresh()?;
        Ok(created)
    }

    pub fn delete_note(&mut self, id: &str) -> NoteResult<()> {
        self.store.delete(id)?;
        self.refresh()
    }

    pub fn set_search_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    pub fn search_query(&self) -> &str {
        &self.query
    }

    /// Notes whose title or content contains the query, ignoring case.
    pub fn visible_notes(&self) -> Vec<&Note> {
        self.notes
            .iter()
            .filter(|note| note.matches(&self.query))
            .collect()
    }

    pub fn editing(&self) -> Option<&Note> {
        self.session.as_ref().map(EditSession::note)
    }

    /// Starts editing `note`. Switching to a different note drops the previous
    /// session, pending autosave included, without saving it. Re-opening the
    /// note already under edit keeps the current session.
    pub fn begin_edit(&mut self, note: Note) {
        if let Some(current) = &self.session {
            if current.note().id == note.id {
                return;
            }
            if current.pending().is_some() {
                tracing::warn!(
                    id = %current.note().id,
                    "switching notes discards an unsaved pending edit"
                );
            }
        }

        tracing::debug!(id = %note.id, "edit session started");
        self.session = Some(EditSession::new(note));
    }

    /// Applies a field change and restarts the autosave countdown.
    pub fn update_edit_field(
        &mut self,
        field: EditField,
        value: impl Into<String>,
    ) -> NoteResult<()> {
        let deadline = self.clock.now() + self.autosave_delay;
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| NoteError::usage("no note is being edited"))?;

        session.apply(field, value.into(), PendingSave::at(deadline));
        Ok(())
    }

    /// Ends the edit session. Returns `true` when a pending change was
    /// discarded.
    pub fn close_editor(&mut self) -> bool {
        let Some(session) = self.session.take() else {
            return false;
        };

        let discarded = session.pending().is_some();
        if discarded {
            tracing::warn!(id = %session.note().id, "editor closed before autosave; change discarded");
        }
        discarded
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.session
            .as_ref()
            .and_then(EditSession::pending)
            .map(|save| save.deadline())
    }

    /// Fires the autosave if its countdown has elapsed.
    pub fn run_pending(&mut self) -> NoteResult<Option<Note>> {
        let now = self.clock.now();
        let due = self
            .session
            .as_mut()
            .and_then(|session| session.take_due(now));

        match due {
            Some(note) => self.persist_edit(note).map(Some),
            None => Ok(None),
        }
    }

    /// Saves the pending change immediately instead of waiting for the countdown.
    pub fn save_now(&mut self) -> NoteResult<Option<Note>> {
        let pending = self.session.as_mut().and_then(EditSession::take_any);

        match pending {
            Some(note) => self.persist_edit(note).map(Some),
            None => Ok(None),
        }
    }

    pub fn handle_connectivity(&mut self, event: ConnectivityEvent) -> NoteResult<()> {
        match event {
            ConnectivityEvent::CameOnline => {
                tracing::info!("connectivity regained; refreshing notes");
                self.refresh()
            }
            ConnectivityEvent::WentOffline => {
                tracing::info!("working offline");
                Ok(())
            }
        }
    }

    fn persist_edit(&mut self, note: Note) -> NoteResult<Note> {
        tracing::info!(id = %note.id, "autosaving note");
        let saved = self.store.update(note)?;

        if let Some(session) = self.session.as_mut()
            && session.note().id == saved.id
            && session.pending().is_none()
        {
            session.replace_note(saved.clone());
        }

        self.refresh()?;
        Ok(saved)
    }
}
