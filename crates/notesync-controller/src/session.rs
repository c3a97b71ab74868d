use notesync_core::{Note, NoteError};
use std::str::FromStr;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditField {
    Title,
    Content,
}

impl FromStr for EditField {
    type Err = NoteError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "title" => Ok(Self::Title),
            "content" => Ok(Self::Content),
            other => Err(NoteError::usage(format!(
                "unknown note field '{other}'; expected 'title' or 'content'"
            ))),
        }
    }
}

/// Handle for a scheduled autosave. Dropping it cancels the save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingSave {
    deadline: Instant,
}

impl PendingSave {
    pub fn at(deadline: Instant) -> Self {
        Self { deadline }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.deadline
    }
}

/// The single note under edit and its pending autosave, if any.
#[derive(Debug, Clone)]
pub struct EditSession {
    note: Note,
    pending: Option<PendingSave>,
}

impl EditSession {
    pub fn new(note: Note) -> Self {
        Self {
            note,
            pending: None,
        }
    }

    pub fn note(&self) -> &Note {
        &self.note
    }

    pub fn pending(&self) -> Option<PendingSave> {
        self.pending
    }

    pub(crate) fn apply(&mut self, field: EditField, value: String, save: PendingSave) {
        match field {
            EditField::Title => self.note.set_title(value),
            EditField::Content => self.note.set_content(value),
        }
        self.pending = Some(save);
    }

    pub(crate) fn take_due(&mut self, now: Instant) -> Option<Note> {
        match self.pending {
            Some(save) if save.is_due(now) => {
                self.pending = None;
                Some(self.note.clone())
            }
            _ => None,
        }
    }

    pub(crate) fn take_any(&mut self) -> Option<Note> {
        self.pending.take().map(|_| self.note.clone())
    }

    pub(crate) fn replace_note(&mut self, note: Note) {
        self.note = note;
    }
}
