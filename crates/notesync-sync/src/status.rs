use serde::Serialize;
use std::sync::mpsc::Sender;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOperation {
    Create,
    LoadAll,
    Update,
    Delete,
}

/// Emitted around every online-path call of the sync store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SyncStatus {
    Started { operation: SyncOperation },
    Finished { operation: SyncOperation, ok: bool },
}

impl SyncStatus {
    pub fn is_syncing(&self) -> bool {
        matches!(self, Self::Started { .. })
    }
}

pub trait SyncStatusObserver {
    fn on_sync_status(&self, status: SyncStatus);
}

impl SyncStatusObserver for Sender<SyncStatus> {
    fn on_sync_status(&self, status: SyncStatus) {
        // A dropped receiver just means nobody is listening anymore.
        let _ = self.send(status);
    }
}
