use chrono::Utc;
use notesync_core::{Note, NoteError, NoteResult};
use notesync_fs::WorkspacePaths;
use rusqlite::{Connection, Error as SqlError, ErrorCode, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const STATE_KEY: &str = "default";

/// Bookkeeping about the most recent online operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncBookkeeping {
    pub last_sync_at: Option<String>,
    pub last_sync_status: Option<String>,
    pub last_error: Option<String>,
}

impl SyncBookkeeping {
    pub fn mark_ok(&mut self) {
        self.last_sync_at = Some(Utc::now().to_rfc3339());
        self.last_sync_status = Some("ok".to_string());
        self.last_error = None;
    }

    pub fn mark_error(&mut self, message: &str) {
        self.last_sync_status = Some(format!("error: {message}"));
        self.last_error = Some(message.to_string());
    }
}

/// Local durable key-value table of notes, keyed by note id.
///
/// Each call opens its own connection; individual puts and deletes are atomic,
/// and [`NoteCache::replace_all`] runs in one transaction.
#[derive(Debug, Clone)]
pub struct NoteCache {
    db_path: PathBuf,
}

impl NoteCache {
    pub fn from_workspace(paths: &WorkspacePaths) -> NoteResult<Self> {
        Self::open(&paths.cache_db_path)
    }

    pub fn open(db_path: &Path) -> NoteResult<Self> {
        let cache = Self {
            db_path: db_path.to_path_buf(),
        };

        let conn = cache.connection()?;
        cache.initialize_schema(&conn)?;

        Ok(cache)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn put(&self, note: &Note) -> NoteResult<()> {
        let payload = encode_note(note)?;
        let conn = self.connection()?;
        conn.execute(
            "INSERT INTO notes (id, payload_json, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET payload_json = excluded.payload_json, updated_at = excluded.updated_at",
            params![note.id, payload, note.updated_at.to_rfc3339()],
        )
        .map_err(|err| sqlite_error("save note", &self.db_path, err))?;

        tracing::debug!(id = %note.id, synced = note.synced, "cached note");
        Ok(())
    }

    pub fn get(&self, id: &str) -> NoteResult<Option<Note>> {
        let conn = self.connection()?;
        let payload = conn
            .query_row(
                "SELECT payload_json FROM notes WHERE id = ?1",
                params![id],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map_err(|err| sqlite_error("load note", &self.db_path, err))?;

        payload
            .map(|payload| decode_note(&payload, &self.db_path))
            .transpose()
    }

    pub fn load_all(&self) -> NoteResult<Vec<Note>> {
        let conn = self.connection()?;
        let mut statement = conn
            .prepare("SELECT payload_json FROM notes ORDER BY id ASC")
            .map_err(|err| sqlite_error("prepare cached notes query", &self.db_path, err))?;

        let rows = statement
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|err| sqlite_error("query cached notes", &self.db_path, err))?;

        let mut notes = Vec::new();
        for row in rows {
            let payload =
                row.map_err(|err| sqlite_error("read cached note row", &self.db_path, err))?;
            notes.push(decode_note(&payload, &self.db_path)?);
        }

        Ok(notes)
    }

    /// Notes written locally that the remote service has not acknowledged.
    pub fn load_pending(&self) -> NoteResult<Vec<Note>> {
        Ok(self
            .load_all()?
            .into_iter()
            .filter(|note| !note.synced)
            .collect())
    }

    /// Removes the note if present. Unknown ids are not an error.
    pub fn delete(&self, id: &str) -> NoteResult<()> {
        let conn = self.connection()?;
        let removed = conn
            .execute("DELETE FROM notes WHERE id = ?1", params![id])
            .map_err(|err| sqlite_error("delete note", &self.db_path, err))?;

        tracing::debug!(%id, removed, "deleted cached note");
        Ok(())
    }

    pub fn clear(&self) -> NoteResult<()> {
        let conn = self.connection()?;
        conn.execute("DELETE FROM notes", [])
            .map_err(|err| sqlite_error("clear cached notes", &self.db_path, err))?;
        Ok(())
    }

    /// Clear-then-insert inside a single transaction.
    pub fn replace_all(&self, notes: &[Note]) -> NoteResult<()> {
        let mut conn = self.connection()?;
        let transaction = conn
            .transaction()
            .map_err(|err| sqlite_error("start cache transaction", &self.db_path, err))?;

        transaction
            .execute("DELETE FROM notes", [])
            .map_err(|err| sqlite_error("clear cached notes", &self.db_path, err))?;

        for note in notes {
            let payload = encode_note(note)?;
            transaction
                .execute(
                    "INSERT OR REPLACE INTO notes (id, payload_json, updated_at) VALUES (?1, ?2, ?3)",
                    params![note.id, payload, note.updated_at.to_rfc3339()],
                )
                .map_err(|err| sqlite_error("insert cached note", &self.db_path, err))?;
        }

        transaction
            .commit()
            .map_err(|err| sqlite_error("commit cache transaction", &self.db_path, err))?;

        tracing::debug!(count = notes.len(), "replaced note cache");
        Ok(())
    }

    pub fn load_bookkeeping(&self) -> NoteResult<SyncBookkeeping> {
        let conn = self.connection()?;
        let payload = conn
            .query_row(
                "SELECT payload_json FROM sync_state WHERE key = ?1",
                params![STATE_KEY],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map_err(|err| sqlite_error("load sync state", &self.db_path, err))?;

        let Some(payload) = payload else {
            return Ok(SyncBookkeeping::default());
        };

        serde_json::from_str::<SyncBookkeeping>(&payload).map_err(|err| {
            NoteError::io(format!(
                "failed to parse sync state in '{}': {}",
                self.db_path.display(),
                err
            ))
        })
    }

    pub fn save_bookkeeping(&self, state: &SyncBookkeeping) -> NoteResult<()> {
        let payload = serde_json::to_string(state)
            .map_err(|err| NoteError::io(format!("failed to encode sync state: {err}")))?;

        let conn = self.connection()?;
        conn.execute(
            "INSERT INTO sync_state (key, payload_json, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET payload_json = excluded.payload_json, updated_at = excluded.updated_at",
            params![STATE_KEY, payload, Utc::now().to_rfc3339()],
        )
        .map_err(|err| sqlite_error("save sync state", &self.db_path, err))?;

        Ok(())
    }

    fn connection(&self) -> NoteResult<Connection> {
        Connection::open(&self.db_path)
            .map_err(|err| sqlite_error("open cache database", &self.db_path, err))
    }

    fn initialize_schema(&self, conn: &Connection) -> NoteResult<()> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             CREATE TABLE IF NOT EXISTS notes (
                 id TEXT PRIMARY KEY,
                 payload_json TEXT NOT NULL,
                 updated_at TEXT NOT NULL
             );
             CREATE TABLE IF NOT EXISTS sync_state (
                 key TEXT PRIMARY KEY,
                 payload_json TEXT NOT NULL,
                 updated_at TEXT NOT NULL
             );",
        )
        .map_err(|err| sqlite_error("initialize schema", &self.db_path, err))?;

        Ok(())
    }
}

fn encode_note(note: &Note) -> NoteResult<String> {
    serde_json::to_string(note)
        .map_err(|err| NoteError::io(format!("failed to encode note '{}': {err}", note.id)))
}

fn decode_note(payload: &str, db_path: &Path) -> NoteResult<Note> {
    serde_json::from_str::<Note>(payload).map_err(|err| {
        NoteError::io(format!(
            "failed to parse cached note in '{}': {}",
            db_path.display(),
            err
        ))
    })
}

fn sqlite_error(action: &str, db_path: &Path, err: SqlError) -> NoteError {
    if let SqlError::SqliteFailure(code, message) = &err
        && (code.code == ErrorCode::DatabaseCorrupt || code.code == ErrorCode::NotADatabase)
    {
        let detail = message.as_deref().unwrap_or("sqlite reported corruption");
        return NoteError::io(format!(
            "failed to {action}: cache database '{}' is corrupted ({detail}); remove '.notesync/cache.db' and run `notesync list` while online to rebuild it",
            db_path.display()
        ));
    }

    NoteError::io(format!(
        "failed to {action} using cache database '{}': {}",
        db_path.display(),
        err
    ))
}
