//! Durable engine → last-session-id map.
//!
//! The backing document is a single JSON object keyed by engine name:
//!
//! ```json
//! {
//!   "codex": {
//!     "last_session_id": "th_123",
//!     "updated_at": "2026-01-01T00:00:00Z",
//!     "model": "gpt-5",
//!     "danger_mode": false
//!   }
//! }
//! ```
//!
//! Reads never fail: a missing or corrupt document reads as empty. Writes
//! hold an exclusive lock on `<file>.lock`, re-read the document, change one
//! entry, and atomically replace the file, so concurrent updates to
//! different engines keep each other's entries.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::models::session::StoredSession;
use crate::models::{EngineId, SessionRecord};
use crate::{AppError, Result};

type Document = BTreeMap<String, Value>;

/// File-backed session store.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// Store backed by the JSON document at `path`. Nothing is touched on
    /// disk until the first update.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the backing document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last session id recorded for `engine`.
    #[must_use]
    pub fn get_last(&self, engine: EngineId) -> Option<String> {
        self.get(engine).map(|record| record.last_session_id)
    }

    /// Full record for `engine`.
    #[must_use]
    pub fn get(&self, engine: EngineId) -> Option<SessionRecord> {
        let mut document = self.read_document();
        document
            .remove(engine.as_str())
            .and_then(|value| parse_entry(engine, value))
    }

    /// Every readable record, in engine order.
    #[must_use]
    pub fn list(&self) -> Vec<SessionRecord> {
        let mut document = self.read_document();
        EngineId::ALL
            .iter()
            .filter_map(|engine| {
                document
                    .remove(engine.as_str())
                    .and_then(|value| parse_entry(*engine, value))
            })
            .collect()
    }

    /// Record `session_id` as the latest session for `engine`.
    ///
    /// An absent or blank id is ignored.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Session` if the lock cannot be taken or the
    /// document cannot be written.
    pub fn update(
        &self,
        engine: EngineId,
        session_id: Option<&str>,
        model: Option<&str>,
        danger_mode: bool,
    ) -> Result<()> {
        let Some(session_id) = session_id.filter(|id| !id.trim().is_empty()) else {
            debug!(%engine, "no session id to record");
            return Ok(());
        };

        let parent = self.parent_dir();
        fs::create_dir_all(&parent).map_err(|err| {
            AppError::Session(format!(
                "failed to create session directory {}: {err}",
                parent.display()
            ))
        })?;

        let lock = self.acquire_lock()?;

        let mut document = self.read_document();
        let entry = StoredSession {
            last_session_id: session_id.to_owned(),
            updated_at: Utc::now(),
            model: model.filter(|m| !m.is_empty()).map(str::to_owned),
            danger_mode,
        };
        let value = serde_json::to_value(&entry)
            .map_err(|err| AppError::Session(format!("failed to encode session: {err}")))?;
        document.insert(engine.as_str().to_owned(), value);

        self.write_document(&parent, &document)?;
        drop(lock);

        info!(%engine, session_id, "recorded session");
        Ok(())
    }

    fn parent_dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".lock");
        self.path.with_file_name(name)
    }

    fn acquire_lock(&self) -> Result<File> {
        let path = self.lock_path();
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|err| {
                AppError::Session(format!("failed to open lock {}: {err}", path.display()))
            })?;
        file.lock().map_err(|err| {
            AppError::Session(format!("failed to lock {}: {err}", path.display()))
        })?;
        Ok(file)
    }

    fn read_document(&self) -> Document {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Document::new(),
            Err(err) => {
                warn!(path = %self.path.display(), %err, "failed to read session store");
                return Document::new();
            }
        };
        if raw.trim().is_empty() {
            return Document::new();
        }
        match serde_json::from_str::<Document>(&raw) {
            Ok(document) => document,
            Err(err) => {
                warn!(
                    path = %self.path.display(),
                    %err,
                    "session store is corrupt, treating as empty"
                );
                Document::new()
            }
        }
    }

    fn write_document(&self, parent: &Path, document: &Document) -> Result<()> {
        let body = serde_json::to_vec_pretty(document)
            .map_err(|err| AppError::Session(format!("failed to encode sessions: {err}")))?;

        let mut tmp = NamedTempFile::new_in(parent)
            .map_err(|err| AppError::Session(format!("failed to create temporary file: {err}")))?;
        tmp.write_all(&body)
            .and_then(|()| tmp.write_all(b"\n"))
            .map_err(|err| AppError::Session(format!("failed to write temporary file: {err}")))?;

        tmp.persist(&self.path).map_err(|err| {
            AppError::Session(format!(
                "failed to persist sessions to {}: {err}",
                self.path.display()
            ))
        })?;
        Ok(())
    }
}

fn parse_entry(engine: EngineId, value: Value) -> Option<SessionRecord> {
    match serde_json::from_value::<StoredSession>(value) {
        Ok(stored) if !stored.last_session_id.trim().is_empty() => {
            Some(stored.into_record(engine))
        }
        Ok(_) => None,
        Err(err) => {
            warn!(%engine, %err, "ignoring unreadable session entry");
            None
        }
    }
}
