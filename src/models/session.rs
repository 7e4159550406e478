//! Persisted per-engine session records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::engine::EngineId;

/// Last known conversation handle for one engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    /// Engine the session belongs to.
    pub engine: EngineId,
    /// Opaque session id reported by the engine.
    pub last_session_id: String,
    /// When the record was last written.
    pub updated_at: DateTime<Utc>,
    /// Model used for the run that produced the id.
    pub model: Option<String>,
    /// Whether that run bypassed permission prompts.
    pub danger_mode: bool,
}

/// On-disk shape of one entry; the engine is the document key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub(crate) struct StoredSession {
    pub last_session_id: String,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub danger_mode: bool,
}

impl StoredSession {
    pub(crate) fn into_record(self, engine: EngineId) -> SessionRecord {
        SessionRecord {
            engine,
            last_session_id: self.last_session_id,
            updated_at: self.updated_at,
            model: self.model,
            danger_mode: self.danger_mode,
        }
    }
}
