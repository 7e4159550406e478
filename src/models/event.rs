//! Normalized stream events.

use serde::{Deserialize, Serialize};

/// One JSON object parsed from a line of child stdout, still in the
/// engine's own shape.
pub type RawEvent = serde_json::Value;

/// Kind of a normalized event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Engine started or announced its session.
    Init,
    /// Incremental text fragment.
    Delta,
    /// Complete message.
    Message,
    /// Final result of the turn.
    Result,
    /// Engine-reported failure.
    Error,
}

/// A normalized event emitted once per parsed stdout line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Engine started.
    Init {
        /// Speaker role, when reported.
        role: Option<String>,
        /// Session id, when reported.
        session_id: Option<String>,
    },
    /// Incremental text.
    Delta {
        /// Fragment text.
        text: String,
        /// Speaker role, when reported.
        role: Option<String>,
        /// Session id, when reported.
        session_id: Option<String>,
    },
    /// Complete message.
    Message {
        /// Message text.
        text: String,
        /// Speaker role, when reported.
        role: Option<String>,
        /// Session id, when reported.
        session_id: Option<String>,
    },
    /// Final result.
    Result {
        /// Result text.
        text: String,
        /// Speaker role, when reported.
        role: Option<String>,
        /// Session id, when reported.
        session_id: Option<String>,
    },
    /// Engine error.
    Error {
        /// Error description.
        text: String,
        /// Speaker role, when reported.
        role: Option<String>,
        /// Session id, when reported.
        session_id: Option<String>,
    },
}

impl StreamEvent {
    /// Build an event of `kind` from its parts.
    ///
    /// `Init` carries no text; any text passed for it is dropped.
    #[must_use]
    pub fn new(
        kind: EventKind,
        text: String,
        role: Option<String>,
        session_id: Option<String>,
    ) -> Self {
        match kind {
            EventKind::Init => Self::Init { role, session_id },
            EventKind::Delta => Self::Delta {
                text,
                role,
                session_id,
            },
            EventKind::Message => Self::Message {
                text,
                role,
                session_id,
            },
            EventKind::Result => Self::Result {
                text,
                role,
                session_id,
            },
            EventKind::Error => Self::Error {
                text,
                role,
                session_id,
            },
        }
    }

    /// Kind of this event.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Init { .. } => EventKind::Init,
            Self::Delta { .. } => EventKind::Delta,
            Self::Message { .. } => EventKind::Message,
            Self::Result { .. } => EventKind::Result,
            Self::Error { .. } => EventKind::Error,
        }
    }

    /// Event text; empty for `Init`.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Init { .. } => "",
            Self::Delta { text, .. }
            | Self::Message { text, .. }
            | Self::Result { text, .. }
            | Self::Error { text, .. } => text,
        }
    }

    /// Speaker role, when reported.
    #[must_use]
    pub fn role(&self) -> Option<&str> {
        match self {
            Self::Init { role, .. }
            | Self::Delta { role, .. }
            | Self::Message { role, .. }
            | Self::Result { role, .. }
            | Self::Error { role, .. } => role.as_deref(),
        }
    }

    /// Session id discovered on this event.
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        match self {
            Self::Init { session_id, .. }
            | Self::Delta { session_id, .. }
            | Self::Message { session_id, .. }
            | Self::Result { session_id, .. }
            | Self::Error { session_id, .. } => session_id.as_deref(),
        }
    }
}
