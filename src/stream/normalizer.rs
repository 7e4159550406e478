//! Normalization of engine-specific JSON events.
//!
//! The four engines share no schema, so normalization runs in two passes:
//!
//! 1. A generic pass sniffs the common fields (`type`, text-bearing keys,
//!    session-id keys, `role`).
//! 2. An engine pass inspects the nested shapes only that engine emits and
//!    overrides whatever fields it recognizes.
//!
//! # Generic `type` table
//!
//! | `type` values | Kind |
//! |---------------|------|
//! | `init`, `system`, `start`, `session_start`, `thread.started` | `Init` |
//! | `delta`, `content_block_delta`, `message_delta`, `partial`, `chunk`, `stream_event` | `Delta` |
//! | `message`, `assistant`, `user`, `text`, `item.completed` | `Message` |
//! | `result`, `final`, `done`, `complete`, `completed`, `turn.completed` | `Result` |
//! | `error`, `turn.failed` | `Error` |
//! | *(anything else, or missing)* | `Message` |

use serde_json::Value;

use crate::models::{EngineId, EventKind, RawEvent, StreamEvent};

const TEXT_KEYS: [&str; 5] = ["content", "text", "delta", "result", "message"];
const SESSION_KEYS: [&str; 3] = ["session_id", "sessionId", "session"];

/// Map a `type` value to its event kind.
#[must_use]
pub fn kind_for_type(event_type: &str) -> EventKind {
    match event_type {
        "init" | "system" | "start" | "session_start" | "thread.started" => EventKind::Init,
        "delta" | "content_block_delta" | "message_delta" | "partial" | "chunk"
        | "stream_event" => EventKind::Delta,
        "result" | "final" | "done" | "complete" | "completed" | "turn.completed" => {
            EventKind::Result
        }
        "error" | "turn.failed" => EventKind::Error,
        _ => EventKind::Message,
    }
}

/// Fields gathered before the event is frozen.
struct Draft {
    kind: EventKind,
    text: Option<String>,
    role: Option<String>,
    session_id: Option<String>,
}

impl Draft {
    fn finish(self) -> StreamEvent {
        StreamEvent::new(
            self.kind,
            self.text.unwrap_or_default(),
            self.role,
            self.session_id,
        )
    }
}

/// Normalize one raw event from `engine` into a [`StreamEvent`].
#[must_use]
pub fn normalize(raw: &RawEvent, engine: EngineId) -> StreamEvent {
    let mut draft = generic_pass(raw);
    match engine {
        EngineId::Claude | EngineId::Qwen => claude_style_pass(raw, &mut draft),
        EngineId::Codex => codex_pass(raw, &mut draft),
        EngineId::Gemini => gemini_pass(raw, &mut draft),
    }
    draft.finish()
}

/// Session id carried by `raw`, applying the same rules as [`normalize`].
#[must_use]
pub fn extract_session_id(raw: &RawEvent, engine: EngineId) -> Option<String> {
    let mut session_id = generic_session_id(raw);
    if engine == EngineId::Codex {
        if let Some(thread) = non_empty_str(raw.get("thread_id")) {
            session_id = Some(thread);
        }
    }
    session_id
}

/// Last session id found anywhere in `events`.
#[must_use]
pub fn mine_session_id(events: &[RawEvent], engine: EngineId) -> Option<String> {
    events
        .iter()
        .rev()
        .find_map(|event| extract_session_id(event, engine))
}

// ── Generic pass ──────────────────────────────────────────────────────────────

fn generic_pass(raw: &RawEvent) -> Draft {
    let kind = raw
        .get("type")
        .and_then(Value::as_str)
        .map_or(EventKind::Message, kind_for_type);

    let text = TEXT_KEYS
        .iter()
        .find_map(|key| raw.get(*key).and_then(text_of));

    let role = non_empty_str(raw.get("role")).or_else(|| {
        non_empty_str(raw.get("message").and_then(|message| message.get("role")))
    });

    Draft {
        kind,
        text,
        role,
        session_id: generic_session_id(raw),
    }
}

fn generic_session_id(raw: &RawEvent) -> Option<String> {
    session_in(raw).or_else(|| raw.get("metadata").and_then(session_in))
}

fn session_in(map: &Value) -> Option<String> {
    SESSION_KEYS.iter().find_map(|key| match map.get(*key)? {
        Value::String(id) if !id.trim().is_empty() => Some(id.clone()),
        Value::Object(inner) => non_empty_str(inner.get("id")),
        _ => None,
    })
}

/// Extract display text from a string, an array of parts, or an object
/// with `text`/`content`.
fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Array(parts) => {
            let joined: String = parts.iter().filter_map(text_of).collect();
            (!joined.is_empty()).then_some(joined)
        }
        Value::Object(map) => map
            .get("text")
            .and_then(text_of)
            .or_else(|| map.get("content").and_then(text_of)),
        _ => None,
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_owned)
}

// ── Engine passes ─────────────────────────────────────────────────────────────

/// Claude and Qwen share the `stream-json` shape: partial deltas wrapped in
/// `stream_event`, assistant turns under `message.content`, and a closing
/// `result` that flags failures with `is_error`.
fn claude_style_pass(raw: &RawEvent, draft: &mut Draft) {
    match raw.get("type").and_then(Value::as_str) {
        Some("stream_event") => {
            draft.kind = EventKind::Delta;
            draft.text = raw
                .get("event")
                .and_then(|event| event.get("delta"))
                .and_then(|delta| delta.get("text"))
                .and_then(Value::as_str)
                .map(str::to_owned);
        }
        Some("system") => {
            if raw.get("subtype").and_then(Value::as_str) == Some("init") {
                draft.kind = EventKind::Init;
            }
            draft.text = None;
        }
        Some("assistant" | "user") => {
            if let Some(content) = raw.get("message").and_then(|m| m.get("content")) {
                draft.text = text_of(content);
            }
        }
        Some("result") => {
            if let Some(result) = raw.get("result").and_then(text_of) {
                draft.text = Some(result);
            }
            if raw.get("is_error").and_then(Value::as_bool) == Some(true) {
                draft.kind = EventKind::Error;
            }
        }
        _ => {}
    }
}

/// Codex `--json` reports its session as `thread_id`, carries text under
/// `item`, and may attach an `error` field to any event type.
fn codex_pass(raw: &RawEvent, draft: &mut Draft) {
    if let Some(thread) = non_empty_str(raw.get("thread_id")) {
        draft.session_id = Some(thread);
    }
    if let Some(text) = raw.get("item").and_then(|item| item.get("text")).and_then(text_of) {
        draft.text = Some(text);
    }
    match raw.get("error") {
        None | Some(Value::Null) => {}
        Some(error) => {
            draft.kind = EventKind::Error;
            draft.text = text_of(error)
                .or_else(|| error.get("message").and_then(text_of))
                .or_else(|| Some(error.to_string()));
        }
    }
}

/// Gemini nests text under `candidates[0].content.parts[*].text` and marks
/// partial messages with `delta: true`.
fn gemini_pass(raw: &RawEvent, draft: &mut Draft) {
    if let Some(content) = raw
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|candidate| candidate.get("content"))
    {
        if let Some(text) = content.get("parts").and_then(text_of) {
            draft.text = Some(text);
        }
        if let Some(role) = non_empty_str(content.get("role")) {
            draft.role = Some(role);
        }
    }
    if raw.get("delta").and_then(Value::as_bool) == Some(true) && draft.kind == EventKind::Message
    {
        draft.kind = EventKind::Delta;
    }
}
