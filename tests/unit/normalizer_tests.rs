//! Unit tests for engine event normalization and session-id mining.

use serde_json::json;

use agent_conductor::models::{EngineId, EventKind, StreamEvent};
use agent_conductor::stream::normalizer::kind_for_type;
use agent_conductor::stream::{extract_session_id, mine_session_id, normalize};

// ── Generic pass ─────────────────────────────────────────────────────────────

#[test]
fn type_table_maps_known_values() {
    assert_eq!(kind_for_type("thread.started"), EventKind::Init);
    assert_eq!(kind_for_type("content_block_delta"), EventKind::Delta);
    assert_eq!(kind_for_type("turn.completed"), EventKind::Result);
    assert_eq!(kind_for_type("turn.failed"), EventKind::Error);
    assert_eq!(kind_for_type("item.completed"), EventKind::Message);
    assert_eq!(kind_for_type("something_new"), EventKind::Message);
}

#[test]
fn untyped_event_is_a_message() {
    let event = normalize(&json!({"text": "plain"}), EngineId::Gemini);
    assert_eq!(event.kind(), EventKind::Message);
    assert_eq!(event.text(), "plain");
}

#[test]
fn session_id_found_in_metadata_and_nested_object() {
    let in_metadata = json!({"type": "init", "metadata": {"sessionId": "m-1"}});
    assert_eq!(
        extract_session_id(&in_metadata, EngineId::Qwen).as_deref(),
        Some("m-1")
    );

    let nested = json!({"type": "init", "session": {"id": "n-2"}});
    assert_eq!(
        extract_session_id(&nested, EngineId::Gemini).as_deref(),
        Some("n-2")
    );

    let blank = json!({"type": "init", "session_id": ""});
    assert_eq!(extract_session_id(&blank, EngineId::Gemini), None);
}

#[test]
fn content_parts_are_joined() {
    let raw = json!({"type": "message", "content": [{"text": "a"}, {"text": "b"}]});
    assert_eq!(normalize(&raw, EngineId::Qwen).text(), "ab");
}

// ── Claude / Qwen ────────────────────────────────────────────────────────────

#[test]
fn claude_init_carries_session() {
    let raw = json!({"type": "system", "subtype": "init", "session_id": "c-1", "model": "x"});
    let event = normalize(&raw, EngineId::Claude);
    assert_eq!(
        event,
        StreamEvent::Init {
            role: None,
            session_id: Some("c-1".into()),
        }
    );
}

#[test]
fn claude_partial_message_is_a_delta() {
    let raw = json!({
        "type": "stream_event",
        "event": {"type": "content_block_delta", "delta": {"type": "text_delta", "text": "Hel"}},
        "session_id": "c-1"
    });
    let event = normalize(&raw, EngineId::Claude);
    assert_eq!(event.kind(), EventKind::Delta);
    assert_eq!(event.text(), "Hel");
    assert_eq!(event.session_id(), Some("c-1"));
}

#[test]
fn claude_assistant_message_text_and_role() {
    let raw = json!({
        "type": "assistant",
        "message": {"role": "assistant", "content": [{"type": "text", "text": "Hello"}]}
    });
    let event = normalize(&raw, EngineId::Claude);
    assert_eq!(event.kind(), EventKind::Message);
    assert_eq!(event.text(), "Hello");
    assert_eq!(event.role(), Some("assistant"));
}

#[test]
fn claude_error_result_becomes_error() {
    let raw = json!({"type": "result", "is_error": true, "result": "quota exceeded"});
    let event = normalize(&raw, EngineId::Claude);
    assert_eq!(event.kind(), EventKind::Error);
    assert_eq!(event.text(), "quota exceeded");

    let ok = json!({"type": "result", "is_error": false, "result": "done"});
    assert_eq!(normalize(&ok, EngineId::Qwen).kind(), EventKind::Result);
}

// ── Codex ────────────────────────────────────────────────────────────────────

#[test]
fn codex_thread_id_is_the_session() {
    let raw = json!({"type": "thread.started", "thread_id": "th_1"});
    let event = normalize(&raw, EngineId::Codex);
    assert_eq!(event.kind(), EventKind::Init);
    assert_eq!(event.session_id(), Some("th_1"));
}

#[test]
fn codex_item_text_is_extracted() {
    let raw = json!({
        "type": "item.completed",
        "item": {"id": "item_0", "type": "agent_message", "text": "All done"}
    });
    let event = normalize(&raw, EngineId::Codex);
    assert_eq!(event.kind(), EventKind::Message);
    assert_eq!(event.text(), "All done");
}

#[test]
fn codex_error_field_marks_failure() {
    let raw = json!({"type": "turn.failed", "error": {"message": "stream disconnected"}});
    let event = normalize(&raw, EngineId::Codex);
    assert_eq!(event.kind(), EventKind::Error);
    assert_eq!(event.text(), "stream disconnected");

    let null_error = json!({"type": "turn.completed", "error": null});
    assert_eq!(normalize(&null_error, EngineId::Codex).kind(), EventKind::Result);
}

// ── Gemini ───────────────────────────────────────────────────────────────────

#[test]
fn gemini_candidate_parts_and_delta_flag() {
    let raw = json!({
        "type": "message",
        "delta": true,
        "candidates": [{"content": {"role": "model", "parts": [{"text": "Hi "}, {"text": "there"}]}}]
    });
    let event = normalize(&raw, EngineId::Gemini);
    assert_eq!(event.kind(), EventKind::Delta);
    assert_eq!(event.text(), "Hi there");
    assert_eq!(event.role(), Some("model"));
}

// ── Mining ───────────────────────────────────────────────────────────────────

#[test]
fn mining_returns_last_session_id() {
    let events = vec![
        json!({"type": "init", "session_id": "first"}),
        json!({"type": "message", "text": "no id here"}),
        json!({"type": "result", "session_id": "second"}),
        json!({"type": "message", "text": "trailing"}),
    ];
    assert_eq!(
        mine_session_id(&events, EngineId::Gemini).as_deref(),
        Some("second")
    );
    assert_eq!(mine_session_id(&[], EngineId::Gemini), None);
}

#[test]
fn bare_result_event() {
    let event = normalize(&json!({"type": "result", "result": "R"}), EngineId::Gemini);
    assert_eq!(
        event,
        StreamEvent::Result {
            text: "R".into(),
            role: None,
            session_id: None,
        }
    );
}
