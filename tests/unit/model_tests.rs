use std::path::PathBuf;

use agent_conductor::engine::spec;
use agent_conductor::models::{
    EngineId, PromptRef, PromptSource, RunOpts, RunPhase, RunResult, Transport, EXIT_NOT_FOUND,
};
use agent_conductor::AppError;

#[test]
fn engine_names_round_trip() {
    for engine in EngineId::ALL {
        assert_eq!(engine.as_str().parse::<EngineId>().unwrap(), engine);
        assert_eq!(engine.binary(), spec(engine).binary);
    }
    assert_eq!(" Gemini ".parse::<EngineId>().unwrap(), EngineId::Gemini);
}

#[test]
fn only_claude_lacks_stdin() {
    for engine in EngineId::ALL {
        assert_eq!(
            spec(engine).capabilities.supports_stdin,
            engine != EngineId::Claude,
            "{engine}"
        );
    }
}

#[test]
fn only_qwen_offers_other_transports() {
    assert_eq!(
        spec(EngineId::Qwen).resolve_transport(Transport::Tcp),
        Transport::Tcp
    );
    assert_eq!(
        spec(EngineId::Codex).resolve_transport(Transport::Tcp),
        Transport::Cmdline
    );
}

#[test]
fn resume_intent() {
    let none = RunOpts::default();
    assert!(!none.wants_resume());

    let blank = RunOpts {
        resume_id: Some(String::new()),
        ..RunOpts::default()
    };
    assert_eq!(blank.effective_resume_id(), None);
    assert!(!blank.wants_resume());

    let latest = RunOpts {
        continue_latest: true,
        ..RunOpts::default()
    };
    assert!(latest.wants_resume());
}

#[test]
fn not_found_result_shape() {
    let result = RunResult::not_found("gemini");
    assert_eq!(result.exit_code, EXIT_NOT_FOUND);
    assert_eq!(result.stderr_text, "Error: Command 'gemini' not found");
    assert!(!result.success());
    assert!(result.parsed_events.is_empty());
}

#[test]
fn path_prompt_resolves_to_text() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prompt.md");
    std::fs::write(&path, "refactor the parser").unwrap();

    let prompt = PromptRef::path(&path);
    assert_eq!(prompt.argv_text(), path.display().to_string());

    let resolved = prompt.resolved().unwrap();
    assert_eq!(
        resolved.source,
        PromptSource::Text("refactor the parser".into())
    );
    assert!(!resolved.is_stdin);
}

#[test]
fn missing_prompt_file_is_io_error() {
    let err = PromptRef::path(PathBuf::from("/nonexistent/prompt.md"))
        .load_text()
        .unwrap_err();
    assert!(matches!(err, AppError::Io(_)), "got {err:?}");
}

#[test]
fn run_phase_transitions() {
    assert!(RunPhase::Idle.can_transition_to(RunPhase::Building));
    assert!(RunPhase::Building.can_transition_to(RunPhase::Failed));
    assert!(RunPhase::Building.can_transition_to(RunPhase::Running));
    assert!(RunPhase::Running.can_transition_to(RunPhase::Done));
    assert!(!RunPhase::Idle.can_transition_to(RunPhase::Running));
    assert!(!RunPhase::Done.can_transition_to(RunPhase::Running));
    assert!(RunPhase::Failed.is_terminal());
    assert!(!RunPhase::Running.is_terminal());
}
