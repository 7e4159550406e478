//! Unit tests for per-engine argv construction.

use agent_conductor::engine::{build_command, BuildContext, Command};
use agent_conductor::models::{EngineId, PromptRef, RunOpts, Transport};
use agent_conductor::AppError;

fn cmdline() -> BuildContext {
    BuildContext::default()
}

fn build(engine: EngineId, prompt: &PromptRef, opts: &RunOpts) -> Command {
    build_command(engine, prompt, opts, &cmdline()).expect("command should build")
}

// ── Base fragments ───────────────────────────────────────────────────────────

#[test]
fn no_flags_yields_binary_and_prompt() {
    for engine in [EngineId::Claude, EngineId::Gemini, EngineId::Qwen] {
        assert_eq!(
            build(engine, &PromptRef::text("p"), &RunOpts::default()).argv(),
            vec![engine.binary(), "p"]
        );
    }
    assert_eq!(
        build(EngineId::Codex, &PromptRef::text("p"), &RunOpts::default()).argv(),
        vec!["codex", "exec", "p"]
    );
}

#[test]
fn claude_danger_and_stream_flags_precede_prompt() {
    let opts = RunOpts {
        dangerously_skip_permissions: true,
        stream_json: true,
        ..RunOpts::default()
    };
    let cmd = build(EngineId::Claude, &PromptRef::text("fix the bug"), &opts);

    assert_eq!(
        cmd.argv(),
        vec![
            "claude",
            "--permission-mode",
            "bypassPermissions",
            "--output-format",
            "stream-json",
            "--include-partial-messages",
            "fix the bug",
        ]
    );
}

#[test]
fn codex_runs_through_exec_subcommand() {
    let opts = RunOpts {
        dangerously_skip_permissions: true,
        stream_json: true,
        ..RunOpts::default()
    };
    let cmd = build(EngineId::Codex, &PromptRef::text("hello"), &opts);

    assert_eq!(
        cmd.argv(),
        vec![
            "codex",
            "exec",
            "--dangerously-bypass-approvals-and-sandbox",
            "--json",
            "hello",
        ]
    );
    assert_eq!(cmd.program(), "codex");
}

#[test]
fn gemini_and_qwen_share_short_flags() {
    let opts = RunOpts {
        dangerously_skip_permissions: true,
        stream_json: true,
        ..RunOpts::default()
    };

    for engine in [EngineId::Gemini, EngineId::Qwen] {
        let cmd = build(engine, &PromptRef::text("p"), &opts);
        assert_eq!(
            cmd.argv(),
            vec![engine.binary(), "-y", "-o", "stream-json", "p"],
            "{engine} flags"
        );
    }
}

#[test]
fn model_and_extra_args_follow_flags() {
    let opts = RunOpts {
        model: Some("gpt-5".into()),
        extra_args: vec!["--sandbox".into(), "read-only".into()],
        ..RunOpts::default()
    };
    let cmd = build(EngineId::Codex, &PromptRef::text("go"), &opts);

    assert_eq!(
        cmd.argv(),
        vec!["codex", "exec", "--model", "gpt-5", "--sandbox", "read-only", "go"]
    );
}

#[test]
fn empty_model_is_ignored() {
    let opts = RunOpts {
        model: Some(String::new()),
        ..RunOpts::default()
    };
    let cmd = build(EngineId::Gemini, &PromptRef::text("go"), &opts);
    assert_eq!(cmd.argv(), vec!["gemini", "go"]);
}

#[test]
fn quiet_and_verbose_add_no_tokens() {
    let plain = build(EngineId::Qwen, &PromptRef::text("x"), &RunOpts::default());
    let noisy = build(
        EngineId::Qwen,
        &PromptRef::text("x"),
        &RunOpts {
            quiet: true,
            verbose: true,
            ..RunOpts::default()
        },
    );
    assert_eq!(plain, noisy);
}

// ── Resume fragments ─────────────────────────────────────────────────────────

#[test]
fn codex_resume_latest_and_by_id() {
    let latest = RunOpts {
        continue_latest: true,
        ..RunOpts::default()
    };
    assert_eq!(
        build(EngineId::Codex, &PromptRef::text("more"), &latest).argv(),
        vec!["codex", "exec", "resume", "--last", "more"]
    );

    let by_id = RunOpts {
        resume_id: Some("th_42".into()),
        ..RunOpts::default()
    };
    assert_eq!(
        build(EngineId::Codex, &PromptRef::text("more"), &by_id).argv(),
        vec!["codex", "exec", "resume", "th_42", "more"]
    );
}

#[test]
fn gemini_and_qwen_resume_spellings() {
    let latest = RunOpts {
        continue_latest: true,
        ..RunOpts::default()
    };
    assert_eq!(
        build(EngineId::Gemini, &PromptRef::text("p"), &latest).argv(),
        vec!["gemini", "-r", "latest", "p"]
    );
    assert_eq!(
        build(EngineId::Qwen, &PromptRef::text("p"), &latest).argv(),
        vec!["qwen", "-c", "p"]
    );

    let by_id = RunOpts {
        resume_id: Some("s1".into()),
        ..RunOpts::default()
    };
    assert_eq!(
        build(EngineId::Gemini, &PromptRef::text("p"), &by_id).argv(),
        vec!["gemini", "-r", "s1", "p"]
    );
    assert_eq!(
        build(EngineId::Qwen, &PromptRef::text("p"), &by_id).argv(),
        vec!["qwen", "-c", "s1", "p"]
    );
}

#[test]
fn explicit_id_wins_over_continue_latest() {
    let opts = RunOpts {
        continue_latest: true,
        resume_id: Some("abc".into()),
        ..RunOpts::default()
    };
    assert_eq!(
        build(EngineId::Gemini, &PromptRef::text("p"), &opts).argv(),
        vec!["gemini", "-r", "abc", "p"]
    );
}

#[test]
fn claude_resumes_by_id_only() {
    let by_id = RunOpts {
        resume_id: Some("sess-1".into()),
        ..RunOpts::default()
    };
    assert_eq!(
        build(EngineId::Claude, &PromptRef::text("p"), &by_id).argv(),
        vec!["claude", "-r", "sess-1", "p"]
    );

    let latest = RunOpts {
        continue_latest: true,
        ..RunOpts::default()
    };
    assert_eq!(
        build(EngineId::Claude, &PromptRef::text("p"), &latest).argv(),
        vec!["claude", "p"],
        "claude has no 'latest' spelling, so a fresh conversation starts"
    );
}

#[test]
fn blank_resume_id_is_treated_as_absent() {
    let opts = RunOpts {
        resume_id: Some("  ".into()),
        ..RunOpts::default()
    };
    assert_eq!(
        build(EngineId::Gemini, &PromptRef::text("p"), &opts).argv(),
        vec!["gemini", "p"]
    );
}

// ── Prompt fragments and rejections ──────────────────────────────────────────

#[test]
fn stdin_prompt_omits_prompt_token() {
    let cmd = build(
        EngineId::Qwen,
        &PromptRef::stdin("long text"),
        &RunOpts::default(),
    );
    assert_eq!(cmd.argv(), vec!["qwen"]);
}

#[test]
fn claude_rejects_stdin_prompt() {
    let err = build_command(
        EngineId::Claude,
        &PromptRef::stdin("text"),
        &RunOpts::default(),
        &cmdline(),
    )
    .expect_err("claude cannot read stdin");
    assert!(matches!(err, AppError::Usage(_)), "got {err:?}");
}

#[test]
fn qwen_non_cmdline_transport_is_not_implemented() {
    for transport in [Transport::Stdio, Transport::Tcp] {
        let err = build_command(
            EngineId::Qwen,
            &PromptRef::text("p"),
            &RunOpts::default(),
            &BuildContext { transport },
        )
        .expect_err("only cmdline builds");
        assert!(
            matches!(err, AppError::TransportNotImplemented(_)),
            "{transport}: got {err:?}"
        );
    }
}

#[test]
fn single_transport_engines_ignore_transport_setting() {
    let cmd = build_command(
        EngineId::Gemini,
        &PromptRef::text("p"),
        &RunOpts::default(),
        &BuildContext {
            transport: Transport::Tcp,
        },
    )
    .expect("gemini always resolves to cmdline");
    assert_eq!(cmd.argv(), vec!["gemini", "p"]);
}

#[test]
fn empty_command_is_invalid() {
    let err = Command::new(Vec::new()).expect_err("empty argv");
    assert!(matches!(err, AppError::InvalidCommand(_)));
}

#[test]
fn command_display_joins_tokens() {
    let cmd = Command::new(vec!["gemini".into(), "-y".into(), "hi".into()]).unwrap();
    assert_eq!(cmd.to_string(), "gemini -y hi");
    assert_eq!(cmd.args(), ["-y".to_owned(), "hi".to_owned()]);
}
