#![forbid(unsafe_code)]

//! `agent-conductor`: run AI coding CLIs as child processes.
//!
//! Loads settings, builds one engine command from the flags, runs it with a
//! terminal renderer, and exits with the engine's exit code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use agent_conductor::config::Settings;
use agent_conductor::engine::spec;
use agent_conductor::models::{EngineId, PromptRef, RunOpts};
use agent_conductor::orchestrator::Conductor;
use agent_conductor::render::TerminalRenderer;
use agent_conductor::{AppError, Result};

/// Placeholder prompt shown by `--print-cmd` when no prompt is given.
const PROMPT_PLACEHOLDER: &str = "<prompt>";

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "agent-conductor", about = "Run AI coding CLIs with one interface", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, default_value = ".agent-conductor/config.toml")]
    config: PathBuf,

    /// Log output format (text or json).
    #[arg(long, value_enum, global = true, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Run the `claude` CLI.
    Claude(EngineArgs),
    /// Run the `codex` CLI.
    Codex(EngineArgs),
    /// Run the `gemini` CLI.
    Gemini(EngineArgs),
    /// Run the `qwen` CLI.
    Qwen(EngineArgs),
    /// List stored sessions.
    Sessions,
}

#[derive(Debug, Args)]
#[allow(clippy::struct_excessive_bools)]
struct EngineArgs {
    /// Prompt text for a single non-interactive run.
    #[arg(long, value_name = "TEXT")]
    one_shot: Option<String>,

    /// Read the prompt from standard input.
    #[arg(long, conflicts_with_all = ["one_shot", "prompt_file"])]
    stdin: bool,

    /// Read the prompt from a file.
    #[arg(long, value_name = "PATH", conflicts_with = "one_shot")]
    prompt_file: Option<PathBuf>,

    /// Resume a session by id, or `latest` for the most recent one.
    #[arg(long, value_name = "ID|latest")]
    resume: Option<String>,

    /// Continue the most recent session.
    #[arg(long)]
    continue_latest: bool,

    /// Model to use.
    #[arg(long)]
    model: Option<String>,

    /// Suppress streamed output.
    #[arg(short, long)]
    quiet: bool,

    /// Request stream-json output.
    #[arg(long, conflicts_with = "no_stream_json")]
    stream_json: bool,

    /// Disable stream-json output.
    #[arg(long)]
    no_stream_json: bool,

    /// Print the command that would run, then exit.
    #[arg(long, value_name = "PROMPT", num_args = 0..=1, default_missing_value = "")]
    print_cmd: Option<String>,

    /// Explain the command that would run, then exit.
    #[arg(long)]
    explain: bool,

    /// Bypass permission prompts.
    #[arg(long, conflicts_with = "no_danger")]
    danger: bool,

    /// Keep permission prompts even when the config bypasses them.
    #[arg(long)]
    no_danger: bool,

    /// Show raw JSON events as well.
    #[arg(short, long)]
    verbose: bool,

    /// Extra arguments passed to the engine after `--`.
    #[arg(last = true)]
    extra: Vec<String>,
}

impl EngineArgs {
    fn run_opts(&self, settings: &Settings) -> RunOpts {
        let (continue_latest, resume_id) = match self.resume.as_deref() {
            Some("latest") => (true, None),
            Some(id) => (self.continue_latest, Some(id.to_owned())),
            None => (self.continue_latest, None),
        };

        let dangerously_skip_permissions = if self.danger {
            true
        } else if self.no_danger {
            false
        } else {
            settings.dangerously_skip_permissions
        };

        let stream_json = if self.stream_json {
            true
        } else if self.no_stream_json {
            false
        } else {
            settings.stream_json
        };

        RunOpts {
            dangerously_skip_permissions,
            continue_latest,
            resume_id,
            stream_json,
            quiet: self.quiet,
            model: self.model.clone(),
            extra_args: self.extra.clone(),
            verbose: self.verbose,
        }
    }

    async fn prompt(&self, engine: EngineId) -> Result<Option<PromptRef>> {
        if let Some(text) = &self.one_shot {
            return Ok(Some(PromptRef::text(text.clone())));
        }
        if let Some(path) = &self.prompt_file {
            return Ok(Some(PromptRef::path(path.clone())));
        }
        if self.stdin {
            let mut text = String::new();
            tokio::io::stdin()
                .read_to_string(&mut text)
                .await
                .map_err(|err| AppError::Io(format!("failed to read prompt from stdin: {err}")))?;
            // Engines that cannot read stdin take the text as an argument;
            // long prompts are moved into a file by the runner.
            return Ok(Some(if spec(engine).capabilities.supports_stdin {
                PromptRef::stdin(text)
            } else {
                PromptRef::text(text)
            }));
        }
        Ok(None)
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;

    let exit_code = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))?;

    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}

async fn run(args: Cli) -> Result<i32> {
    // ── Load configuration ──────────────────────────────
    let settings = Settings::load_or_default(Some(args.config.as_path()))?;
    info!(
        logs_root = %settings.logs_root.display(),
        sessions_file = %settings.sessions_file.display(),
        "configuration loaded"
    );

    let (engine, engine_args) = match args.command {
        CliCommand::Claude(a) => (EngineId::Claude, a),
        CliCommand::Codex(a) => (EngineId::Codex, a),
        CliCommand::Gemini(a) => (EngineId::Gemini, a),
        CliCommand::Qwen(a) => (EngineId::Qwen, a),
        CliCommand::Sessions => {
            list_sessions(&Conductor::with_process_runner(settings));
            return Ok(0);
        }
    };

    let opts = engine_args.run_opts(&settings);
    let conductor = Conductor::with_process_runner(settings);

    // ── Dry runs ────────────────────────────────────────
    if let Some(prompt) = &engine_args.print_cmd {
        let prompt = if prompt.is_empty() {
            engine_args
                .prompt(engine)
                .await?
                .unwrap_or_else(|| PromptRef::text(PROMPT_PLACEHOLDER))
        } else {
            PromptRef::text(prompt.clone())
        };
        println!("{}", conductor.print_command(engine, &prompt, opts)?);
        return Ok(0);
    }

    let Some(prompt) = engine_args.prompt(engine).await? else {
        return Err(AppError::Usage(
            "a prompt is required: pass --one-shot, --prompt-file, or --stdin".into(),
        ));
    };

    if engine_args.explain {
        println!("{}", conductor.explain(engine, &prompt, opts)?);
        return Ok(0);
    }

    // ── Run ─────────────────────────────────────────────
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    let signal_task = tokio::spawn(async move {
        shutdown_signal().await;
        info!("interrupt received");
        signal_cancel.cancel();
    });

    let renderer = TerminalRenderer::new();
    let result = conductor
        .run_once(engine, &prompt, opts, &renderer, cancel)
        .await;
    signal_task.abort();

    let result = result?;
    if let Some(session_id) = &result.session_id {
        info!(%engine, session_id = %session_id, "session available for --resume");
    }
    if result.exit_code == agent_conductor::models::EXIT_NOT_FOUND {
        eprintln!("{}", result.stderr_text);
    }
    Ok(result.exit_code)
}

fn list_sessions(conductor: &Conductor) {
    let records = conductor.store().list();
    if records.is_empty() {
        println!("no stored sessions");
        return;
    }
    for record in records {
        println!(
            "{}\t{}\t{}\tmodel={}\tdanger={}",
            record.engine,
            record.last_session_id,
            record.updated_at.to_rfc3339(),
            record.model.as_deref().unwrap_or("-"),
            record.danger_mode,
        );
    }
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
