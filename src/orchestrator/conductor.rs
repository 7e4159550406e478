//! One-shot engine runs: build → run → record session → return.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::Settings;
use crate::engine::{build_command, explain_command, spec, Command};
use crate::models::{EngineId, PromptRef, RunOpts, RunPhase, RunResult};
use crate::persistence::SessionStore;
use crate::render::Renderer;
use crate::runner::{CommandRunner, ProcessRunner, RunRequest};
use crate::stream::mine_session_id;
use crate::Result;

/// Drives single engine invocations against a session store.
///
/// Holds no per-call state; concurrent calls for different engines are
/// safe because the store serializes its own writes.
#[derive(Clone)]
pub struct Conductor {
    settings: Settings,
    store: SessionStore,
    runner: Arc<dyn CommandRunner>,
}

impl std::fmt::Debug for Conductor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conductor")
            .field("settings", &self.settings)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

/// A request resolved against the store and turned into a command.
#[derive(Debug, Clone)]
pub struct Prepared {
    /// Prompt with any file source read into text.
    pub prompt: PromptRef,
    /// Options with `continue_latest` resolved to a concrete id when one
    /// was stored.
    pub opts: RunOpts,
    /// Argv for the engine.
    pub command: Command,
}

impl Conductor {
    /// Create a conductor executing through `runner`.
    #[must_use]
    pub fn new(settings: Settings, runner: Arc<dyn CommandRunner>) -> Self {
        let store = SessionStore::new(settings.sessions_file.clone());
        Self {
            settings,
            store,
            runner,
        }
    }

    /// Create a conductor that spawns real engine processes.
    #[must_use]
    pub fn with_process_runner(settings: Settings) -> Self {
        let runner = ProcessRunner::new(
            settings.logs_root.clone(),
            settings.temp_dir.clone(),
            settings.grace_period(),
        )
        .with_max_frame_bytes(settings.max_frame_bytes);
        Self::new(settings, Arc::new(runner))
    }

    /// Active settings.
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Backing session store.
    #[must_use]
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Resolve the prompt and session, then build the command.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if a prompt file cannot be read, and any
    /// error [`build_command`] reports.
    pub fn prepare(&self, engine: EngineId, prompt: &PromptRef, opts: RunOpts) -> Result<Prepared> {
        let prompt = prompt.resolved()?;
        let opts = self.resolve_session(engine, opts);
        let command = build_command(engine, &prompt, &opts, &self.settings.build_context())?;
        Ok(Prepared {
            prompt,
            opts,
            command,
        })
    }

    /// Command that [`Conductor::run_once`] would execute.
    ///
    /// # Errors
    ///
    /// Same as [`Conductor::prepare`].
    pub fn print_command(
        &self,
        engine: EngineId,
        prompt: &PromptRef,
        opts: RunOpts,
    ) -> Result<Command> {
        self.prepare(engine, prompt, opts).map(|prepared| prepared.command)
    }

    /// Human-readable description of the command for this request.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if a prompt file cannot be read.
    pub fn explain(&self, engine: EngineId, prompt: &PromptRef, opts: RunOpts) -> Result<String> {
        let prompt = prompt.resolved()?;
        let opts = self.resolve_session(engine, opts);
        Ok(explain_command(
            engine,
            &prompt,
            &opts,
            &self.settings.build_context(),
        ))
    }

    /// Run `engine` once and record the session it reports.
    ///
    /// A missing binary (exit 127) and an interrupt (exit 130) still yield
    /// a [`RunResult`]. The renderer's `finalize` is called exactly once for
    /// every returned result.
    ///
    /// # Errors
    ///
    /// Returns build errors (`AppError::Usage`,
    /// `AppError::TransportNotImplemented`) without spawning anything, and
    /// runner errors (`AppError::Spawn`, `AppError::Io`).
    pub async fn run_once(
        &self,
        engine: EngineId,
        prompt: &PromptRef,
        opts: RunOpts,
        renderer: &dyn Renderer,
        cancel: CancellationToken,
    ) -> Result<RunResult> {
        let span = info_span!("run_once", %engine);
        self.run_inner(engine, prompt, opts, renderer, cancel)
            .instrument(span)
            .await
    }

    async fn run_inner(
        &self,
        engine: EngineId,
        prompt: &PromptRef,
        opts: RunOpts,
        renderer: &dyn Renderer,
        cancel: CancellationToken,
    ) -> Result<RunResult> {
        let mut phase = RunPhase::Idle;
        advance(&mut phase, RunPhase::Building);

        let prepared = match self.prepare(engine, prompt, opts) {
            Ok(prepared) => prepared,
            Err(err) => {
                advance(&mut phase, RunPhase::Failed);
                warn!(%engine, %err, "command build failed");
                return Err(err);
            }
        };
        let Prepared {
            prompt,
            opts,
            command,
        } = prepared;

        let stdin = self.stdin_payload(engine, &prompt);
        let request = RunRequest {
            engine,
            command,
            stdin,
            stream_json: opts.stream_json,
            quiet: opts.quiet,
            verbose: opts.verbose,
        };

        advance(&mut phase, RunPhase::Running);
        let mut result = match self.runner.run(request, renderer, cancel).await {
            Ok(result) => result,
            Err(err) => {
                advance(&mut phase, RunPhase::Failed);
                warn!(%engine, %err, "engine run failed");
                return Err(err);
            }
        };

        if result.session_id.is_none() {
            result.session_id = mine_session_id(&result.parsed_events, engine);
        }
        if let Some(session_id) = result.session_id.as_deref() {
            if let Err(err) = self.store.update(
                engine,
                Some(session_id),
                opts.model.as_deref(),
                opts.dangerously_skip_permissions,
            ) {
                warn!(%engine, %err, "failed to record session");
            }
        }

        advance(&mut phase, RunPhase::Done);
        info!(
            %engine,
            exit_code = result.exit_code,
            interrupted = result.interrupted,
            session_id = result.session_id.as_deref().unwrap_or(""),
            "run complete"
        );
        renderer.finalize(result.exit_code);
        Ok(result)
    }

    /// Swap `continue_latest` for the stored id, when there is one.
    fn resolve_session(&self, engine: EngineId, mut opts: RunOpts) -> RunOpts {
        if opts.continue_latest && opts.effective_resume_id().is_none() {
            match self.store.get_last(engine) {
                Some(id) => {
                    info!(%engine, session_id = %id, "continuing stored session");
                    opts.resume_id = Some(id);
                }
                None => debug!(%engine, "no stored session to continue"),
            }
        }
        opts
    }

    /// Text to deliver outside argv: stdin prompts, and long prompts for
    /// engines that can only take them through a file.
    fn stdin_payload(&self, engine: EngineId, prompt: &PromptRef) -> Option<String> {
        let text = prompt.argv_text();
        if prompt.is_stdin {
            return Some(text);
        }
        if !spec(engine).capabilities.supports_stdin && text.len() > self.settings.long_prompt_bytes
        {
            debug!(%engine, bytes = text.len(), "long prompt routed through a file");
            return Some(text);
        }
        None
    }
}

fn advance(phase: &mut RunPhase, next: RunPhase) {
    if phase.can_transition_to(next) {
        debug!(from = ?*phase, to = ?next, "run phase");
        *phase = next;
    } else {
        warn!(from = ?*phase, to = ?next, "ignoring illegal run phase transition");
    }
}
