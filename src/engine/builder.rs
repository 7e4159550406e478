//! Validated argv construction.

use std::fmt::{Display, Formatter};

use tracing::{debug, warn};

use crate::engine::{spec, EngineSpec};
use crate::models::{EngineId, PromptRef, RunOpts, Transport};
use crate::{AppError, Result};

/// Ordered argv for one engine invocation. Token 0 is the binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command(Vec<String>);

impl Command {
    /// Wrap `argv`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidCommand` if `argv` is empty.
    pub fn new(argv: Vec<String>) -> Result<Self> {
        if argv.is_empty() {
            return Err(AppError::InvalidCommand("argv must not be empty".into()));
        }
        Ok(Self(argv))
    }

    /// Executable name.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.0[0]
    }

    /// Arguments after the executable.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.0[1..]
    }

    /// All tokens including the executable.
    #[must_use]
    pub fn argv(&self) -> &[String] {
        &self.0
    }

    /// Consume into the raw token list.
    #[must_use]
    pub fn into_argv(self) -> Vec<String> {
        self.0
    }
}

impl Display for Command {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0.join(" "))
    }
}

/// Settings the builder needs, resolved by the caller up front.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildContext {
    /// Transport configured for engines that support more than one.
    pub transport: Transport,
}

/// Build the argv for `engine`.
///
/// Order is fixed: base fragment (binary, head tokens, danger, stream,
/// model, extra args), then resume fragment, then prompt fragment.
///
/// # Errors
///
/// - `AppError::TransportNotImplemented` if the resolved transport is not
///   `cmdline`.
/// - `AppError::Usage` if the request needs a capability the engine lacks.
pub fn build_command(
    engine: EngineId,
    prompt: &PromptRef,
    opts: &RunOpts,
    ctx: &BuildContext,
) -> Result<Command> {
    let spec = spec(engine);

    let transport = spec.resolve_transport(ctx.transport);
    if transport != Transport::Cmdline {
        return Err(AppError::TransportNotImplemented(format!(
            "{engine} over {transport} is not available; only cmdline builds a command"
        )));
    }

    check_capabilities(spec, prompt, opts)?;

    if opts.continue_latest
        && opts.effective_resume_id().is_none()
        && spec.flags.resume_latest.is_none()
    {
        warn!(
            %engine,
            "engine cannot continue the latest session without an id; starting a new one"
        );
    }

    let mut argv = spec.base_command(opts);
    argv.extend(spec.resume_args(opts));
    argv.extend(spec.prompt_args(prompt));

    debug!(%engine, argc = argv.len(), "engine command built");
    Command::new(argv)
}

fn check_capabilities(spec: &EngineSpec, prompt: &PromptRef, opts: &RunOpts) -> Result<()> {
    let caps = spec.capabilities;
    let engine = spec.engine;

    if prompt.is_stdin && !caps.supports_stdin {
        return Err(AppError::Usage(format!(
            "{engine} cannot read its prompt from stdin; pass the prompt as text"
        )));
    }
    if opts.stream_json && !caps.supports_stream_json {
        return Err(AppError::Usage(format!(
            "{engine} does not support stream-json output"
        )));
    }
    if opts.model.as_deref().is_some_and(|m| !m.is_empty()) && !caps.supports_model_select {
        return Err(AppError::Usage(format!(
            "{engine} does not support model selection"
        )));
    }
    if opts.dangerously_skip_permissions && !caps.supports_permissions_bypass {
        return Err(AppError::Usage(format!(
            "{engine} does not support bypassing permissions"
        )));
    }
    if opts.wants_resume() && !caps.supports_resume {
        return Err(AppError::Usage(format!(
            "{engine} does not support resuming sessions"
        )));
    }
    Ok(())
}

/// Describe the command that [`build_command`] would produce.
///
/// Never fails: a rejected request is explained instead of returned as an
/// error.
#[must_use]
pub fn explain_command(
    engine: EngineId,
    prompt: &PromptRef,
    opts: &RunOpts,
    ctx: &BuildContext,
) -> String {
    let mut lines = vec![format!("Command for {engine} engine:")];

    match build_command(engine, prompt, opts, ctx) {
        Ok(cmd) => lines.push(format!("  {cmd}")),
        Err(AppError::TransportNotImplemented(msg)) => {
            lines.push(format!("  (no command) transport not implemented: {msg}"));
        }
        Err(err) => lines.push(format!("  (no command) {err}")),
    }

    if opts.dangerously_skip_permissions {
        lines.push("- Permissions bypass enabled".to_owned());
    }
    if opts.stream_json {
        lines.push("- Stream JSON output enabled".to_owned());
    }
    if let Some(model) = opts.model.as_deref().filter(|m| !m.is_empty()) {
        lines.push(format!("- Model specified: {model}"));
    }
    if let Some(id) = opts.effective_resume_id() {
        lines.push(format!("- Resume with session ID: {id}"));
    } else if opts.continue_latest {
        lines.push("- Continue latest session".to_owned());
    }
    if !opts.extra_args.is_empty() {
        lines.push(format!("- Extra arguments: {}", opts.extra_args.join(" ")));
    }
    lines.push(if prompt.is_stdin {
        "- Prompt input: stdin".to_owned()
    } else {
        "- Prompt input: direct argument".to_owned()
    });

    lines.join("\n")
}
