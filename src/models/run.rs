//! Run options and results.

use std::path::PathBuf;

use crate::models::event::RawEvent;

/// Exit code reported when the engine binary is not on `PATH`.
pub const EXIT_NOT_FOUND: i32 = 127;

/// Exit code reported when a run was interrupted by the operator.
pub const EXIT_INTERRUPTED: i32 = 130;

/// Caller intent for one invocation.
///
/// `resume_id` always wins over `continue_latest` when both are set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct RunOpts {
    /// Bypass the engine's permission prompts.
    pub dangerously_skip_permissions: bool,
    /// Continue the most recent conversation.
    pub continue_latest: bool,
    /// Resume a specific conversation.
    pub resume_id: Option<String>,
    /// Request streamed JSON-Lines output.
    pub stream_json: bool,
    /// Suppress forwarding of stderr and stream events to the renderer.
    pub quiet: bool,
    /// Model override passed as `--model`.
    pub model: Option<String>,
    /// Arguments appended verbatim after the engine's own flags.
    pub extra_args: Vec<String>,
    /// Forward raw JSON events to the renderer as well.
    pub verbose: bool,
}

impl RunOpts {
    /// The session id to resume, ignoring empty strings.
    #[must_use]
    pub fn effective_resume_id(&self) -> Option<&str> {
        self.resume_id.as_deref().filter(|id| !id.trim().is_empty())
    }

    /// Whether the caller asked to continue any prior conversation.
    #[must_use]
    pub fn wants_resume(&self) -> bool {
        self.continue_latest || self.effective_resume_id().is_some()
    }
}

/// Snapshot of one finished execution.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    /// Child exit code, or [`EXIT_NOT_FOUND`] / [`EXIT_INTERRUPTED`].
    pub exit_code: i32,
    /// Everything the child wrote to stdout.
    pub stdout_text: String,
    /// Everything the child wrote to stderr.
    pub stderr_text: String,
    /// Session id discovered in the output, if any.
    pub session_id: Option<String>,
    /// Diagnostic copy of stdout.
    pub stdout_log_path: Option<PathBuf>,
    /// Diagnostic copy of stderr.
    pub stderr_log_path: Option<PathBuf>,
    /// Diagnostic JSONL list of parsed events.
    pub events_log_path: Option<PathBuf>,
    /// Every JSON object parsed from stdout, in arrival order.
    pub parsed_events: Vec<RawEvent>,
    /// The run was cut short by an interrupt.
    pub interrupted: bool,
}

impl RunResult {
    /// Whether the child exited cleanly.
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == 0 && !self.interrupted
    }

    /// Result for a binary that could not be found.
    #[must_use]
    pub fn not_found(binary: &str) -> Self {
        Self {
            exit_code: EXIT_NOT_FOUND,
            stdout_text: String::new(),
            stderr_text: format!("Error: Command '{binary}' not found"),
            session_id: None,
            stdout_log_path: None,
            stderr_log_path: None,
            events_log_path: None,
            parsed_events: Vec::new(),
            interrupted: false,
        }
    }
}
