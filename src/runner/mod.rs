//! Child-process execution for engine commands.
//!
//! - `process`: [`ProcessRunner`](process::ProcessRunner), the real runner
//!   that spawns the engine binary and streams its output.
//! - `prompt_file`: temporary prompt files for engines that cannot read a
//!   prompt from stdin.
//! - `diagnostics`: per-run copies of stdout, stderr, and parsed events.
//!
//! The [`CommandRunner`] trait is the seam between the conductor and the
//! operating system, so tests can substitute a scripted runner.

pub mod diagnostics;
pub mod process;
pub mod prompt_file;

use std::future::Future;
use std::pin::Pin;

use tokio_util::sync::CancellationToken;

use crate::engine::Command;
use crate::models::{EngineId, RunResult};
use crate::render::Renderer;
use crate::Result;

pub use diagnostics::{DiagnosticLogs, LogPaths};
pub use process::ProcessRunner;
pub use prompt_file::PromptFile;

/// One command ready to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct RunRequest {
    /// Engine the command belongs to.
    pub engine: EngineId,
    /// Argv built for the engine.
    pub command: Command,
    /// Payload for the child's stdin. Engines without stdin support receive
    /// it through a temporary prompt file instead.
    pub stdin: Option<String>,
    /// Stdout is JSON Lines and should be parsed into events.
    pub stream_json: bool,
    /// Suppress renderer callbacks for events and stderr.
    pub quiet: bool,
    /// Forward raw events to the renderer as well.
    pub verbose: bool,
}

/// Executes a [`RunRequest`] and reports a [`RunResult`].
///
/// A missing binary and an interrupt are results, not errors: they come
/// back with exit codes 127 and 130 respectively.
pub trait CommandRunner: Send + Sync {
    /// Run `request` to completion, or until `cancel` fires.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Spawn` if the process cannot be started for a
    /// reason other than a missing binary, and `AppError::Io` if a
    /// temporary prompt file cannot be created.
    fn run<'a>(
        &'a self,
        request: RunRequest,
        renderer: &'a dyn Renderer,
        cancel: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<RunResult>> + Send + 'a>>;
}
