//! Engine identity, capability flags, and prompt transports.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::AppError;

/// One of the four supported assistant command-line tools.
///
/// The set is closed: every match over `EngineId` is exhaustive, and adding
/// an engine means touching each table in [`crate::engine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineId {
    /// Anthropic `claude`. Cannot read its prompt from stdin.
    Claude,
    /// OpenAI `codex`, driven through its `exec` subcommand.
    Codex,
    /// Google `gemini`.
    Gemini,
    /// Alibaba `qwen`. The only engine with a transport switch.
    Qwen,
}

impl EngineId {
    /// All engines, in display order.
    pub const ALL: [EngineId; 4] = [Self::Claude, Self::Codex, Self::Gemini, Self::Qwen];

    /// Executable name looked up on `PATH`.
    #[must_use]
    pub fn binary(self) -> &'static str {
        self.as_str()
    }

    /// Lowercase engine name, used for log directories and session keys.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Claude => "claude",
            Self::Codex => "codex",
            Self::Gemini => "gemini",
            Self::Qwen => "qwen",
        }
    }
}

impl Display for EngineId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "claude" => Ok(Self::Claude),
            "codex" => Ok(Self::Codex),
            "gemini" => Ok(Self::Gemini),
            "qwen" => Ok(Self::Qwen),
            other => Err(AppError::UnknownEngine(format!(
                "'{other}' (expected one of: claude, codex, gemini, qwen)"
            ))),
        }
    }
}

/// Feature matrix consulted before a command is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct EngineCapabilities {
    /// Prompt may be delivered on the child's stdin.
    pub supports_stdin: bool,
    /// A previous conversation can be resumed.
    pub supports_resume: bool,
    /// Streamed JSON-Lines output can be requested.
    pub supports_stream_json: bool,
    /// A model can be selected with `--model`.
    pub supports_model_select: bool,
    /// Permission prompts can be bypassed.
    pub supports_permissions_bypass: bool,
}

/// Channel that carries a prompt to an engine.
///
/// Only [`Transport::Cmdline`] is implemented. `Stdio` and `Tcp` exist so a
/// configured transport can be rejected with a typed error instead of being
/// silently ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Transport {
    /// Prompt passed as argv (or piped on stdin for a one-shot process).
    #[default]
    Cmdline,
    /// Long-lived process speaking over stdio.
    Stdio,
    /// Long-lived process speaking over a TCP socket.
    Tcp,
}

impl Display for Transport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Cmdline => "cmdline",
            Self::Stdio => "stdio",
            Self::Tcp => "tcp",
        })
    }
}
