//! Prompt references supplied by the caller.

use std::path::PathBuf;

use crate::{AppError, Result};

/// Where the prompt text lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptSource {
    /// Prompt given inline.
    Text(String),
    /// Prompt stored in a file, read when the text is needed.
    Path(PathBuf),
}

/// A prompt plus the way it travels to the engine.
///
/// When `is_stdin` is set the prompt is piped to the child instead of being
/// appended to argv, so engines without stdin support reject it at build
/// time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRef {
    /// Prompt origin.
    pub source: PromptSource,
    /// Deliver the prompt on stdin rather than as an argv token.
    pub is_stdin: bool,
}

impl PromptRef {
    /// Inline prompt delivered as an argv token.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            source: PromptSource::Text(text.into()),
            is_stdin: false,
        }
    }

    /// Inline prompt delivered on stdin.
    #[must_use]
    pub fn stdin(text: impl Into<String>) -> Self {
        Self {
            source: PromptSource::Text(text.into()),
            is_stdin: true,
        }
    }

    /// Prompt read from `path`, delivered as an argv token.
    #[must_use]
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self {
            source: PromptSource::Path(path.into()),
            is_stdin: false,
        }
    }

    /// Resolve the prompt text, reading the file for a [`PromptSource::Path`].
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if the prompt file cannot be read.
    pub fn load_text(&self) -> Result<String> {
        match &self.source {
            PromptSource::Text(text) => Ok(text.clone()),
            PromptSource::Path(path) => std::fs::read_to_string(path).map_err(|err| {
                AppError::Io(format!("failed to read prompt file {}: {err}", path.display()))
            }),
        }
    }

    /// Return a copy whose source is the resolved inline text.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if the prompt file cannot be read.
    pub fn resolved(&self) -> Result<Self> {
        Ok(Self {
            source: PromptSource::Text(self.load_text()?),
            is_stdin: self.is_stdin,
        })
    }

    /// Text used as the argv prompt token, if it is available without I/O.
    ///
    /// For a path source this is the path itself; callers that need the
    /// file contents resolve the prompt first.
    #[must_use]
    pub fn argv_text(&self) -> String {
        match &self.source {
            PromptSource::Text(text) => text.clone(),
            PromptSource::Path(path) => path.display().to_string(),
        }
    }
}
