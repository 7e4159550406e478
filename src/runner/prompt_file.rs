//! Temporary prompt files.
//!
//! Engines that cannot read stdin get the payload written to a file named
//! `<engine>_stdin_*` in the configured temp directory, and the prompt token
//! in argv becomes a short directive pointing at it. The file is removed
//! when the [`PromptFile`] is dropped, on every exit path.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::models::EngineId;
use crate::{AppError, Result};

/// A prompt written to disk for the lifetime of one run.
#[derive(Debug)]
pub struct PromptFile {
    file: NamedTempFile,
}

impl PromptFile {
    /// Write `payload` to a new file under `dir`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if the file cannot be created or written.
    pub fn create(dir: &Path, engine: EngineId, payload: &str) -> Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix(&format!("{engine}_stdin_"))
            .suffix(".txt")
            .tempfile_in(dir)
            .map_err(|err| {
                AppError::Io(format!(
                    "failed to create prompt file in {}: {err}",
                    dir.display()
                ))
            })?;
        file.write_all(payload.as_bytes())
            .and_then(|()| file.flush())
            .map_err(|err| AppError::Io(format!("failed to write prompt file: {err}")))?;

        debug!(
            %engine,
            path = %file.path().display(),
            bytes = payload.len(),
            "wrote prompt file"
        );
        Ok(Self { file })
    }

    /// Location of the file.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Instruction handed to the engine in place of the prompt.
    #[must_use]
    pub fn directive(&self) -> String {
        format!("Read the full prompt from the file at {}", self.path().display())
    }

    /// Point `argv` at the file instead of carrying `payload` inline.
    ///
    /// A trailing token equal to `payload` is replaced by the directive;
    /// otherwise the directive is appended.
    pub fn substitute(&self, argv: &mut Vec<String>, payload: &str) {
        let directive = self.directive();
        if argv.last().is_some_and(|last| last == payload) {
            argv.pop();
        }
        argv.push(directive);
    }
}
