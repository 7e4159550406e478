//! Per-run diagnostic log files.
//!
//! Every run appends three files under `<logs_root>/<engine>/`:
//! `<timestamp>_stdout.txt`, `<timestamp>_stderr.txt`, and
//! `<timestamp>_events.jsonl` (one parsed event per line). Writing is
//! best-effort: a failure is logged and the corresponding path is left out
//! of the result, but the run itself is never failed.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::warn;

use crate::models::{EngineId, RawEvent};

/// Paths of the files written for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogPaths {
    /// Copy of stdout.
    pub stdout: Option<PathBuf>,
    /// Copy of stderr.
    pub stderr: Option<PathBuf>,
    /// Parsed events as JSON Lines.
    pub events: Option<PathBuf>,
}

/// Writer for per-run diagnostic files rooted at one directory.
#[derive(Debug, Clone)]
pub struct DiagnosticLogs {
    root: PathBuf,
}

impl DiagnosticLogs {
    /// Construct a writer rooted at `root`. Directories are created lazily.
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write the three artifacts for one run of `engine`.
    #[must_use]
    pub fn write(
        &self,
        engine: EngineId,
        stdout: &str,
        stderr: &str,
        events: &[RawEvent],
    ) -> LogPaths {
        let dir = self.root.join(engine.as_str());
        if let Err(err) = fs::create_dir_all(&dir) {
            warn!(%engine, dir = %dir.display(), %err, "failed to create diagnostic log directory");
            return LogPaths::default();
        }

        let stamp = Utc::now().format("%Y%m%d_%H%M%S_%3f").to_string();
        let stdout_path = dir.join(format!("{stamp}_stdout.txt"));
        let stderr_path = dir.join(format!("{stamp}_stderr.txt"));
        let events_path = dir.join(format!("{stamp}_events.jsonl"));

        LogPaths {
            stdout: append(&stdout_path, |w| w.write_all(stdout.as_bytes())),
            stderr: append(&stderr_path, |w| w.write_all(stderr.as_bytes())),
            events: append(&events_path, |w| {
                for event in events {
                    serde_json::to_writer(&mut *w, event)?;
                    w.write_all(b"\n")?;
                }
                Ok(())
            }),
        }
    }
}

fn append<F>(path: &Path, body: F) -> Option<PathBuf>
where
    F: FnOnce(&mut BufWriter<fs::File>) -> std::io::Result<()>,
{
    let result = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .and_then(|file| {
            let mut writer = BufWriter::new(file);
            body(&mut writer)?;
            writer.flush()
        });

    match result {
        Ok(()) => Some(path.to_path_buf()),
        Err(err) => {
            warn!(path = %path.display(), %err, "failed to write diagnostic log");
            None
        }
    }
}
