//! Shared helpers for runner and conductor integration tests.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Mutex;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use agent_conductor::config::Settings;
use agent_conductor::engine::Command;
use agent_conductor::models::{RawEvent, RunResult, StreamEvent};
use agent_conductor::render::Renderer;
use agent_conductor::runner::{CommandRunner, ProcessRunner, RunRequest};
use agent_conductor::Result;

/// Renderer that records every callback.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    pub events: Mutex<Vec<StreamEvent>>,
    pub raw: Mutex<Vec<RawEvent>>,
    pub stdout: Mutex<Vec<String>>,
    pub stderr: Mutex<Vec<String>>,
    pub finalized: Mutex<Vec<i32>>,
}

impl Renderer for RecordingRenderer {
    fn on_event(&self, event: &StreamEvent) {
        self.events.lock().unwrap().push(event.clone());
    }

    fn on_raw(&self, event: &RawEvent) {
        self.raw.lock().unwrap().push(event.clone());
    }

    fn on_stdout(&self, line: &str) {
        self.stdout.lock().unwrap().push(line.to_owned());
    }

    fn on_stderr(&self, line: &str) {
        self.stderr.lock().unwrap().push(line.to_owned());
    }

    fn finalize(&self, exit_code: i32) {
        self.finalized.lock().unwrap().push(exit_code);
    }
}

/// Runner that records requests and replays a canned result.
#[derive(Debug)]
pub struct FakeRunner {
    pub requests: Mutex<Vec<RunRequest>>,
    pub result: RunResult,
}

impl FakeRunner {
    pub fn returning(result: RunResult) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            result,
        }
    }

    pub fn last_request(&self) -> RunRequest {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("runner was called")
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl CommandRunner for FakeRunner {
    fn run<'a>(
        &'a self,
        request: RunRequest,
        _renderer: &'a dyn Renderer,
        _cancel: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<RunResult>> + Send + 'a>> {
        self.requests.lock().unwrap().push(request);
        let result = self.result.clone();
        Box::pin(async move { Ok(result) })
    }
}

/// A clean exit with no output.
pub fn ok_result() -> RunResult {
    RunResult {
        exit_code: 0,
        stdout_text: String::new(),
        stderr_text: String::new(),
        session_id: None,
        stdout_log_path: None,
        stderr_log_path: None,
        events_log_path: None,
        parsed_events: Vec::new(),
        interrupted: false,
    }
}

/// Settings rooted entirely inside `root`.
pub fn test_settings(root: &Path) -> Settings {
    Settings {
        logs_root: root.join("logs"),
        sessions_file: root.join("sessions.json"),
        temp_dir: root.join("tmp"),
        ..Settings::default()
    }
}

/// Process runner writing logs and prompt files inside `root`.
pub fn test_runner(root: &Path, grace_period: Duration) -> ProcessRunner {
    std::fs::create_dir_all(root.join("tmp")).expect("create temp dir");
    ProcessRunner::new(root.join("logs"), root.join("tmp"), grace_period)
}

/// `sh -c <script> [args…]` as a command.
pub fn sh(script: &str, args: &[&str]) -> Command {
    let mut argv = vec!["sh".to_owned(), "-c".to_owned(), script.to_owned()];
    argv.extend(args.iter().map(|a| (*a).to_owned()));
    Command::new(argv).expect("non-empty argv")
}

/// Files in `dir` matching `pattern`.
pub fn matching(dir: &Path, pattern: &str) -> Vec<std::path::PathBuf> {
    let full = dir.join(pattern);
    glob::glob(&full.to_string_lossy())
        .expect("valid glob")
        .filter_map(std::result::Result::ok)
        .collect()
}
