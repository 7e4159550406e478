//! Engine child-process runner.
//!
//! One run owns three tasks:
//!
//! - two pumps that read stdout and stderr as raw byte chunks and forward
//!   them over a bounded channel, so neither pipe can fill up and stall the
//!   child while the other is being read;
//! - the coordinator (the `run` future itself), which accumulates both
//!   streams, frames stdout into JSON events, invokes the renderer, and
//!   watches the cancellation token.
//!
//! On cancellation the child receives `SIGTERM`, gets the grace period to
//! exit, and is then killed. Output already read is kept and the result is
//! reported with exit code 130.

use std::future::Future;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio::process::{Child, ChildStdin};
use tokio::sync::mpsc;
use tokio_util::codec::{BytesCodec, Decoder, FramedRead};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::engine::spec;
use crate::models::{EngineId, RawEvent, RunResult, EXIT_INTERRUPTED};
use crate::render::Renderer;
use crate::runner::diagnostics::DiagnosticLogs;
use crate::runner::prompt_file::PromptFile;
use crate::runner::{CommandRunner, RunRequest};
use crate::stream::{normalize, JsonLinesCodec, DEFAULT_MAX_FRAME_BYTES};
use crate::{AppError, Result};

/// Chunks buffered between the pipe pumps and the coordinator.
const CHANNEL_CAPACITY: usize = 64;

/// Time allowed for the pumps to hand over trailing output after an
/// interrupted child has exited.
const DRAIN_TIMEOUT: Duration = Duration::from_millis(250);

/// Runner that executes commands as real child processes.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    logs: DiagnosticLogs,
    temp_dir: PathBuf,
    grace_period: Duration,
    max_frame_bytes: usize,
}

impl ProcessRunner {
    /// Create a runner writing diagnostics under `logs_root` and prompt
    /// files under `temp_dir`.
    #[must_use]
    pub fn new(logs_root: PathBuf, temp_dir: PathBuf, grace_period: Duration) -> Self {
        Self {
            logs: DiagnosticLogs::new(logs_root),
            temp_dir,
            grace_period,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }

    /// Drop stream-json lines longer than `max_frame_bytes`.
    #[must_use]
    pub fn with_max_frame_bytes(mut self, max_frame_bytes: usize) -> Self {
        self.max_frame_bytes = max_frame_bytes;
        self
    }

    async fn execute(
        &self,
        request: RunRequest,
        renderer: &dyn Renderer,
        cancel: CancellationToken,
    ) -> Result<RunResult> {
        let RunRequest {
            engine,
            command,
            stdin,
            stream_json,
            quiet,
            verbose,
        } = request;

        let mut argv = command.into_argv();
        let mut stdin_payload = stdin;

        // Held until the child has exited; dropping it removes the file.
        let prompt_file = match stdin_payload.take() {
            Some(payload) if !spec(engine).capabilities.supports_stdin => {
                let file = PromptFile::create(&self.temp_dir, engine, &payload)?;
                file.substitute(&mut argv, &payload);
                Some(file)
            }
            other => {
                stdin_payload = other;
                None
            }
        };

        let program = argv[0].clone();
        info!(
            %engine,
            program = %program,
            args = argv.len() - 1,
            stdin = stdin_payload.is_some(),
            "spawning engine"
        );

        let mut child = match spawn(&argv, stdin_payload.is_some()) {
            Ok(child) => child,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                warn!(%engine, program = %program, "engine binary not found");
                return Ok(self.not_found(engine, &program));
            }
            Err(err) => {
                return Err(AppError::Spawn(format!("failed to spawn {program}: {err}")));
            }
        };

        if let (Some(payload), Some(pipe)) = (stdin_payload, child.stdin.take()) {
            tokio::spawn(feed_stdin(pipe, payload));
        }

        let codec = JsonLinesCodec::with_max_frame_bytes(self.max_frame_bytes);
        let collector = Collector::new(engine, renderer, codec, stream_json, quiet, verbose);
        let outcome = self.supervise(&mut child, collector, &cancel).await;
        drop(prompt_file);
        let (exit_code, interrupted, collected) = outcome?;

        info!(
            %engine,
            exit_code,
            interrupted,
            events = collected.events.len(),
            session_id = collected.session_id.as_deref().unwrap_or(""),
            "engine finished"
        );

        let paths = self.logs.write(
            engine,
            &collected.stdout,
            &collected.stderr,
            &collected.events,
        );

        Ok(RunResult {
            exit_code,
            stdout_text: collected.stdout,
            stderr_text: collected.stderr,
            session_id: collected.session_id,
            stdout_log_path: paths.stdout,
            stderr_log_path: paths.stderr,
            events_log_path: paths.events,
            parsed_events: collected.events,
            interrupted,
        })
    }

    /// Pump both pipes into `collector` until the child closes them or
    /// `cancel` fires. Returns the exit code, whether the run was
    /// interrupted, and the collected output.
    async fn supervise(
        &self,
        child: &mut Child,
        mut collector: Collector<'_>,
        cancel: &CancellationToken,
    ) -> Result<(i32, bool, Collected)> {
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AppError::Spawn("failed to capture engine stdout".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| AppError::Spawn("failed to capture engine stderr".into()))?;

        let (tx, mut rx) = mpsc::channel(CHANNEL_CAPACITY);
        let stdout_pump = tokio::spawn(pump(stdout, Pipe::Stdout, tx.clone()));
        let stderr_pump = tokio::spawn(pump(stderr, Pipe::Stderr, tx));

        let interrupted = loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break true,
                chunk = rx.recv() => match chunk {
                    Some(chunk) => collector.push(chunk),
                    None => break false,
                },
            }
        };

        let exit_code = if interrupted {
            info!("interrupt requested, terminating engine");
            terminate(child, self.grace_period).await;
            let drained = tokio::time::timeout(DRAIN_TIMEOUT, async {
                while let Some(chunk) = rx.recv().await {
                    collector.push(chunk);
                }
            })
            .await;
            if drained.is_err() {
                while let Ok(chunk) = rx.try_recv() {
                    collector.push(chunk);
                }
            }
            stdout_pump.abort();
            stderr_pump.abort();
            EXIT_INTERRUPTED
        } else {
            let status = child
                .wait()
                .await
                .map_err(|err| AppError::Spawn(format!("failed to wait for engine: {err}")))?;
            exit_code_of(status)
        };

        Ok((exit_code, interrupted, collector.finish()))
    }

    fn not_found(&self, engine: EngineId, program: &str) -> RunResult {
        let mut result = RunResult::not_found(program);
        let paths = self.logs.write(engine, "", &result.stderr_text, &[]);
        result.stdout_log_path = paths.stdout;
        result.stderr_log_path = paths.stderr;
        result.events_log_path = paths.events;
        result
    }
}

fn spawn(argv: &[String], pipe_stdin: bool) -> std::io::Result<Child> {
    let mut cmd = tokio::process::Command::new(&argv[0]);
    cmd.args(&argv[1..])
        .stdin(if pipe_stdin {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    cmd.spawn()
}

impl CommandRunner for ProcessRunner {
    fn run<'a>(
        &'a self,
        request: RunRequest,
        renderer: &'a dyn Renderer,
        cancel: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<RunResult>> + Send + 'a>> {
        let span = info_span!("engine_run", engine = %request.engine);
        Box::pin(self.execute(request, renderer, cancel).instrument(span))
    }
}

// ── Pipes ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pipe {
    Stdout,
    Stderr,
}

#[derive(Debug)]
struct Chunk {
    pipe: Pipe,
    bytes: Bytes,
}

async fn pump<R>(reader: R, pipe: Pipe, tx: mpsc::Sender<Chunk>)
where
    R: AsyncRead + Unpin,
{
    let mut framed = FramedRead::new(reader, BytesCodec::new());
    while let Some(item) = framed.next().await {
        match item {
            Ok(bytes) => {
                let chunk = Chunk {
                    pipe,
                    bytes: bytes.freeze(),
                };
                if tx.send(chunk).await.is_err() {
                    break;
                }
            }
            Err(err) => {
                warn!(?pipe, %err, "engine pipe read failed");
                break;
            }
        }
    }
    debug!(?pipe, "engine pipe closed");
}

async fn feed_stdin(mut pipe: ChildStdin, mut payload: String) {
    if !payload.ends_with('\n') {
        payload.push('\n');
    }
    match pipe.write_all(payload.as_bytes()).await {
        Ok(()) => {}
        // The child may exit without reading its input.
        Err(err) if err.kind() == ErrorKind::BrokenPipe => {
            debug!("engine closed stdin before the prompt was written");
        }
        Err(err) => warn!(%err, "failed to write prompt to engine stdin"),
    }
    if let Err(err) = pipe.shutdown().await {
        debug!(%err, "failed to close engine stdin");
    }
}

// ── Termination ──────────────────────────────────────────────────────────────

async fn terminate(child: &mut Child, grace_period: Duration) {
    if matches!(child.try_wait(), Ok(Some(_))) {
        return;
    }
    if !send_terminate(child) {
        if let Err(err) = child.kill().await {
            warn!(%err, "failed to kill engine");
        }
        return;
    }
    match tokio::time::timeout(grace_period, child.wait()).await {
        Ok(Ok(status)) => debug!(?status, "engine exited within grace period"),
        Ok(Err(err)) => warn!(%err, "failed to wait for engine after terminate"),
        Err(_elapsed) => {
            warn!(?grace_period, "engine ignored terminate, killing");
            if let Err(err) = child.kill().await {
                warn!(%err, "failed to kill engine");
            }
        }
    }
}

#[cfg(unix)]
fn send_terminate(child: &mut Child) -> bool {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let Some(pid) = child.id().and_then(|id| i32::try_from(id).ok()) else {
        return false;
    };
    match kill(Pid::from_raw(pid), Signal::SIGTERM) {
        Ok(()) => true,
        Err(err) => {
            debug!(pid, %err, "failed to send SIGTERM");
            false
        }
    }
}

#[cfg(not(unix))]
fn send_terminate(child: &mut Child) -> bool {
    child.start_kill().is_ok()
}

#[cfg(unix)]
fn exit_code_of(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_code_of(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

// ── Output collection ────────────────────────────────────────────────────────

struct Collected {
    stdout: String,
    stderr: String,
    events: Vec<RawEvent>,
    session_id: Option<String>,
}

/// Accumulates both streams and drives the renderer.
struct Collector<'a> {
    engine: EngineId,
    renderer: &'a dyn Renderer,
    stream_json: bool,
    quiet: bool,
    verbose: bool,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    frames: BytesMut,
    codec: JsonLinesCodec,
    stdout_lines: LineBuffer,
    stderr_lines: LineBuffer,
    events: Vec<RawEvent>,
    session_id: Option<String>,
}

impl<'a> Collector<'a> {
    fn new(
        engine: EngineId,
        renderer: &'a dyn Renderer,
        codec: JsonLinesCodec,
        stream_json: bool,
        quiet: bool,
        verbose: bool,
    ) -> Self {
        Self {
            engine,
            renderer,
            stream_json,
            quiet,
            verbose,
            stdout: Vec::new(),
            stderr: Vec::new(),
            frames: BytesMut::new(),
            codec,
            stdout_lines: LineBuffer::default(),
            stderr_lines: LineBuffer::default(),
            events: Vec::new(),
            session_id: None,
        }
    }

    fn push(&mut self, chunk: Chunk) {
        match chunk.pipe {
            Pipe::Stdout => self.push_stdout(&chunk.bytes),
            Pipe::Stderr => self.push_stderr(&chunk.bytes),
        }
    }

    fn push_stdout(&mut self, bytes: &[u8]) {
        self.stdout.extend_from_slice(bytes);
        if self.stream_json {
            self.frames.extend_from_slice(bytes);
            self.drain_frames(false);
        } else {
            for line in self.stdout_lines.push(bytes) {
                if !self.quiet {
                    self.renderer.on_stdout(&line);
                }
            }
        }
    }

    fn push_stderr(&mut self, bytes: &[u8]) {
        self.stderr.extend_from_slice(bytes);
        for line in self.stderr_lines.push(bytes) {
            if !self.quiet {
                self.renderer.on_stderr(&line);
            }
        }
    }

    fn drain_frames(&mut self, eof: bool) {
        loop {
            let next = if eof {
                self.codec.decode_eof(&mut self.frames)
            } else {
                self.codec.decode(&mut self.frames)
            };
            if let Some(id) = self.codec.take_dropped_session_id() {
                debug!(session_id = %id, "session id from dropped frame");
                self.session_id = Some(id);
            }
            match next {
                Ok(Some(raw)) => self.accept(raw),
                Ok(None) => break,
                Err(err) => {
                    warn!(%err, "failed to decode engine output");
                    break;
                }
            }
        }
    }

    fn accept(&mut self, raw: RawEvent) {
        let event = normalize(&raw, self.engine);
        if let Some(id) = event.session_id() {
            if self.session_id.as_deref() != Some(id) {
                debug!(session_id = id, "engine reported session id");
                self.session_id = Some(id.to_owned());
            }
        }
        if !self.quiet {
            if self.verbose {
                self.renderer.on_raw(&raw);
            }
            self.renderer.on_event(&event);
        }
        self.events.push(raw);
    }

    fn finish(mut self) -> Collected {
        if self.stream_json {
            self.drain_frames(true);
        } else if let Some(line) = self.stdout_lines.flush() {
            if !self.quiet {
                self.renderer.on_stdout(&line);
            }
        }
        if let Some(line) = self.stderr_lines.flush() {
            if !self.quiet {
                self.renderer.on_stderr(&line);
            }
        }

        Collected {
            stdout: String::from_utf8_lossy(&self.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&self.stderr).into_owned(),
            events: self.events,
            session_id: self.session_id,
        }
    }
}

/// Splits a byte stream into complete text lines.
#[derive(Debug, Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            lines.push(decode_line(&raw[..pos]));
        }
        lines
    }

    fn flush(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let raw = std::mem::take(&mut self.pending);
        Some(decode_line(&raw))
    }
}

fn decode_line(raw: &[u8]) -> String {
    let line = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(line).into_owned()
}
