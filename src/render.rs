//! Render callbacks for normalized output.
//!
//! The conductor never draws anything itself. It calls a [`Renderer`] once
//! per [`StreamEvent`], once per stderr line, and once at the end of the
//! run with the exit code.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::models::{RawEvent, StreamEvent};

/// Receiver of run output.
///
/// Implementations must be [`Send`] and [`Sync`]: callbacks arrive from the
/// runner's coordinator task.
pub trait Renderer: Send + Sync {
    /// A normalized event was parsed from stdout.
    fn on_event(&self, event: &StreamEvent);

    /// A raw event was parsed; only called for verbose runs.
    fn on_raw(&self, _event: &RawEvent) {}

    /// The child wrote a complete line of plain-text stdout; only called
    /// for runs without stream-json output.
    fn on_stdout(&self, _line: &str) {}

    /// The child wrote a complete line to stderr.
    fn on_stderr(&self, line: &str);

    /// The run finished with `exit_code`.
    fn finalize(&self, exit_code: i32);
}

/// Renderer that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn on_event(&self, _event: &StreamEvent) {}

    fn on_stderr(&self, _line: &str) {}

    fn finalize(&self, _exit_code: i32) {}
}

/// Plain terminal renderer: assistant text on stdout, everything else on
/// stderr.
///
/// Deltas are printed inline. Once a turn has streamed deltas, the complete
/// message and result that repeat the same text are not printed again.
#[derive(Debug, Default)]
pub struct TerminalRenderer {
    mid_line: AtomicBool,
    streamed: AtomicBool,
}

impl TerminalRenderer {
    /// Create a renderer with no pending output.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn print(&self, text: &str) {
        let mut out = std::io::stdout().lock();
        // Broken pipes on the terminal are not worth failing a run over.
        let _ = out.write_all(text.as_bytes());
        let _ = out.flush();
        self.mid_line.store(!text.ends_with('\n'), Ordering::Relaxed);
    }

    fn end_line(&self) {
        if self.mid_line.swap(false, Ordering::Relaxed) {
            println!();
        }
    }
}

impl Renderer for TerminalRenderer {
    fn on_event(&self, event: &StreamEvent) {
        match event {
            StreamEvent::Init { .. } => {}
            StreamEvent::Delta { text, .. } => {
                if !text.is_empty() {
                    self.streamed.store(true, Ordering::Relaxed);
                    self.print(text);
                }
            }
            StreamEvent::Message { text, .. } | StreamEvent::Result { text, .. } => {
                if self.streamed.load(Ordering::Relaxed) {
                    return;
                }
                if !text.is_empty() {
                    self.end_line();
                    self.print(text);
                    self.end_line();
                }
            }
            StreamEvent::Error { text, .. } => {
                self.end_line();
                eprintln!("[error] {text}");
            }
        }
    }

    fn on_raw(&self, event: &RawEvent) {
        eprintln!("[event] {event}");
    }

    fn on_stdout(&self, line: &str) {
        self.end_line();
        self.print(line);
        self.print("\n");
    }

    fn on_stderr(&self, line: &str) {
        eprintln!("{line}");
    }

    fn finalize(&self, exit_code: i32) {
        self.end_line();
        self.streamed.store(false, Ordering::Relaxed);
        if exit_code != 0 {
            eprintln!("[exit {exit_code}]");
        }
    }
}
