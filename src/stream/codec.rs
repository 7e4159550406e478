//! Incremental JSON-Lines codec for engine stdout.
//!
//! Engines print one JSON object per line, but a pipe read can end anywhere:
//! mid-object, mid-line, or between two lines. [`JsonLinesCodec`] keeps the
//! unconsumed bytes in the caller's buffer and only consumes a frame once it
//! parses.
//!
//! # Framing rules
//!
//! - A newline-terminated frame that parses as a JSON object is emitted.
//! - A frame that parses as a JSON scalar or array is consumed silently.
//! - A frame whose parse fails only because input ended early (for example
//!   a pretty-printed object spanning several lines) is kept, and the next
//!   newline extends it.
//! - A frame that can never parse (syntax error, plain text output) is
//!   discarded one line at a time.
//! - A frame that grows past the size cap (default
//!   [`DEFAULT_MAX_FRAME_BYTES`]) is discarded up to its newline. Its
//!   `type` and session id are logged, and the session id stays available
//!   through [`JsonLinesCodec::take_dropped_session_id`].
//! - Bytes after the last newline stay buffered until more data arrives or
//!   [`Decoder::decode_eof`] is called.

use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;
use tracing::{debug, warn};

use crate::models::RawEvent;
use crate::{AppError, Result};

/// Default cap on a single frame: 64 MiB.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 64 * 1024 * 1024;

/// Keys peeked from an oversized frame that is being dropped.
const DROPPED_SESSION_KEYS: [&str; 3] = ["session_id", "sessionId", "thread_id"];

/// JSON-Lines decoder yielding one [`RawEvent`] per parsed object.
#[derive(Debug)]
pub struct JsonLinesCodec {
    max_frame_bytes: usize,
    /// Offset where the next newline search starts; non-zero while an
    /// incomplete multi-line frame is pending.
    scan_from: usize,
    /// Oversized frame being dropped until its terminating newline.
    dropping: Option<DroppedFrame>,
    /// Session id seen in the last dropped frame, not yet taken.
    dropped_session_id: Option<String>,
    /// Input has ended; incomplete frames can no longer complete.
    at_eof: bool,
}

#[derive(Debug, Default)]
struct DroppedFrame {
    kind: Option<String>,
    session_id: Option<String>,
    bytes: usize,
}

impl DroppedFrame {
    fn observe(&mut self, chunk: &[u8]) {
        if self.kind.is_none() {
            self.kind = peek_str_field(chunk, "type");
        }
        if let Some(id) = DROPPED_SESSION_KEYS
            .iter()
            .find_map(|key| peek_str_field(chunk, key))
        {
            self.session_id = Some(id);
        }
        self.bytes += chunk.len();
    }
}

impl Default for JsonLinesCodec {
    fn default() -> Self {
        Self::with_max_frame_bytes(DEFAULT_MAX_FRAME_BYTES)
    }
}

enum Frame {
    Blank,
    Object(RawEvent),
    NotObject,
    Incomplete,
    Invalid,
}

fn classify(frame: &[u8]) -> Frame {
    if frame.iter().all(u8::is_ascii_whitespace) {
        return Frame::Blank;
    }
    match serde_json::from_slice::<RawEvent>(frame) {
        Ok(value @ RawEvent::Object(_)) => Frame::Object(value),
        Ok(_) => Frame::NotObject,
        Err(err) if err.is_eof() => Frame::Incomplete,
        Err(_) => Frame::Invalid,
    }
}

impl JsonLinesCodec {
    /// Create a codec with an empty framing state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a codec that drops frames larger than `max_frame_bytes`.
    #[must_use]
    pub fn with_max_frame_bytes(max_frame_bytes: usize) -> Self {
        Self {
            max_frame_bytes: max_frame_bytes.max(1),
            scan_from: 0,
            dropping: None,
            dropped_session_id: None,
            at_eof: false,
        }
    }

    /// Session id carried by the most recently dropped oversized frame.
    pub fn take_dropped_session_id(&mut self) -> Option<String> {
        self.dropped_session_id.take()
    }

    fn consume(&mut self, src: &mut BytesMut, end: usize) {
        src.advance(end);
        self.scan_from = 0;
    }

    fn discard_first_line(&mut self, src: &mut BytesMut) {
        match src.iter().position(|b| *b == b'\n') {
            Some(pos) => {
                debug!(bytes = pos + 1, "json-lines: discarding unparseable line");
                self.consume(src, pos + 1);
            }
            None => {
                src.clear();
                self.scan_from = 0;
            }
        }
    }

    fn start_drop(&mut self, src: &mut BytesMut) {
        let mut dropped = DroppedFrame::default();
        dropped.observe(src);
        src.clear();
        self.scan_from = 0;
        self.dropping = Some(dropped);
    }

    /// Keep dropping an oversized frame. Returns `false` while its newline
    /// has not arrived yet.
    fn skip_oversized(&mut self, src: &mut BytesMut) -> bool {
        let Some(dropped) = self.dropping.as_mut() else {
            return true;
        };
        match src.iter().position(|b| *b == b'\n') {
            Some(pos) => {
                dropped.observe(&src[..pos]);
                src.advance(pos + 1);
                self.finish_drop();
                true
            }
            None => {
                dropped.observe(src);
                src.clear();
                false
            }
        }
    }

    fn finish_drop(&mut self) {
        let Some(dropped) = self.dropping.take() else {
            return;
        };
        warn!(
            kind = dropped.kind.as_deref().unwrap_or("unknown"),
            session_id = dropped.session_id.as_deref().unwrap_or(""),
            bytes = dropped.bytes,
            max_frame_bytes = self.max_frame_bytes,
            "json-lines: dropped oversized frame"
        );
        if dropped.session_id.is_some() {
            self.dropped_session_id = dropped.session_id;
        }
    }
}

/// Best-effort read of a top-level-looking `"key": "value"` pair from raw
/// bytes that could not be parsed as a whole.
fn peek_str_field(frame: &[u8], key: &str) -> Option<String> {
    let needle = format!("\"{key}\"");
    let start = frame
        .windows(needle.len())
        .position(|window| window == needle.as_bytes())?
        + needle.len();
    let rest = frame[start..].trim_ascii_start().strip_prefix(b":")?;
    let rest = rest.trim_ascii_start().strip_prefix(b"\"")?;
    let end = rest.iter().position(|b| *b == b'"')?;
    let value = std::str::from_utf8(&rest[..end]).ok()?;
    (!value.is_empty()).then(|| value.to_owned())
}

impl Decoder for JsonLinesCodec {
    type Item = RawEvent;
    type Error = AppError;

    /// Decode the next complete JSON object from `src`.
    ///
    /// Returns `Ok(None)` when `src` holds no complete frame yet. Never
    /// fails on malformed input; bad lines are dropped.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        loop {
            if !self.skip_oversized(src) {
                return Ok(None);
            }

            let search = src.get(self.scan_from..).unwrap_or_default();
            let Some(offset) = search.iter().position(|b| *b == b'\n') else {
                if self.at_eof && self.scan_from > 0 {
                    // The pending multi-line frame can no longer complete;
                    // drop its first line and rescan what follows.
                    self.discard_first_line(src);
                    continue;
                }
                if src.len() > self.max_frame_bytes {
                    if self.scan_from > 0 {
                        self.discard_first_line(src);
                        continue;
                    }
                    self.start_drop(src);
                }
                return Ok(None);
            };

            let end = self.scan_from + offset + 1;
            match classify(&src[..end]) {
                Frame::Blank | Frame::NotObject => self.consume(src, end),
                Frame::Object(event) => {
                    self.consume(src, end);
                    return Ok(Some(event));
                }
                Frame::Incomplete if end <= self.max_frame_bytes => {
                    self.scan_from = end;
                }
                Frame::Incomplete | Frame::Invalid => self.discard_first_line(src),
            }
        }
    }

    /// Decode what remains once the stream has closed.
    ///
    /// An unterminated trailing frame is parsed as if a newline followed it;
    /// anything still incomplete is discarded.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if let Some(event) = self.decode(src)? {
            return Ok(Some(event));
        }
        self.at_eof = true;
        self.finish_drop();
        if src.is_empty() {
            return Ok(None);
        }
        if !src.ends_with(b"\n") {
            src.extend_from_slice(b"\n");
        }
        self.decode(src)
    }
}
