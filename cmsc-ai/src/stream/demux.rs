//! Line-level demultiplexer
//!
//! Splits decoded stream text into lines and classifies each one, most
//! specific first:
//!
//! 1. blank line or SSE comment (`:` prefix): ignored
//! 2. `data: {...}`: JSON frame; text delta and correlation id extracted,
//!    unparseable JSON falls back to literal text
//! 3. `data: [DONE]`: end of payload
//! 4. `data: <text>`: plain-text frame payload
//! 5. anything else: literal display text, forwarded verbatim
//!
//! The final, possibly incomplete line of a chunk is buffered and prepended
//! to the next chunk. A partial line that can no longer turn into a frame or
//! comment is released early so plain prose streams without waiting for a
//! newline.

use super::markers::{Marker, MarkerScanner, ProgressInfo};
use serde_json::Value;

const DATA_PREFIX: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

/// Which metadata field names identify the correlation id in JSON frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrelationKeys(pub &'static [&'static str]);

impl CorrelationKeys {
    /// Chat completions: `metadata.message_id`
    pub const MESSAGE: CorrelationKeys = CorrelationKeys(&["message_id"]);
    /// Content generation: `metadata.request_id`
    pub const REQUEST: CorrelationKeys = CorrelationKeys(&["request_id"]);
    /// Either field, message id preferred
    pub const ANY: CorrelationKeys = CorrelationKeys(&["message_id", "request_id"]);
}

/// Event produced while demultiplexing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Display text to forward and accumulate
    Text(String),
    /// Progress metadata
    Progress(ProgressInfo),
    /// `[DONE]` sentinel seen
    Done,
}

/// Incremental stream demultiplexer
///
/// Pure state machine: feed raw chunks with [`push`](Self::push), then call
/// [`finish`](Self::finish) once the transport ends.
#[derive(Debug)]
pub struct StreamDemuxer {
    keys: CorrelationKeys,
    utf8_pending: Vec<u8>,
    line_buf: String,
    /// Current line already classified as literal text and partly released
    in_text_line: bool,
    /// `\r` held back from released text until the next byte shows whether
    /// it ends the line
    pending_cr: bool,
    done: bool,
    markers: MarkerScanner,
    correlation_id: Option<String>,
    text: String,
}

impl StreamDemuxer {
    pub fn new(keys: CorrelationKeys) -> Self {
        Self {
            keys,
            utf8_pending: Vec::new(),
            line_buf: String::new(),
            in_text_line: false,
            pending_cr: false,
            done: false,
            markers: MarkerScanner::new(),
            correlation_id: None,
            text: String::new(),
        }
    }

    /// Text accumulated so far
    pub fn text(&self) -> &str {
        &self.text
    }

    /// First correlation id captured (message or request)
    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Consume the demuxer, returning accumulated text and correlation id
    pub fn into_parts(self) -> (String, Option<String>) {
        (self.text, self.correlation_id)
    }

    /// Feed one raw chunk
    pub fn push(&mut self, bytes: &[u8]) -> Vec<StreamEvent> {
        let mut decoded = self.decode(bytes);
        let mut events = Vec::new();

        if self.pending_cr && !decoded.is_empty() {
            self.pending_cr = false;
            if !decoded.starts_with('\n') {
                decoded.insert(0, '\r');
            }
        }

        // Markers are scanned line by line so ids resolve in stream order
        let mut rest = decoded.as_str();
        while let Some(pos) = rest.find('\n') {
            self.scan_markers(&rest[..=pos], &mut events);
            let segment = strip_cr(&rest[..pos]);
            if self.in_text_line {
                self.in_text_line = false;
                self.emit_text(format!("{}\n", segment), &mut events);
            } else {
                let mut line = std::mem::take(&mut self.line_buf);
                line.push_str(segment);
                self.classify_line(strip_cr(&line), true, &mut events);
            }
            rest = &rest[pos + 1..];
        }

        self.scan_markers(rest, &mut events);
        if self.in_text_line {
            self.release_text(rest.to_string(), &mut events);
        } else {
            self.line_buf.push_str(rest);
            if is_definitely_text(&self.line_buf) && !self.done {
                self.in_text_line = true;
                let released = std::mem::take(&mut self.line_buf);
                self.release_text(released, &mut events);
            }
        }

        events
    }

    /// Flush buffered state at end of stream
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();

        if !self.utf8_pending.is_empty() {
            let mut tail = String::from_utf8_lossy(&std::mem::take(&mut self.utf8_pending)).into_owned();
            if std::mem::take(&mut self.pending_cr) {
                tail.insert(0, '\r');
            }
            self.scan_markers(&tail, &mut events);
            if self.in_text_line {
                self.emit_text(tail, &mut events);
            } else {
                self.line_buf.push_str(&tail);
            }
        }

        if !self.line_buf.is_empty() {
            let line = std::mem::take(&mut self.line_buf);
            self.classify_line(strip_cr(&line), false, &mut events);
        }
        self.in_text_line = false;
        self.pending_cr = false;

        events
    }

    /// Decode bytes, holding back an incomplete trailing UTF-8 sequence
    fn decode(&mut self, bytes: &[u8]) -> String {
        let mut buf = std::mem::take(&mut self.utf8_pending);
        buf.extend_from_slice(bytes);

        match std::str::from_utf8(&buf) {
            Ok(s) => s.to_string(),
            Err(e) if e.error_len().is_none() => {
                let valid = e.valid_up_to();
                self.utf8_pending = buf[valid..].to_vec();
                String::from_utf8_lossy(&buf[..valid]).into_owned()
            }
            Err(_) => String::from_utf8_lossy(&buf).into_owned(),
        }
    }

    fn scan_markers(&mut self, chunk: &str, events: &mut Vec<StreamEvent>) {
        for marker in self.markers.scan(chunk) {
            match marker {
                Marker::MessageId(id) | Marker::RequestId(id) => self.capture_id(id),
                Marker::Progress(info) => events.push(StreamEvent::Progress(info)),
            }
        }
    }

    fn capture_id(&mut self, id: String) {
        if self.correlation_id.is_none() {
            tracing::debug!(correlation_id = %id, "Captured correlation id");
            self.correlation_id = Some(id);
        }
    }

    /// Emit part of an unterminated text line, holding back a trailing `\r`
    fn release_text(&mut self, mut text: String, events: &mut Vec<StreamEvent>) {
        if text.ends_with('\r') {
            text.pop();
            self.pending_cr = true;
        }
        self.emit_text(text, events);
    }

    fn emit_text(&mut self, text: String, events: &mut Vec<StreamEvent>) {
        if self.done || text.is_empty() {
            return;
        }
        self.text.push_str(&text);
        events.push(StreamEvent::Text(text));
    }

    fn classify_line(&mut self, line: &str, terminated: bool, events: &mut Vec<StreamEvent>) {
        if self.done || line.trim().is_empty() || line.starts_with(':') {
            return;
        }

        let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
            let text = if terminated {
                format!("{}\n", line)
            } else {
                line.to_string()
            };
            self.emit_text(text, events);
            return;
        };
        let payload = payload.strip_prefix(' ').unwrap_or(payload);

        if payload.trim() == DONE_SENTINEL {
            self.done = true;
            events.push(StreamEvent::Done);
            return;
        }

        if payload.trim_start().starts_with('{') {
            match serde_json::from_str::<Value>(payload) {
                Ok(frame) => self.handle_json_frame(&frame, events),
                Err(e) => {
                    tracing::debug!(error = %e, "Malformed JSON frame, forwarding as text");
                    let text = if terminated {
                        format!("{}\n", payload)
                    } else {
                        payload.to_string()
                    };
                    self.emit_text(text, events);
                }
            }
            return;
        }

        // Plain-text frame payload; an empty payload is a newline
        if payload.is_empty() {
            self.emit_text("\n".to_string(), events);
        } else {
            self.emit_text(payload.to_string(), events);
        }
    }

    fn handle_json_frame(&mut self, frame: &Value, events: &mut Vec<StreamEvent>) {
        if self.correlation_id.is_none() {
            if let Some(metadata) = frame.get("metadata") {
                let id = self
                    .keys
                    .0
                    .iter()
                    .find_map(|key| metadata.get(*key).and_then(Value::as_str));
                if let Some(id) = id {
                    self.capture_id(id.to_string());
                }
            }
        }

        if let Some(text) = extract_delta_text(frame) {
            self.emit_text(text.to_string(), events);
        }
    }
}

/// Text delta carried by a JSON frame, if any
///
/// Checked in order: `text`, `content`, `delta.content`, `delta.text`,
/// `choices[0].delta.content`.
pub fn extract_delta_text(frame: &Value) -> Option<&str> {
    frame
        .get("text")
        .and_then(Value::as_str)
        .or_else(|| frame.get("content").and_then(Value::as_str))
        .or_else(|| frame.pointer("/delta/content").and_then(Value::as_str))
        .or_else(|| frame.pointer("/delta/text").and_then(Value::as_str))
        .or_else(|| frame.pointer("/choices/0/delta/content").and_then(Value::as_str))
}

fn strip_cr(line: &str) -> &str {
    line.strip_suffix('\r').unwrap_or(line)
}

/// Whether a partial line can no longer become a frame, comment, or blank line
fn is_definitely_text(partial: &str) -> bool {
    if partial.trim().is_empty() || partial.starts_with(':') {
        return false;
    }
    let could_be_data = if partial.len() < DATA_PREFIX.len() {
        DATA_PREFIX.starts_with(partial)
    } else {
        partial.starts_with(DATA_PREFIX)
    };
    !could_be_data
}
