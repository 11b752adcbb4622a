//! HTML-comment metadata markers
//!
//! Markers ride inside display text rather than on `data:` lines:
//!
//! ```text
//! <!-- MESSAGE_ID: 0b6e...-->
//! <!-- REQUEST_ID: 41c2... -->
//! <!-- PROGRESS: {"current":1,"total":3,"filename":"a.md"} -->
//! ```
//!
//! The scanner works chunk by chunk but carries an unterminated `<!--` over
//! to the next chunk, so a marker split across a network read is still seen.

use serde::{Deserialize, Serialize};

/// Longest unterminated comment carried between chunks
const MAX_CARRY_BYTES: usize = 4096;

const OPEN: &str = "<!--";
const CLOSE: &str = "-->";

/// Progress reported by a `PROGRESS` marker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressInfo {
    pub current: u64,
    pub total: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

/// Parsed marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Marker {
    MessageId(String),
    RequestId(String),
    Progress(ProgressInfo),
}

/// Chunk-level marker scanner with carry-over
#[derive(Debug, Default)]
pub struct MarkerScanner {
    carry: String,
}

impl MarkerScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan one decoded chunk, returning markers completed by it
    pub fn scan(&mut self, chunk: &str) -> Vec<Marker> {
        let mut buf = std::mem::take(&mut self.carry);
        buf.push_str(chunk);

        let mut markers = Vec::new();
        let mut cursor = 0;

        loop {
            let Some(rel_open) = buf[cursor..].find(OPEN) else {
                self.carry = partial_opener(&buf[cursor..]).to_string();
                break;
            };
            let body_start = cursor + rel_open + OPEN.len();

            let Some(rel_close) = buf[body_start..].find(CLOSE) else {
                let pending = &buf[cursor + rel_open..];
                if pending.len() <= MAX_CARRY_BYTES {
                    self.carry = pending.to_string();
                } else {
                    tracing::debug!(bytes = pending.len(), "Dropping oversized unterminated comment");
                }
                break;
            };

            if let Some(marker) = parse_marker(&buf[body_start..body_start + rel_close]) {
                markers.push(marker);
            }
            cursor = body_start + rel_close + CLOSE.len();
        }

        markers
    }
}

/// Suffix of `text` that could begin a `<!--` in the next chunk
fn partial_opener(text: &str) -> &str {
    for len in (1..OPEN.len()).rev() {
        if text.ends_with(&OPEN[..len]) {
            return &text[text.len() - len..];
        }
    }
    ""
}

/// Parse a comment body; ordinary comments yield `None`
pub fn parse_marker(body: &str) -> Option<Marker> {
    let body = body.trim();

    if let Some(id) = body.strip_prefix("MESSAGE_ID:") {
        let id = id.trim();
        return (!id.is_empty()).then(|| Marker::MessageId(id.to_string()));
    }

    if let Some(id) = body.strip_prefix("REQUEST_ID:") {
        let id = id.trim();
        return (!id.is_empty()).then(|| Marker::RequestId(id.to_string()));
    }

    if let Some(json) = body.strip_prefix("PROGRESS:") {
        return match serde_json::from_str::<ProgressInfo>(json.trim()) {
            Ok(info) => Some(Marker::Progress(info)),
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring malformed PROGRESS marker");
                None
            }
        };
    }

    None
}
