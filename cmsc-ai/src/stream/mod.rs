//! AI response stream ingestion
//!
//! [`StreamIngestor`] is the single read loop for both wire shapes the AI
//! endpoints emit. Callers pick which metadata field carries the correlation
//! id through [`IngestConfig`]; everything else is shared.

pub mod demux;
pub mod markers;

pub use demux::{extract_delta_text, CorrelationKeys, StreamDemuxer, StreamEvent};
pub use markers::{parse_marker, Marker, MarkerScanner, ProgressInfo};

use futures::{Stream, StreamExt};
use std::fmt::Display;
use thiserror::Error;

/// Ingestion errors
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("AI endpoint returned {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Stream interrupted: {0}")]
    Transport(String),
}

/// Receivers for incremental stream output
///
/// Callbacks run inline on the read loop and must return promptly.
pub trait StreamCallbacks {
    /// Display text as it arrives
    fn on_chunk(&mut self, text: &str);

    fn on_progress(&mut self, _info: &ProgressInfo) {}

    /// Fired once when the transport ends cleanly
    fn on_complete(&mut self, _full_text: &str, _correlation_id: Option<&str>) {}

    /// Fired once when the transport fails; `on_complete` is not called
    fn on_error(&mut self, _error: &IngestError) {}
}

/// Parameters that differ between AI endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestConfig {
    pub correlation_keys: CorrelationKeys,
}

impl IngestConfig {
    /// Chat completions carry `metadata.message_id`
    pub fn for_messages() -> Self {
        Self {
            correlation_keys: CorrelationKeys::MESSAGE,
        }
    }

    /// Content generation carries `metadata.request_id`
    pub fn for_requests() -> Self {
        Self {
            correlation_keys: CorrelationKeys::REQUEST,
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            correlation_keys: CorrelationKeys::ANY,
        }
    }
}

/// Result of a completed stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOutcome {
    pub text: String,
    pub correlation_id: Option<String>,
}

/// Consumes one AI response stream
#[derive(Debug, Clone, Default)]
pub struct StreamIngestor {
    config: IngestConfig,
}

impl StreamIngestor {
    pub fn new(config: IngestConfig) -> Self {
        Self { config }
    }

    /// Drive `stream` to completion, reporting through `callbacks`
    ///
    /// There is no internal timeout; dropping the returned future tears the
    /// transport down.
    pub async fn ingest<S, B, E, C>(
        &self,
        stream: S,
        callbacks: &mut C,
    ) -> Result<IngestOutcome, IngestError>
    where
        S: Stream<Item = Result<B, E>>,
        B: AsRef<[u8]>,
        E: Display,
        C: StreamCallbacks + ?Sized,
    {
        let mut stream = std::pin::pin!(stream);
        let mut demux = StreamDemuxer::new(self.config.correlation_keys);
        let mut chunks = 0usize;

        while let Some(item) = stream.next().await {
            match item {
                Ok(bytes) => {
                    chunks += 1;
                    let events = demux.push(bytes.as_ref());
                    dispatch(events, callbacks);
                }
                Err(e) => {
                    let error = IngestError::Transport(e.to_string());
                    tracing::warn!(error = %error, chunks, "AI stream failed");
                    callbacks.on_error(&error);
                    return Err(error);
                }
            }
        }

        let events = demux.finish();
        dispatch(events, callbacks);

        let (text, correlation_id) = demux.into_parts();
        tracing::debug!(
            chunks,
            chars = text.len(),
            correlation_id = ?correlation_id,
            "AI stream complete"
        );
        callbacks.on_complete(&text, correlation_id.as_deref());

        Ok(IngestOutcome {
            text,
            correlation_id,
        })
    }
}

fn dispatch<C: StreamCallbacks + ?Sized>(events: Vec<StreamEvent>, callbacks: &mut C) {
    for event in events {
        match event {
            StreamEvent::Text(text) => callbacks.on_chunk(&text),
            StreamEvent::Progress(info) => callbacks.on_progress(&info),
            StreamEvent::Done => tracing::debug!("Received [DONE] sentinel"),
        }
    }
}

/// Callbacks that collect everything, for tests and non-interactive callers
#[derive(Debug, Default)]
pub struct CollectingCallbacks {
    pub chunks: Vec<String>,
    pub progress: Vec<ProgressInfo>,
    pub completions: Vec<(String, Option<String>)>,
    pub errors: Vec<String>,
}

impl StreamCallbacks for CollectingCallbacks {
    fn on_chunk(&mut self, text: &str) {
        self.chunks.push(text.to_string());
    }

    fn on_progress(&mut self, info: &ProgressInfo) {
        self.progress.push(info.clone());
    }

    fn on_complete(&mut self, full_text: &str, correlation_id: Option<&str>) {
        self.completions
            .push((full_text.to_string(), correlation_id.map(str::to_string)));
    }

    fn on_error(&mut self, error: &IngestError) {
        self.errors.push(error.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn ok_stream(chunks: &[&'static str]) -> impl Stream<Item = Result<&'static [u8], String>> {
        let items: Vec<Result<&'static [u8], String>> =
            chunks.iter().map(|&c| Ok(c.as_bytes())).collect();
        stream::iter(items)
    }

    #[tokio::test]
    async fn test_ingest_collects_text_and_id() {
        let ingestor = StreamIngestor::new(IngestConfig::for_messages());
        let mut callbacks = CollectingCallbacks::default();

        let outcome = ingestor
            .ingest(
                ok_stream(&[
                    "data: {\"text\":\"Hi\",\"metadata\":{\"message_id\":\"m-9\"}}\n",
                    "data: {\"text\":\" there\"}\n",
                ]),
                &mut callbacks,
            )
            .await
            .unwrap();

        assert_eq!(outcome.text, "Hi there");
        assert_eq!(outcome.correlation_id.as_deref(), Some("m-9"));
        assert_eq!(callbacks.chunks, vec!["Hi", " there"]);
        assert_eq!(
            callbacks.completions,
            vec![("Hi there".to_string(), Some("m-9".to_string()))]
        );
    }

    #[tokio::test]
    async fn test_transport_error_skips_completion() {
        let ingestor = StreamIngestor::default();
        let mut callbacks = CollectingCallbacks::default();
        let items: Vec<Result<&'static [u8], String>> =
            vec![Ok(&b"partial"[..]), Err("connection reset".to_string())];

        let result = ingestor.ingest(stream::iter(items), &mut callbacks).await;

        assert!(matches!(result, Err(IngestError::Transport(_))));
        assert_eq!(callbacks.errors.len(), 1);
        assert!(callbacks.completions.is_empty());
        assert_eq!(callbacks.chunks, vec!["partial"]);
    }

    #[tokio::test]
    async fn test_trailing_line_flushed_at_end() {
        let ingestor = StreamIngestor::default();
        let mut callbacks = CollectingCallbacks::default();

        let outcome = ingestor
            .ingest(ok_stream(&["data: last"]), &mut callbacks)
            .await
            .unwrap();

        assert_eq!(outcome.text, "last");
    }
}
