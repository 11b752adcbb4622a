//! AI streaming endpoint client
//!
//! Builds the completion request and hands the response body to
//! [`StreamIngestor`]. Chat and content generation share one read loop and
//! differ only in which metadata field carries the correlation id.

use crate::services::envelope::error_message;
use crate::stream::{IngestConfig, IngestError, IngestOutcome, StreamCallbacks, StreamIngestor};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const USER_AGENT: &str = concat!("cmsc-ai/", env!("CARGO_PKG_VERSION"));
const CONNECT_TIMEOUT_SECS: u64 = 15;

/// Conversation role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Context hints sent alongside the conversation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatContext {
    /// Selected type slugs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub object_types: Vec<String>,
    /// External URLs for the endpoint to crawl
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub model: String,
    #[serde(default)]
    pub context: ChatContext,
    pub stream: bool,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            model: model.into(),
            context: ChatContext::default(),
            stream: true,
        }
    }

    pub fn with_context(mut self, context: ChatContext) -> Self {
        self.context = context;
        self
    }
}

/// Streaming endpoint to call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiEndpoint {
    /// Conversational completion, correlated by message id
    Chat,
    /// Structured content generation, correlated by request id
    Generate,
}

impl AiEndpoint {
    fn path(self) -> &'static str {
        match self {
            AiEndpoint::Chat => "ai/chat",
            AiEndpoint::Generate => "ai/generate",
        }
    }

    fn ingest_config(self) -> IngestConfig {
        match self {
            AiEndpoint::Chat => IngestConfig::for_messages(),
            AiEndpoint::Generate => IngestConfig::for_requests(),
        }
    }
}

/// Client for the AI streaming endpoints
pub struct AiClient {
    http_client: reqwest::Client,
    ai_url: String,
    bucket: String,
    write_key: Option<String>,
}

impl AiClient {
    pub fn new(
        ai_url: impl Into<String>,
        bucket: impl Into<String>,
        write_key: Option<String>,
    ) -> Result<Self, IngestError> {
        // No overall timeout: a completion may stream for minutes
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| IngestError::Request(e.to_string()))?;

        Ok(Self {
            http_client,
            ai_url: ai_url.into(),
            bucket: bucket.into(),
            write_key,
        })
    }

    pub fn endpoint_url(&self, endpoint: AiEndpoint) -> String {
        format!(
            "{}/buckets/{}/{}",
            self.ai_url.trim_end_matches('/'),
            self.bucket,
            endpoint.path()
        )
    }

    /// Send `request` and stream the response through `callbacks`
    ///
    /// A non-success status fails before any streaming, after reporting
    /// through `on_error`.
    pub async fn stream<C>(
        &self,
        endpoint: AiEndpoint,
        request: &ChatRequest,
        callbacks: &mut C,
    ) -> Result<IngestOutcome, IngestError>
    where
        C: StreamCallbacks + ?Sized,
    {
        let url = self.endpoint_url(endpoint);
        tracing::info!(url = %url, model = %request.model, "Starting AI stream");

        let mut builder = self.http_client.post(&url).json(request);
        if let Some(key) = &self.write_key {
            builder = builder.bearer_auth(key);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                let error = IngestError::Request(e.to_string());
                callbacks.on_error(&error);
                return Err(error);
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(reject(status, &body, callbacks));
        }

        StreamIngestor::new(endpoint.ingest_config())
            .ingest(response.bytes_stream(), callbacks)
            .await
    }

    pub async fn stream_chat<C>(
        &self,
        request: &ChatRequest,
        callbacks: &mut C,
    ) -> Result<IngestOutcome, IngestError>
    where
        C: StreamCallbacks + ?Sized,
    {
        self.stream(AiEndpoint::Chat, request, callbacks).await
    }
}

/// Error for a rejected request; the body's message wins over the status reason
fn rejection_error(status: reqwest::StatusCode, body: &str) -> IngestError {
    let message = error_message(body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    });
    IngestError::HttpStatus {
        status: status.as_u16(),
        body: message,
    }
}

/// Report a rejected request through `on_error` without streaming
fn reject<C>(status: reqwest::StatusCode, body: &str, callbacks: &mut C) -> IngestError
where
    C: StreamCallbacks + ?Sized,
{
    let error = rejection_error(status, body);
    tracing::warn!(error = %error, "AI endpoint rejected request");
    callbacks.on_error(&error);
    error
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::CollectingCallbacks;
    use reqwest::StatusCode;
    use serde_json::json;

    #[test]
    fn test_chat_request_shape() {
        let request = ChatRequest::new("model-x", vec![ChatMessage::user("Build a blog")])
            .with_context(ChatContext {
                object_types: vec!["posts".to_string()],
                links: vec![],
            });

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "messages": [{"role": "user", "content": "Build a blog"}],
                "model": "model-x",
                "context": {"object_types": ["posts"]},
                "stream": true
            })
        );
    }

    #[test]
    fn test_endpoint_url() {
        let client = AiClient::new("https://ai.example.com/v3/", "demo", None).unwrap();
        assert_eq!(
            client.endpoint_url(AiEndpoint::Chat),
            "https://ai.example.com/v3/buckets/demo/ai/chat"
        );
        assert_eq!(
            client.endpoint_url(AiEndpoint::Generate),
            "https://ai.example.com/v3/buckets/demo/ai/generate"
        );
    }

    #[test]
    fn test_rejection_with_empty_body_uses_status_reason() {
        let error = rejection_error(StatusCode::SERVICE_UNAVAILABLE, "");
        assert!(matches!(
            error,
            IngestError::HttpStatus { status: 503, ref body } if body == "Service Unavailable"
        ));
    }

    #[test]
    fn test_rejection_with_json_message() {
        let error = rejection_error(StatusCode::UNAUTHORIZED, r#"{"message":"Invalid write key"}"#);
        assert!(matches!(
            error,
            IngestError::HttpStatus { status: 401, ref body } if body == "Invalid write key"
        ));
    }

    #[test]
    fn test_rejection_with_plain_text_body() {
        let error = rejection_error(StatusCode::BAD_GATEWAY, "  upstream timed out\n");
        assert!(matches!(
            error,
            IngestError::HttpStatus { status: 502, ref body } if body == "upstream timed out"
        ));
    }

    #[test]
    fn test_reject_reports_error_once_without_streaming() {
        let mut callbacks = CollectingCallbacks::default();

        let error = reject(StatusCode::FORBIDDEN, r#"{"error":"bucket locked"}"#, &mut callbacks);

        assert_eq!(error.to_string(), "AI endpoint returned 403: bucket locked");
        assert_eq!(callbacks.errors, vec![error.to_string()]);
        assert!(callbacks.chunks.is_empty());
        assert!(callbacks.completions.is_empty());
    }
}
