//! Backend REST gateway
//!
//! Create/list/patch operations for type definitions and records. Every call
//! is an independent HTTP request; the backend offers no batch or transaction
//! primitive.

use crate::models::{FieldValue, NewRecord, RemoteRecord, TypeDefinition};
use crate::services::envelope::{error_message, unwrap_envelope};
use crate::services::rate_limiter::RateLimiter;
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("cmsc-ai/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 30;
const MIN_REQUEST_INTERVAL_MS: u64 = 100;

/// Gateway errors
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl GatewayError {
    /// Whether the failure means "this already exists"
    ///
    /// Duplicates are soft skips for the installer, never hard errors.
    pub fn is_duplicate(&self) -> bool {
        match self {
            GatewayError::Api { status, message } => {
                *status == StatusCode::CONFLICT.as_u16() || is_duplicate_message(message)
            }
            _ => false,
        }
    }
}

/// Match the backend's duplicate/"already used" phrasing
pub fn is_duplicate_message(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    ["already used", "already exists", "already in use", "duplicate"]
        .iter()
        .any(|pattern| lower.contains(pattern))
}

/// Backend operations consumed by the installer and reference resolver
#[async_trait]
pub trait BackendGateway: Send + Sync {
    /// Slug of the bucket this gateway targets (empty when none selected)
    fn bucket(&self) -> &str;

    async fn create_type(&self, def: &TypeDefinition) -> Result<TypeDefinition, GatewayError>;

    async fn list_types(&self) -> Result<Vec<TypeDefinition>, GatewayError>;

    async fn create_record(&self, record: &NewRecord) -> Result<RemoteRecord, GatewayError>;

    /// Records whose slug equals `slug`; an absent slug yields an empty list
    async fn find_records_by_slug(
        &self,
        slug: &str,
        limit: usize,
    ) -> Result<Vec<RemoteRecord>, GatewayError>;

    async fn patch_record(&self, id: &str, fields: &[FieldValue]) -> Result<(), GatewayError>;
}

/// Connection settings for [`HttpGateway`]
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub api_url: String,
    pub bucket: String,
    pub read_key: Option<String>,
    pub write_key: Option<String>,
    pub timeout: Duration,
    pub min_interval: Duration,
}

impl GatewaySettings {
    pub fn new(api_url: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            bucket: bucket.into(),
            read_key: None,
            write_key: None,
            timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            min_interval: Duration::from_millis(MIN_REQUEST_INTERVAL_MS),
        }
    }
}

/// HTTP implementation of [`BackendGateway`]
///
/// Constructed once per command invocation and passed explicitly to the
/// installer.
pub struct HttpGateway {
    http_client: reqwest::Client,
    rate_limiter: RateLimiter,
    settings: GatewaySettings,
}

impl HttpGateway {
    pub fn new(settings: GatewaySettings) -> Result<Self, GatewayError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(settings.timeout)
            .build()
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            rate_limiter: RateLimiter::new(settings.min_interval),
            settings,
        })
    }

    fn bucket_url(&self, path: &str) -> String {
        format!(
            "{}/buckets/{}/{}",
            self.settings.api_url.trim_end_matches('/'),
            self.settings.bucket,
            path
        )
    }

    fn with_read_auth(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.settings.read_key {
            Some(key) => request.query(&[("read_key", key.as_str())]),
            None => request,
        }
    }

    fn with_write_auth(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.settings.write_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, GatewayError> {
        self.rate_limiter.wait().await;

        let response = request
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });

        if status == StatusCode::NOT_FOUND {
            return Err(GatewayError::NotFound(message));
        }

        Err(GatewayError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn decode<T: DeserializeOwned>(
        response: Response,
        keys: &[&str],
    ) -> Result<T, GatewayError> {
        let body: Value = response
            .json()
            .await
            .map_err(|e| GatewayError::Parse(e.to_string()))?;

        serde_json::from_value(unwrap_envelope(body, keys))
            .map_err(|e| GatewayError::Parse(e.to_string()))
    }
}

#[async_trait]
impl BackendGateway for HttpGateway {
    fn bucket(&self) -> &str {
        &self.settings.bucket
    }

    async fn create_type(&self, def: &TypeDefinition) -> Result<TypeDefinition, GatewayError> {
        let url = self.bucket_url("object-types");
        tracing::debug!(title = %def.title, url = %url, "Creating type definition");

        let request = self.with_write_auth(self.http_client.post(&url).json(def));
        let response = self.send(request).await?;
        Self::decode(response, &["object_type"]).await
    }

    async fn list_types(&self) -> Result<Vec<TypeDefinition>, GatewayError> {
        let url = self.bucket_url("object-types");
        tracing::debug!(url = %url, "Listing type definitions");

        let request = self.with_read_auth(self.http_client.get(&url));
        let response = self.send(request).await?;
        Self::decode(response, &["object_types"]).await
    }

    async fn create_record(&self, record: &NewRecord) -> Result<RemoteRecord, GatewayError> {
        let url = self.bucket_url("objects");
        tracing::debug!(slug = %record.slug, type_slug = %record.type_slug, "Creating record");

        let request = self.with_write_auth(self.http_client.post(&url).json(record));
        let response = self.send(request).await?;
        Self::decode(response, &["object"]).await
    }

    async fn find_records_by_slug(
        &self,
        slug: &str,
        limit: usize,
    ) -> Result<Vec<RemoteRecord>, GatewayError> {
        let url = self.bucket_url("objects");
        let query = json!({ "slug": slug }).to_string();
        let limit = limit.to_string();

        let request = self.with_read_auth(self.http_client.get(&url).query(&[
            ("query", query.as_str()),
            ("limit", limit.as_str()),
            ("props", "id,slug,title,type"),
        ]));

        // The list endpoint answers 404 when nothing matches
        match self.send(request).await {
            Ok(response) => Self::decode(response, &["objects"]).await,
            Err(GatewayError::NotFound(_)) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    async fn patch_record(&self, id: &str, fields: &[FieldValue]) -> Result<(), GatewayError> {
        let url = self.bucket_url(&format!("objects/{}", id));
        tracing::debug!(id = %id, fields = fields.len(), "Patching record");

        let body = json!({ "metafields": fields });
        let request = self.with_write_auth(self.http_client.patch(&url).json(&body));
        self.send(request).await?;
        Ok(())
    }
}
