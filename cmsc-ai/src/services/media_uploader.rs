//! Media upload
//!
//! Copies a remote image into the backend's asset store and returns the
//! backend-relative name. Failures are reported as `None`; callers substitute
//! a default asset instead of failing the record.

use crate::services::backend_gateway::GatewaySettings;
use crate::services::envelope::unwrap_envelope;
use crate::services::rate_limiter::RateLimiter;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

const DOWNLOAD_TIMEOUT_SECS: u64 = 60;

/// Upload errors (logged, never surfaced past the uploader)
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Download failed for {url}: {message}")]
    Download { url: String, message: String },

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Copies remote images into the backend asset store
#[async_trait]
pub trait MediaUploader: Send + Sync {
    /// Upload `remote_url`; `None` signals failure
    async fn upload(&self, remote_url: &str) -> Option<String>;
}

#[derive(Debug, Deserialize)]
struct UploadedMedia {
    name: String,
}

/// HTTP implementation of [`MediaUploader`]
pub struct HttpMediaUploader {
    http_client: reqwest::Client,
    rate_limiter: RateLimiter,
    settings: GatewaySettings,
}

impl HttpMediaUploader {
    pub fn new(settings: GatewaySettings) -> Result<Self, UploadError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
            .build()
            .map_err(|e| UploadError::Upload(e.to_string()))?;

        Ok(Self {
            http_client,
            rate_limiter: RateLimiter::new(settings.min_interval),
            settings,
        })
    }

    async fn try_upload(&self, remote_url: &str) -> Result<String, UploadError> {
        let download_err = |message: String| UploadError::Download {
            url: remote_url.to_string(),
            message,
        };

        let response = self
            .http_client
            .get(remote_url)
            .send()
            .await
            .map_err(|e| download_err(e.to_string()))?;

        if !response.status().is_success() {
            return Err(download_err(format!("HTTP {}", response.status().as_u16())));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/jpeg")
            .to_string();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| download_err(e.to_string()))?;

        let file_name = file_name_for(remote_url, &content_type);
        tracing::debug!(url = %remote_url, file_name = %file_name, size = bytes.len(), "Downloaded image");

        let part = Part::bytes(bytes.to_vec())
            .file_name(file_name)
            .mime_str(&content_type)
            .map_err(|e| UploadError::Upload(e.to_string()))?;
        let form = Form::new().part("media", part);

        let url = format!(
            "{}/buckets/{}/media",
            self.settings.api_url.trim_end_matches('/'),
            self.settings.bucket
        );

        self.rate_limiter.wait().await;

        let mut request = self.http_client.post(&url).multipart(form);
        if let Some(key) = &self.settings.write_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| UploadError::Upload(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError::Upload(format!("HTTP {}: {}", status, body)));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| UploadError::Parse(e.to_string()))?;
        let media: UploadedMedia = serde_json::from_value(unwrap_envelope(body, &["media"]))
            .map_err(|e| UploadError::Parse(e.to_string()))?;

        Ok(media.name)
    }
}

#[async_trait]
impl MediaUploader for HttpMediaUploader {
    async fn upload(&self, remote_url: &str) -> Option<String> {
        match self.try_upload(remote_url).await {
            Ok(name) => {
                tracing::info!(url = %remote_url, name = %name, "Uploaded image");
                Some(name)
            }
            Err(e) => {
                tracing::warn!(url = %remote_url, error = %e, "Image upload failed");
                None
            }
        }
    }
}

/// Derive an upload file name from the URL path and content type
///
/// Stock-photo URLs often lack an extension (`/photo-123?w=800`), so one is
/// added from the content type when missing.
fn file_name_for(remote_url: &str, content_type: &str) -> String {
    let stem = reqwest::Url::parse(remote_url)
        .ok()
        .and_then(|url| {
            url.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| format!("image-{}", cmsc_common::uuid_utils::generate()));

    if stem.contains('.') {
        return stem;
    }

    let extension = match content_type.split(';').next().unwrap_or("").trim() {
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/svg+xml" => "svg",
        _ => "jpg",
    };
    format!("{}.{}", stem, extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_keeps_extension() {
        assert_eq!(
            file_name_for("https://example.com/a/b/cat.png?x=1", "image/png"),
            "cat.png"
        );
    }

    #[test]
    fn test_file_name_adds_extension() {
        assert_eq!(
            file_name_for("https://images.unsplash.com/photo-1?w=800", "image/webp"),
            "photo-1.webp"
        );
        assert_eq!(
            file_name_for("https://images.unsplash.com/photo-2", "image/jpeg; charset=binary"),
            "photo-2.jpg"
        );
    }

    #[test]
    fn test_file_name_fallback() {
        let name = file_name_for("https://example.com/", "image/gif");
        assert!(name.starts_with("image-"));
        assert!(name.ends_with(".gif"));
    }
}
