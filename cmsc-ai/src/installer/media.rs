//! Image-handling path for thumbnails and file fields

use crate::services::MediaUploader;
use reqwest::Url;
use serde_json::Value;

/// How an image reference should be handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// External stock photo; download and re-upload
    Stock,
    /// Already in the backend asset store; carries the relative path
    Asset(String),
    /// Anything else; sent unchanged
    Passthrough,
}

/// Hosts consulted by [`classify_image_url`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageHosts {
    pub stock_hosts: Vec<String>,
    pub asset_hosts: Vec<String>,
}

pub fn classify_image_url(value: &str, hosts: &ImageHosts) -> ImageSource {
    let Ok(url) = Url::parse(value.trim()) else {
        return ImageSource::Passthrough;
    };
    if !matches!(url.scheme(), "http" | "https") {
        return ImageSource::Passthrough;
    }
    let Some(host) = url.host_str() else {
        return ImageSource::Passthrough;
    };

    if hosts.stock_hosts.iter().any(|h| h.eq_ignore_ascii_case(host)) {
        return ImageSource::Stock;
    }

    if hosts.asset_hosts.iter().any(|h| h.eq_ignore_ascii_case(host)) {
        let path = url.path().trim_start_matches('/');
        if !path.is_empty() {
            return ImageSource::Asset(path.to_string());
        }
    }

    ImageSource::Passthrough
}

/// Resolve one image reference to what the backend should store
pub async fn resolve_image(
    value: &str,
    hosts: &ImageHosts,
    uploader: &dyn MediaUploader,
    default_asset: Option<&str>,
) -> String {
    match classify_image_url(value, hosts) {
        ImageSource::Stock => match uploader.upload(value).await {
            Some(name) => name,
            None => match default_asset {
                Some(fallback) => {
                    tracing::warn!(url = %value, fallback = %fallback, "Using default asset");
                    fallback.to_string()
                }
                None => value.to_string(),
            },
        },
        ImageSource::Asset(path) => path,
        ImageSource::Passthrough => value.to_string(),
    }
}

/// Resolve every image string inside a file field value
///
/// Strings and arrays of strings are rewritten; other shapes are left alone.
pub async fn resolve_file_value(
    value: &Value,
    hosts: &ImageHosts,
    uploader: &dyn MediaUploader,
    default_asset: Option<&str>,
) -> Value {
    match value {
        Value::String(text) => {
            Value::String(resolve_image(text, hosts, uploader, default_asset).await)
        }
        Value::Array(items) => {
            let mut resolved = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::String(text) => resolved.push(Value::String(
                        resolve_image(text, hosts, uploader, default_asset).await,
                    )),
                    other => resolved.push(other.clone()),
                }
            }
            Value::Array(resolved)
        }
        other => other.clone(),
    }
}
