//! Media uploader double

use async_trait::async_trait;
use cmsc_ai::services::MediaUploader;
use std::sync::Mutex;

pub struct FakeUploader {
    fail: bool,
    uploads: Mutex<Vec<String>>,
}

impl FakeUploader {
    /// Uploads succeed, naming the asset `uploaded-<last path segment>`
    pub fn new() -> Self {
        Self {
            fail: false,
            uploads: Mutex::new(Vec::new()),
        }
    }

    /// Every upload fails
    pub fn failing() -> Self {
        Self {
            fail: true,
            uploads: Mutex::new(Vec::new()),
        }
    }

    /// URLs passed to `upload`, in order
    pub fn uploads(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaUploader for FakeUploader {
    async fn upload(&self, remote_url: &str) -> Option<String> {
        self.uploads.lock().unwrap().push(remote_url.to_string());
        if self.fail {
            return None;
        }

        let path = remote_url.split('?').next().unwrap_or(remote_url);
        let name = path.rsplit('/').next().unwrap_or("image");
        Some(format!("uploaded-{}", name))
    }
}
