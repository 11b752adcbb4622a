//! Test helper utilities
//!
//! Shared fakes and log capture for cmsc-ai integration tests

#![allow(dead_code)]

pub mod fake_gateway;
pub mod fake_uploader;
pub mod log_capture;

pub use fake_gateway::{Call, FakeGateway, StoredRecord};
pub use fake_uploader::FakeUploader;
pub use log_capture::{capture_logs, LogCapture};
