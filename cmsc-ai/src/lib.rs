//! cmsc-ai library
//!
//! AI response ingestion and content installation for the CMS command line:
//!
//! - [`stream`]: demultiplexes streamed AI output into display text and
//!   metadata
//! - [`installer`]: installs generated type and record definitions, then
//!   backfills cross-record references
//! - [`services`]: backend gateway, media uploader and AI endpoint clients

pub mod config;
pub mod error;
pub mod installer;
pub mod models;
pub mod services;
pub mod stream;

pub use error::InstallError;
pub use installer::{ContentInstaller, InstallSettings};
pub use stream::{IngestConfig, IngestError, IngestOutcome, StreamCallbacks, StreamIngestor};
