//! Install results
//!
//! Per-item outcomes are accumulated into batch counts. Nothing here is
//! raised as a batch-level error; rendering is left to the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of installing one type or record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "kebab-case")]
pub enum InstallOutcome {
    /// Item created by this batch
    Created,
    /// Item already existed; counted, not an error
    SkippedDuplicate,
    /// Item could not be created
    Failed(String),
}

/// Hard failure for one item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemError {
    /// Title of the definition that failed
    pub title: String,

    /// Error text reported by the backend or the installer
    pub message: String,

    /// When the error occurred
    pub occurred_at: DateTime<Utc>,
}

impl ItemError {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            occurred_at: Utc::now(),
        }
    }
}

/// Batch install summary
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstallSummary {
    pub types_created: usize,
    pub types_skipped: usize,
    pub type_errors: Vec<ItemError>,
    pub records_created: usize,
    pub records_skipped: usize,
    pub record_errors: Vec<ItemError>,
}

impl InstallSummary {
    /// Accumulate the outcome of one type definition
    pub fn add_type_outcome(&mut self, title: &str, outcome: InstallOutcome) {
        match outcome {
            InstallOutcome::Created => self.types_created += 1,
            InstallOutcome::SkippedDuplicate => self.types_skipped += 1,
            InstallOutcome::Failed(reason) => self.type_errors.push(ItemError::new(title, reason)),
        }
    }

    /// Accumulate the outcome of one record definition
    pub fn add_record_outcome(&mut self, title: &str, outcome: InstallOutcome) {
        match outcome {
            InstallOutcome::Created => self.records_created += 1,
            InstallOutcome::SkippedDuplicate => self.records_skipped += 1,
            InstallOutcome::Failed(reason) => {
                self.record_errors.push(ItemError::new(title, reason))
            }
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.type_errors.is_empty() || !self.record_errors.is_empty()
    }

    /// One-line summary, e.g. "Types: 2 created, 1 skipped, 0 failed; Records: ..."
    pub fn display_string(&self) -> String {
        format!(
            "Types: {} created, {} skipped, {} failed; Records: {} created, {} skipped, {} failed",
            self.types_created,
            self.types_skipped,
            self.type_errors.len(),
            self.records_created,
            self.records_skipped,
            self.record_errors.len()
        )
    }
}
