//! Setup-level errors
//!
//! Per-item failures never surface here; they are counted in
//! [`InstallSummary`](crate::models::InstallSummary).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("No target bucket selected")]
    NoTarget,

    #[error("Backend unreachable: {0}")]
    Unreachable(String),
}
