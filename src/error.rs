//! Error types for the correlation engine

use crate::store::StoreError;
use thiserror::Error;

/// Errors that can abort a user's run.
///
/// Insufficient data and degenerate numeric results are not errors; those
/// units of work are skipped and the batch continues.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid window: {0}")]
    InvalidWindow(String),
}
