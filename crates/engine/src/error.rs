//! Engine construction errors

use thiserror::Error;

/// Invalid construction parameters.
///
/// These indicate configuration bugs and fail loudly at construction,
/// unlike runtime data gaps which degrade to "unavailable".
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("confidence threshold must be within [0, 1], got {0}")]
    InvalidConfidenceThreshold(f64),

    #[error("minimum signal interval must be non-negative, got {0}s")]
    InvalidSignalInterval(i64),

    #[error("history capacity must be positive")]
    InvalidHistoryCapacity,
}
