//! Error taxonomy for engine callers.
//!
//! Every failure is detected before any partial write, so callers never see
//! half-applied state. Re-submitting an already-passed lesson is not an error;
//! it returns a successful no-op result instead.

use crate::gate::Feature;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoachError {
    /// Invalid level/lesson/channel combination. Caller's fault; nothing was
    /// mutated.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The feature is not enabled for any of the learner's organizations.
    #[error("access denied: {0} is not enabled for this learner")]
    AccessDenied(Feature),

    /// Daily pass cap reached. The window resets at the next UTC midnight.
    #[error("daily pass limit reached, resets at {resets_at}")]
    RateLimited { resets_at: DateTime<Utc> },

    /// The learner identity is unknown to the platform.
    #[error("unknown learner: {0}")]
    NotFound(String),

    /// A transactional write conflict persisted through the retry budget.
    #[error("write conflict persisted after {attempts} attempts")]
    Conflict { attempts: u32 },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoachError {
    /// Stable numeric code for RPC-style callers
    pub fn code(&self) -> i32 {
        match self {
            CoachError::Validation(_) => -33001,
            CoachError::AccessDenied(_) => -33002,
            CoachError::RateLimited { .. } => -33003,
            CoachError::NotFound(_) => -33004,
            CoachError::Conflict { .. } => -33005,
            CoachError::Storage(_) => -33006,
            CoachError::Json(_) => -32700,
            CoachError::Io(_) => -33007,
        }
    }

    /// Whether the caller may retry the same operation verbatim
    pub fn is_transient(&self) -> bool {
        matches!(self, CoachError::Conflict { .. })
    }
}
