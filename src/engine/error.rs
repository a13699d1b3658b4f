//! Error taxonomy for the execution gateway.
//!
//! Every provider- or store-specific failure is normalized to one
//! [`ErrorCode`] before it crosses the port boundary. The stream `error`
//! event and the `Error` outcome are two views of the same normalized
//! failure and always carry the same code.

use serde::{Deserialize, Serialize};

/// Stable, provider-independent error codes.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidRequest,
    NotFound,
    Timeout,
    Aborted,
    RateLimit,
    Internal,
    InsufficientCredits,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidRequest => "invalid_request",
            ErrorCode::NotFound => "not_found",
            ErrorCode::Timeout => "timeout",
            ErrorCode::Aborted => "aborted",
            ErrorCode::RateLimit => "rate_limit",
            ErrorCode::Internal => "internal",
            ErrorCode::InsufficientCredits => "insufficient_credits",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engine-level errors for operations that reject before execution starts.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("aborted: {0}")]
    Aborted(String),

    #[error("rate limited: {0}")]
    RateLimit(String),

    #[error("insufficient credits: {0}")]
    InsufficientCredits(String),

    /// Another resume holds the state lock, or the handle is not active.
    /// Surfaces as `aborted` at the port boundary; the taxonomy carries no
    /// dedicated conflict code.
    #[error("resume conflict: {0}")]
    Conflict(String),

    #[error("internal: {0}")]
    Internal(String),
}

impl EngineError {
    /// Normalized code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            EngineError::InvalidRequest(_) => ErrorCode::InvalidRequest,
            EngineError::NotFound(_) => ErrorCode::NotFound,
            EngineError::Timeout(_) => ErrorCode::Timeout,
            EngineError::Aborted(_) | EngineError::Conflict(_) => ErrorCode::Aborted,
            EngineError::RateLimit(_) => ErrorCode::RateLimit,
            EngineError::InsufficientCredits(_) => ErrorCode::InsufficientCredits,
            EngineError::Internal(_) => ErrorCode::Internal,
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
