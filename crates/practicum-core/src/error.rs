//! Completion and session error types.
//!
//! `CompletionError` is defined here rather than in `practicum-providers` so
//! the retry layer can downcast and classify failures without string matching.

use thiserror::Error;

/// Errors that can occur when talking to a completion service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompletionError {
    /// The request never reached the service, or the connection dropped.
    #[error("network error: {0}")]
    Network(String),

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// Authentication failed (missing or invalid API key).
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The API returned a 429 rate limit response.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// The service failed on its side (HTTP 5xx).
    #[error("server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    /// The request was rejected or the response had an unusable shape.
    #[error("invalid completion payload: {0}")]
    Validation(String),
}

impl CompletionError {
    /// Returns `true` for transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CompletionError::Network(_)
                | CompletionError::Timeout(_)
                | CompletionError::RateLimited { .. }
                | CompletionError::Server { .. }
        )
    }

    /// Returns the retry-after delay in milliseconds, if applicable.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            CompletionError::RateLimited { retry_after_ms } => Some(*retry_after_ms),
            _ => None,
        }
    }

    /// Short, stable label for logs and diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            CompletionError::Network(_) => "network",
            CompletionError::Timeout(_) => "timeout",
            CompletionError::Auth(_) => "auth",
            CompletionError::RateLimited { .. } => "rate_limit",
            CompletionError::Server { .. } => "server",
            CompletionError::Validation(_) => "validation",
        }
    }

    /// Classify an arbitrary error returned by a provider.
    ///
    /// Anything that is not a `CompletionError` is treated as a network
    /// failure so it stays on the retry path.
    pub fn classify(err: &anyhow::Error) -> CompletionError {
        match err.downcast_ref::<CompletionError>() {
            Some(e) => e.clone(),
            None => CompletionError::Network(format!("{err:#}")),
        }
    }
}

/// Misuse of an interview session by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The session already finished or was disposed.
    #[error("session is no longer active")]
    NotActive,

    /// Finish was requested before the initial pass reached the last question.
    #[error("finish is only available after every question has been visited")]
    FinishUnavailable,

    /// Review was requested with no skipped questions or before the initial pass.
    #[error("no skipped questions to review")]
    ReviewUnavailable,

    /// Navigation target does not exist.
    #[error("question index {index} out of range (session has {len} questions)")]
    IndexOutOfRange { index: usize, len: usize },
}
