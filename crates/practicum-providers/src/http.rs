//! HTTP plumbing shared by the backends: client construction and mapping
//! transport and status failures onto `CompletionError`.

use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde::Deserialize;

use practicum_core::error::CompletionError;

pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Used when a 429 carries no usable `retry-after` header.
const DEFAULT_RETRY_AFTER_MS: u64 = 5_000;

pub(crate) fn build_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .expect("failed to build HTTP client")
}

/// Both OpenAI and Anthropic wrap failures as `{"error": {"message": ...}}`.
#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

pub(crate) fn transport_error(err: reqwest::Error, timeout_secs: u64) -> CompletionError {
    if err.is_timeout() {
        CompletionError::Timeout(timeout_secs)
    } else {
        CompletionError::Network(err.to_string())
    }
}

/// Convert a non-success response into the matching error.
pub(crate) async fn status_error(response: reqwest::Response) -> CompletionError {
    let status = response.status().as_u16();
    let retry_after_ms = retry_after_ms(response.headers());
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);
    classify_status(status, retry_after_ms, message)
}

/// Map an HTTP status onto the error taxonomy.
pub fn classify_status(status: u16, retry_after_ms: Option<u64>, message: String) -> CompletionError {
    match status {
        401 | 403 => CompletionError::Auth(message),
        429 => CompletionError::RateLimited {
            retry_after_ms: retry_after_ms.unwrap_or(DEFAULT_RETRY_AFTER_MS),
        },
        500..=599 => CompletionError::Server { status, message },
        _ => CompletionError::Validation(format!("HTTP {status}: {message}")),
    }
}

/// `retry-after` in whole seconds; HTTP-date values are ignored.
fn retry_after_ms(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(|secs| secs.saturating_mul(1000))
}

pub(crate) fn decode_error(err: reqwest::Error) -> CompletionError {
    CompletionError::Validation(format!("failed to parse response: {err}"))
}
