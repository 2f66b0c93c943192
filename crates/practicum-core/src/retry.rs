//! Bounded exponential backoff around a completion provider.

use std::time::Duration;

use crate::diagnostics::{Diagnostics, Stage};
use crate::error::CompletionError;
use crate::traits::{CompletionProvider, CompletionRequest, CompletionResponse};

/// How often and how patiently to retry transient failures.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubles after each one.
    pub initial_delay: Duration,
    /// Upper bound for any single delay, including rate-limit hints.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Fail fast: one attempt, no waiting.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }
}

/// Run `request` against `provider`, retrying transient failures.
///
/// Auth and validation failures return immediately. The last error is
/// returned once the retry budget is spent.
pub async fn complete_with_retry(
    provider: &dyn CompletionProvider,
    request: &CompletionRequest,
    policy: &RetryPolicy,
    stage: Stage,
    diagnostics: &dyn Diagnostics,
) -> Result<CompletionResponse, CompletionError> {
    let mut delay = policy.initial_delay;
    let mut attempt = 0u32;

    loop {
        let err = match provider.complete(request).await {
            Ok(response) => return Ok(response),
            Err(e) => CompletionError::classify(&e),
        };

        if !err.is_retryable() || attempt >= policy.max_retries {
            return Err(err);
        }

        attempt += 1;
        diagnostics.on_retry(stage, attempt, &err);

        // Use the provider's retry-after hint when it gives one
        let wait = err
            .retry_after_ms()
            .map(Duration::from_millis)
            .unwrap_or(delay)
            .min(policy.max_delay);
        tokio::time::sleep(wait).await;
        delay = delay.saturating_mul(2).min(policy.max_delay);
    }
}
