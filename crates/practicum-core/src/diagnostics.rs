//! Side-channel reporting for masked failures.
//!
//! Generation and evaluation never return errors; callers that care about
//! upstream health observe them here instead.

use crate::error::CompletionError;

/// Which part of the pipeline produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Generation,
    Evaluation,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Generation => write!(f, "generation"),
            Stage::Evaluation => write!(f, "evaluation"),
        }
    }
}

/// Observer for retries, fallbacks and sink failures.
pub trait Diagnostics: Send + Sync {
    fn on_retry(&self, stage: Stage, attempt: u32, error: &CompletionError);
    fn on_fallback(&self, stage: Stage, reason: &str);
    fn on_sink_error(&self, session_id: &str, error: &str);
}

/// Logs every event through `tracing`.
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn on_retry(&self, stage: Stage, attempt: u32, error: &CompletionError) {
        tracing::debug!(%stage, attempt, kind = error.kind(), "retrying completion: {error}");
    }

    fn on_fallback(&self, stage: Stage, reason: &str) {
        tracing::warn!(%stage, "using deterministic fallback: {reason}");
    }

    fn on_sink_error(&self, session_id: &str, error: &str) {
        tracing::warn!(session_id, "failed to persist session record: {error}");
    }
}

/// Discards every event.
pub struct NoopDiagnostics;

impl Diagnostics for NoopDiagnostics {
    fn on_retry(&self, _: Stage, _: u32, _: &CompletionError) {}
    fn on_fallback(&self, _: Stage, _: &str) {}
    fn on_sink_error(&self, _: &str, _: &str) {}
}
