//! Core trait definitions for completion providers and result sinks.
//!
//! The async trait is implemented by the `practicum-providers` crate; the core
//! only ever sees `Arc<dyn CompletionProvider>`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::record::SessionRecord;

// ---------------------------------------------------------------------------
// Completion provider trait
// ---------------------------------------------------------------------------

/// Trait for language-model backends that answer a prompt with text.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Human-readable provider name (e.g. "openai").
    fn name(&self) -> &str;

    /// Run one completion.
    ///
    /// Failures should be `CompletionError` values wrapped in `anyhow` so the
    /// retry layer can classify them.
    async fn complete(&self, request: &CompletionRequest) -> anyhow::Result<CompletionResponse>;

    /// List models this provider is known to serve.
    fn available_models(&self) -> Vec<ModelInfo>;
}

/// Request for a single completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Model identifier (e.g. "gpt-4.1-mini").
    pub model: String,
    /// The user prompt.
    pub prompt: String,
    /// Optional system prompt.
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
}

/// Response from a completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// The raw response text.
    pub content: String,
    /// Model that actually produced the response.
    pub model: String,
    /// Token usage.
    #[serde(default)]
    pub token_usage: TokenUsage,
    /// Latency in milliseconds.
    pub latency_ms: u64,
}

/// Token accounting reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Information about an available model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model identifier.
    pub id: String,
    /// Human-readable model name.
    pub name: String,
    /// Provider name.
    pub provider: String,
    /// Maximum context window size in tokens.
    pub max_context: u32,
}

/// Model, temperature and token limit used for a family of requests.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionSettings {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4.1-mini".to_string(),
            temperature: 0.7,
            max_tokens: 4096,
        }
    }
}

impl CompletionSettings {
    /// Build a request from these settings.
    pub fn request(&self, system_prompt: &str, prompt: String) -> CompletionRequest {
        CompletionRequest {
            model: self.model.clone(),
            prompt,
            system_prompt: Some(system_prompt.to_string()),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

// ---------------------------------------------------------------------------
// Result sink trait
// ---------------------------------------------------------------------------

/// Durable storage for finished sessions.
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Sink name for logs (e.g. "json-file").
    fn name(&self) -> &str;

    /// Store one record. Errors are reported, never retried.
    async fn persist(&self, record: &SessionRecord) -> anyhow::Result<()>;
}

// ---------------------------------------------------------------------------
// JSON payload extraction
// ---------------------------------------------------------------------------

/// Pull the JSON payload out of a model response.
///
/// Handles:
/// - ```json``` or generic fenced blocks (first one wins)
/// - Prose around a bare payload (sliced from the first `[`/`{` to the
///   matching last `]`/`}`)
/// - A raw payload (returned trimmed)
pub fn extract_json_payload(response: &str) -> &str {
    if let Some(block) = fenced_block(response) {
        return block.trim();
    }

    let trimmed = response.trim();
    let start = trimmed.find(['[', '{']);
    let Some(start) = start else {
        return trimmed;
    };
    let closer = if trimmed[start..].starts_with('[') {
        ']'
    } else {
        '}'
    };
    match trimmed.rfind(closer) {
        Some(end) if end > start => &trimmed[start..=end],
        _ => &trimmed[start..],
    }
}

fn fenced_block(response: &str) -> Option<&str> {
    let open = response.find("```")?;
    let after_ticks = &response[open + 3..];
    // Skip the info string ("json", "JSON", nothing).
    let body_start = after_ticks.find('\n')? + 1;
    let body = &after_ticks[body_start..];
    // Truncated responses may never close the fence.
    Some(match body.find("```") {
        Some(close) => &body[..close],
        None => body,
    })
}
