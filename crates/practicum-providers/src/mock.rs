//! Mock provider for testing.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use practicum_core::error::CompletionError;
use practicum_core::traits::{
    CompletionProvider, CompletionRequest, CompletionResponse, ModelInfo, TokenUsage,
};

/// What the mock does on one call.
pub type MockOutcome = Result<String, CompletionError>;

/// A mock completion provider for exercising generation and evaluation
/// without real API calls.
///
/// Scripted outcomes are consumed first, in order. After that the response
/// is chosen by prompt substring, falling back to the default.
pub struct MockProvider {
    /// Map of prompt substring → response text.
    responses: HashMap<String, String>,
    default_response: MockOutcome,
    script: Mutex<VecDeque<MockOutcome>>,
    call_count: AtomicU32,
    last_request: Mutex<Option<CompletionRequest>>,
}

impl MockProvider {
    /// Create a new mock provider with the given prompt→response mappings.
    pub fn new(responses: HashMap<String, String>) -> Self {
        Self {
            responses,
            default_response: Ok("[]".to_string()),
            script: Mutex::new(VecDeque::new()),
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Create a mock that always returns the same response.
    pub fn with_fixed_response(response: &str) -> Self {
        Self {
            default_response: Ok(response.to_string()),
            ..Self::new(HashMap::new())
        }
    }

    /// Create a mock that always fails with `error`.
    pub fn failing(error: CompletionError) -> Self {
        Self {
            default_response: Err(error),
            ..Self::new(HashMap::new())
        }
    }

    /// Play `outcomes` in order, then behave like [`with_fixed_response`](Self::with_fixed_response)
    /// with `then`.
    pub fn scripted(outcomes: Vec<MockOutcome>, then: &str) -> Self {
        Self {
            script: Mutex::new(outcomes.into()),
            ..Self::with_fixed_response(then)
        }
    }

    /// Get the number of calls made to this provider.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Get the last request made to this provider.
    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.last_request
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn next_outcome(&self, prompt: &str) -> MockOutcome {
        let scripted = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        if let Some(outcome) = scripted {
            return outcome;
        }
        self.responses
            .iter()
            .find(|(key, _)| prompt.contains(key.as_str()))
            .map(|(_, v)| Ok(v.clone()))
            .unwrap_or_else(|| self.default_response.clone())
    }
}

#[async_trait]
impl CompletionProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &CompletionRequest) -> anyhow::Result<CompletionResponse> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        *self.last_request.lock().unwrap_or_else(|e| e.into_inner()) = Some(request.clone());

        let content = self.next_outcome(&request.prompt)?;

        // rough estimate: four characters per token
        let prompt_tokens = (request.prompt.len() / 4) as u32;
        let completion_tokens = (content.len() / 4) as u32;

        Ok(CompletionResponse {
            content,
            model: request.model.clone(),
            token_usage: TokenUsage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            },
            latency_ms: 1,
        })
    }

    fn available_models(&self) -> Vec<ModelInfo> {
        vec![ModelInfo {
            id: "mock-model".into(),
            name: "Mock Model".into(),
            provider: "mock".into(),
            max_context: 100_000,
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(prompt: &str) -> CompletionRequest {
        CompletionRequest {
            model: "mock".into(),
            prompt: prompt.into(),
            system_prompt: None,
            max_tokens: 100,
            temperature: 0.0,
        }
    }

    #[tokio::test]
    async fn fixed_response() {
        let provider = MockProvider::with_fixed_response("{\"score\": 70}");
        let response = provider.complete(&request("anything")).await.unwrap();
        assert_eq!(response.content, "{\"score\": 70}");
        assert_eq!(provider.call_count(), 1);
        assert_eq!(provider.last_request().unwrap().prompt, "anything");
    }

    #[tokio::test]
    async fn prompt_matching() {
        let mut responses = HashMap::new();
        responses.insert("questions".to_string(), "[{\"text\": \"Q\"}]".to_string());
        responses.insert("Evaluate".to_string(), "{\"score\": 50}".to_string());

        let provider = MockProvider::new(responses);

        let resp = provider
            .complete(&request("Generate 3 questions"))
            .await
            .unwrap();
        assert!(resp.content.starts_with('['));

        let resp = provider
            .complete(&request("Evaluate the answers"))
            .await
            .unwrap();
        assert!(resp.content.contains("score"));
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn script_then_default() {
        let provider = MockProvider::scripted(
            vec![
                Err(CompletionError::Timeout(30)),
                Ok("first".to_string()),
            ],
            "rest",
        );

        let err = provider.complete(&request("x")).await.unwrap_err();
        assert_eq!(CompletionError::classify(&err), CompletionError::Timeout(30));
        assert_eq!(provider.complete(&request("x")).await.unwrap().content, "first");
        assert_eq!(provider.complete(&request("x")).await.unwrap().content, "rest");
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn failing_always_fails() {
        let provider = MockProvider::failing(CompletionError::Auth("nope".into()));
        for _ in 0..3 {
            assert!(provider.complete(&request("x")).await.is_err());
        }
    }
}
