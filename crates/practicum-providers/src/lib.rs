//! practicum-providers: completion backends and configuration.
//!
//! Implements `CompletionProvider` for OpenAI-compatible and Anthropic
//! endpoints, plus a scripted mock, and loads `PracticumConfig` from TOML.

pub mod anthropic;
pub mod config;
pub mod http;
pub mod mock;
pub mod openai;

pub use config::{create_provider, load_config, load_config_from, PracticumConfig, ProviderConfig};
pub use mock::MockProvider;
