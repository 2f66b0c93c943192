//! Provider configuration, session settings and the provider factory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use practicum_core::retry::RetryPolicy;
use practicum_core::session::SessionLimits;
use practicum_core::traits::{CompletionProvider, CompletionSettings};

use crate::anthropic::AnthropicProvider;
use crate::openai::OpenAiProvider;

/// Configuration for a single completion backend.
///
/// Note: Custom Debug impl masks API keys to prevent accidental exposure in logs.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    OpenAI {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        org_id: Option<String>,
    },
    Anthropic {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
    },
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::OpenAI {
                api_key: _,
                base_url,
                org_id,
            } => f
                .debug_struct("OpenAI")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .field("org_id", org_id)
                .finish(),
            ProviderConfig::Anthropic {
                api_key: _,
                base_url,
            } => f
                .debug_struct("Anthropic")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .finish(),
        }
    }
}

/// Top-level practicum configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PracticumConfig {
    /// Provider configurations keyed by name.
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    /// Provider used when none is named explicitly.
    #[serde(default = "default_provider")]
    pub default_provider: String,
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Retries after the first attempt, for transient failures only.
    #[serde(default = "default_retries")]
    pub max_retries: u32,
    /// Delay before the first retry in milliseconds; doubles each time.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
    /// Cap for any single retry delay in milliseconds.
    #[serde(default = "default_max_retry_delay")]
    pub max_retry_delay_ms: u64,
    #[serde(default = "default_question_limit")]
    pub question_time_limit_secs: u64,
    #[serde(default = "default_session_limit")]
    pub session_time_limit_secs: u64,
    /// How often the live timers re-check the clock.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    /// Where finished session records are written.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_provider() -> String {
    "openai".to_string()
}
fn default_model() -> String {
    "gpt-4.1-mini".to_string()
}
fn default_temperature() -> f64 {
    0.7
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_retries() -> u32 {
    2
}
fn default_retry_delay() -> u64 {
    500
}
fn default_max_retry_delay() -> u64 {
    8_000
}
fn default_question_limit() -> u64 {
    600
}
fn default_session_limit() -> u64 {
    3600
}
fn default_tick_interval() -> u64 {
    1000
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./practicum-results")
}

impl Default for PracticumConfig {
    fn default() -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider(),
            default_model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            max_retries: default_retries(),
            retry_delay_ms: default_retry_delay(),
            max_retry_delay_ms: default_max_retry_delay(),
            question_time_limit_secs: default_question_limit(),
            session_time_limit_secs: default_session_limit(),
            tick_interval_ms: default_tick_interval(),
            output_dir: default_output_dir(),
        }
    }
}

impl PracticumConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            initial_delay: Duration::from_millis(self.retry_delay_ms),
            max_delay: Duration::from_millis(self.max_retry_delay_ms),
        }
    }

    pub fn completion_settings(&self) -> CompletionSettings {
        CompletionSettings {
            model: self.default_model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    pub fn session_limits(&self) -> SessionLimits {
        SessionLimits {
            question: Duration::from_secs(self.question_time_limit_secs),
            session: Duration::from_secs(self.session_time_limit_secs),
        }
    }

    pub fn tick_interval(&self) -> Duration {
        // a zero period would panic in tokio::time::interval
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    /// Build the default provider, if one is configured.
    pub fn build_default_provider(&self) -> Result<Option<Arc<dyn CompletionProvider>>> {
        self.providers
            .get(&self.default_provider)
            .map(create_provider)
            .transpose()
    }

    /// Apply `PRACTICUM_*_KEY` overrides using `lookup` for variable access.
    fn apply_key_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("PRACTICUM_ANTHROPIC_KEY") {
            let entry = self
                .providers
                .entry("anthropic".into())
                .or_insert(ProviderConfig::Anthropic {
                    api_key: String::new(),
                    base_url: None,
                });
            if let ProviderConfig::Anthropic { api_key, .. } = entry {
                *api_key = key;
            }
        }

        if let Some(key) = lookup("PRACTICUM_OPENAI_KEY") {
            let entry = self
                .providers
                .entry("openai".into())
                .or_insert(ProviderConfig::OpenAI {
                    api_key: String::new(),
                    base_url: None,
                    org_id: None,
                });
            if let ProviderConfig::OpenAI { api_key, .. } = entry {
                *api_key = key;
            }
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

fn resolve_provider_config(config: &ProviderConfig) -> ProviderConfig {
    match config {
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => ProviderConfig::OpenAI {
            api_key: resolve_env_vars(api_key),
            base_url: base_url.as_deref().map(resolve_env_vars),
            org_id: org_id.as_deref().map(resolve_env_vars),
        },
        ProviderConfig::Anthropic { api_key, base_url } => ProviderConfig::Anthropic {
            api_key: resolve_env_vars(api_key),
            base_url: base_url.as_deref().map(resolve_env_vars),
        },
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `practicum.toml` in the current directory
/// 2. `~/.config/practicum/config.toml`
///
/// Environment variable overrides: `PRACTICUM_OPENAI_KEY`, `PRACTICUM_ANTHROPIC_KEY`.
pub fn load_config() -> Result<PracticumConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<PracticumConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => [Some(PathBuf::from("practicum.toml")), global_config_path()]
            .into_iter()
            .flatten()
            .find(|p| p.exists()),
    };

    let mut config = match config_path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config");
            parse_config(
                &std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read config: {}", path.display()))?,
            )
            .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => PracticumConfig::default(),
    };

    config.apply_key_overrides(|name| std::env::var(name).ok());
    config.providers = config
        .providers
        .iter()
        .map(|(k, v)| (k.clone(), resolve_provider_config(v)))
        .collect();

    Ok(config)
}

/// Parse a TOML document without touching the environment.
pub fn parse_config(content: &str) -> Result<PracticumConfig> {
    Ok(toml::from_str(content)?)
}

fn global_config_path() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(|h| {
        PathBuf::from(h)
            .join(".config")
            .join("practicum")
            .join("config.toml")
    })
}

/// Create a provider instance from its configuration.
pub fn create_provider(config: &ProviderConfig) -> Result<Arc<dyn CompletionProvider>> {
    match config {
        ProviderConfig::Anthropic { api_key, base_url } => {
            anyhow::ensure!(!api_key.is_empty(), "anthropic provider has no api_key");
            Ok(Arc::new(AnthropicProvider::new(api_key, base_url.clone())))
        }
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => {
            anyhow::ensure!(!api_key.is_empty(), "openai provider has no api_key");
            Ok(Arc::new(OpenAiProvider::new(
                api_key,
                base_url.clone(),
                org_id.clone(),
            )))
        }
    }
}
