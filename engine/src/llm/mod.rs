//! LLM Provider Abstraction Layer
//!
//! The conductor treats the language model as an oracle: an ordered list of
//! system/user messages goes in, free-form text comes out. The `LLMProvider`
//! trait is that contract. Concrete providers (Ollama, OpenAI, Azure OpenAI)
//! live in submodules and are selected from configuration by `build_provider`.
//!
//! Model output is not guaranteed to be bare JSON, so callers run it through
//! `extract_json` before parsing.

use async_trait::async_trait;
use regex::Regex;
use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use crate::config::LLMConfig;

pub mod azure;
pub mod ollama;
pub mod openai;

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Errors that can occur during LLM operations
#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout")]
    Timeout,

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl LLMError {
    /// Map a transport-level reqwest error onto the provider error taxonomy.
    pub(crate) fn from_transport(provider: &str, base_url: &str, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LLMError::Timeout
        } else if e.is_connect() {
            LLMError::ProviderUnavailable(format!(
                "Cannot connect to {} at {}",
                provider, base_url
            ))
        } else {
            LLMError::NetworkError(e.to_string())
        }
    }

    /// Map a non-success HTTP status onto the provider error taxonomy.
    pub(crate) fn from_status(status: reqwest::StatusCode, body: String) -> Self {
        match status.as_u16() {
            401 | 403 => LLMError::AuthenticationFailed(body),
            429 => LLMError::RateLimitExceeded,
            400..=499 => LLMError::InvalidRequest(format!("({}) {}", status, body)),
            _ => LLMError::ProviderUnavailable(format!("API error ({}): {}", status, body)),
        }
    }
}

/// Message sent to the oracle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Role of the message sender
    pub role: MessageRole,

    /// Content of the message
    pub content: String,
}

impl Message {
    /// Create a new system (instruction) message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    /// Create a new user (content) message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Instruction message
    System,

    /// Content message
    User,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
        }
    }
}

/// LLM Provider trait that all providers must implement
///
/// Providers are stateless from the conductor's point of view and never retry;
/// any retry or timeout policy belongs to the provider itself.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Returns the name of the provider (e.g., "ollama", "openai", "azure_openai")
    fn name(&self) -> &str;

    /// Returns true if this is a local provider (e.g., Ollama), false for cloud providers
    fn is_local(&self) -> bool;

    /// Generate a free-form text response
    ///
    /// # Arguments
    /// * `messages` - One system instruction, optionally followed by one user message
    async fn generate(&self, messages: &[Message]) -> Result<String>;

    /// Check if the provider is currently healthy and available
    /// Default implementation returns true.
    async fn check_health(&self) -> bool {
        true
    }
}

static JSON_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```json\s*([\s\S]*?)\s*```").expect("Invalid json fence pattern")
});

static ANY_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```(?:[A-Za-z0-9_+-]*[ \t]*\n)?\s*([\s\S]*?)\s*```")
        .expect("Invalid fence pattern")
});

/// Recover the JSON payload from a model response.
///
/// Tried in priority order:
/// 1. the interior of a fenced block tagged `json`
/// 2. the interior of any fenced block (an info-string line is skipped)
/// 3. the text unchanged
///
/// Never fails; parse errors are the caller's concern.
pub fn extract_json(content: &str) -> &str {
    if content.contains("```json") {
        if let Some(inner) = JSON_FENCE.captures(content).and_then(|c| c.get(1)) {
            return inner.as_str();
        }
    } else if content.contains("```") {
        if let Some(inner) = ANY_FENCE.captures(content).and_then(|c| c.get(1)) {
            return inner.as_str();
        }
    }

    content
}

/// Build the oracle selected by `llm.provider`.
///
/// Cloud API keys are read from the environment variable named in config and
/// never stored in the config file itself.
pub fn build_provider(
    config: &LLMConfig,
) -> std::result::Result<Arc<dyn LLMProvider>, EngineError> {
    let timeout = Duration::from_secs(config.request_timeout_secs);

    match config.provider.as_str() {
        "ollama" => Ok(Arc::new(
            ollama::OllamaProvider::new(&config.ollama.base_url, &config.ollama.model)
                .with_timeout(timeout),
        )),
        "openai" => {
            let api_key = read_api_key(&config.openai.api_key_env)?;
            Ok(Arc::new(openai::OpenAIProvider::new(
                config.openai.clone(),
                api_key,
                timeout,
            )))
        }
        "azure_openai" => {
            let api_key = read_api_key(&config.azure_openai.api_key_env)?;
            Ok(Arc::new(azure::AzureOpenAIProvider::new(
                config.azure_openai.clone(),
                api_key,
                timeout,
            )))
        }
        other => Err(EngineError::UnsupportedProvider(other.to_string())),
    }
}

fn read_api_key(var: &str) -> std::result::Result<String, EngineError> {
    match std::env::var(var) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(EngineError::MissingCredentials(var.to_string())),
    }
}

/// Build a reqwest client with the given request timeout.
pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}
