//! Language model trait definition

use async_trait::async_trait;

use super::error::ModelResult;

/// Model connection and sampling settings
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    /// Model identifier as used by the provider's API
    pub model: String,
    /// API key for authentication
    pub api_key: Option<String>,
    /// Environment variable to read the API key from when `api_key` is unset
    pub api_key_env: Option<String>,
    /// Custom OpenAI-compatible API base URL
    pub api_base: Option<String>,
    pub temperature: f64,
    pub max_tokens: u32,
    /// Attempts per completion before giving up
    pub max_retries: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: "meta-llama/Llama-3.1-8B-Instruct:novita".to_string(),
            api_key: None,
            api_key_env: Some("HF_TOKEN".to_string()),
            api_base: Some("https://router.huggingface.co/v1/".to_string()),
            temperature: 0.2,
            max_tokens: 512,
            max_retries: 3,
        }
    }
}

impl ModelConfig {
    /// Create a config for `model` with default sampling settings
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    /// Set the API key
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the API base URL
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = Some(base.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = tokens;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Explicit key, else the configured environment variable
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key.clone().or_else(|| {
            self.api_key_env
                .as_deref()
                .and_then(|name| std::env::var(name).ok())
                .filter(|key| !key.is_empty())
        })
    }
}

/// A model that turns a prompt into free text
///
/// The orchestrator sends one user-role prompt per attempt and looks for a
/// JSON tool call in the reply.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Short identifier for log lines
    fn name(&self) -> &str;

    /// Prepare the model for use
    async fn initialize(&self) -> ModelResult<()> {
        Ok(())
    }

    /// Complete a single prompt
    async fn complete(&self, prompt: &str) -> ModelResult<String>;
}
