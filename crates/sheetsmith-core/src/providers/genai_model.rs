//! GenaiModel - language model backed by the genai crate
//!
//! Sends the prompt as a single user message, accumulates the streamed reply,
//! and retries failed requests with exponential backoff (1s, 2s, ...).
//!
//! With `api_base` set, the model is reached through genai's OpenAI adapter at
//! that endpoint, which covers hosted routers such as Hugging Face's.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use genai::chat::{ChatMessage, ChatOptions, ChatRequest, ChatStreamEvent};
use genai::resolver::{AuthData, AuthResolver, Endpoint, ServiceTargetResolver};
use genai::{adapter::AdapterKind, Client, ModelIden, ServiceTarget};

use crate::logging::Logger;

use super::error::{ModelError, ModelResult};
use super::traits::{LanguageModel, ModelConfig};

type AuthFuture = Pin<Box<dyn Future<Output = genai::resolver::Result<Option<AuthData>>> + Send>>;

/// Build a genai client whose auth and endpoint come from `config`
pub fn create_client(config: &ModelConfig) -> Client {
    let api_key = config.resolve_api_key();

    let auth_resolver = AuthResolver::from_resolver_async_fn(
        move |_model_iden: ModelIden| -> AuthFuture {
            let api_key = api_key.clone();
            // None lets genai fall back to its own environment lookup.
            Box::pin(async move { Ok(api_key.map(AuthData::from_single)) })
        },
    );

    let api_base = config.api_base.clone();
    let target_resolver = ServiceTargetResolver::from_resolver_fn(
        move |target: ServiceTarget| -> Result<ServiceTarget, genai::resolver::Error> {
            let Some(base) = api_base.as_ref() else {
                return Ok(target);
            };

            let ServiceTarget { auth, model, .. } = target;
            Ok(ServiceTarget {
                endpoint: Endpoint::from_owned(base.clone()),
                auth,
                model: ModelIden::new(AdapterKind::OpenAI, model.model_name.clone()),
            })
        },
    );

    Client::builder()
        .with_auth_resolver(auth_resolver)
        .with_service_target_resolver(target_resolver)
        .build()
}

/// Language model reached through genai
pub struct GenaiModel {
    config: ModelConfig,
    client: Client,
    logger: Arc<dyn Logger>,
}

impl GenaiModel {
    pub fn new(config: ModelConfig, logger: Arc<dyn Logger>) -> Self {
        let client = create_client(&config);
        Self {
            config,
            client,
            logger,
        }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Delay before retrying after the given zero-based attempt
    pub fn backoff(attempt: u32) -> Duration {
        Duration::from_secs(1u64 << attempt.min(6))
    }

    async fn complete_once(&self, prompt: &str) -> ModelResult<String> {
        let request = ChatRequest::new(vec![ChatMessage::user(prompt)]);
        let options = ChatOptions::default()
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens);

        let response = self
            .client
            .exec_chat_stream(self.config.model.as_str(), request, Some(&options))
            .await
            .map_err(|e| ModelError::request(&self.config.model, e.to_string()))?;

        let mut stream = response.stream;
        let mut text = String::new();

        while let Some(event) = stream.next().await {
            match event.map_err(|e| ModelError::request(&self.config.model, e.to_string()))? {
                ChatStreamEvent::Chunk(chunk) => text.push_str(&chunk.content),
                ChatStreamEvent::End(_) => break,
                _ => {}
            }
        }

        if text.trim().is_empty() {
            return Err(ModelError::EmptyResponse(self.config.model.clone()));
        }

        self.logger.debug(&format!(
            "[GenaiModel] Received {} chars from {}",
            text.len(),
            self.config.model
        ));
        Ok(text)
    }
}

#[async_trait]
impl LanguageModel for GenaiModel {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn initialize(&self) -> ModelResult<()> {
        if self.config.model.trim().is_empty() {
            return Err(ModelError::Other("No model configured".to_string()));
        }
        self.logger.info(&format!(
            "[GenaiModel] Using model {} ({})",
            self.config.model,
            self.config.api_base.as_deref().unwrap_or("native endpoint")
        ));
        Ok(())
    }

    async fn complete(&self, prompt: &str) -> ModelResult<String> {
        let attempts = self.config.max_retries.max(1);
        let mut last_error = String::new();

        for attempt in 0..attempts {
            match self.complete_once(prompt).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    self.logger.warn(&format!(
                        "[GenaiModel] Attempt {}/{} failed: {}",
                        attempt + 1,
                        attempts,
                        e
                    ));
                    last_error = e.to_string();
                    if attempt + 1 < attempts {
                        tokio::time::sleep(Self::backoff(attempt)).await;
                    }
                }
            }
        }

        Err(ModelError::Exhausted {
            attempts,
            last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;

    #[test]
    fn test_backoff_doubles() {
        assert_eq!(GenaiModel::backoff(0), Duration::from_secs(1));
        assert_eq!(GenaiModel::backoff(1), Duration::from_secs(2));
        assert_eq!(GenaiModel::backoff(2), Duration::from_secs(4));
    }

    #[test]
    fn test_name_is_model() {
        let model = GenaiModel::new(ModelConfig::new("gpt-4o-mini"), Arc::new(NoOpLogger));
        assert_eq!(model.name(), "gpt-4o-mini");
        assert_eq!(model.config().max_tokens, 512);
    }

    #[tokio::test]
    async fn test_initialize_rejects_blank_model() {
        let model = GenaiModel::new(ModelConfig::new("  "), Arc::new(NoOpLogger));
        assert!(model.initialize().await.is_err());
    }
}
