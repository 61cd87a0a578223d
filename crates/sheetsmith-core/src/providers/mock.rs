//! Mock language model for testing
//!
//! Replays a script of replies without any network access and records every
//! prompt it receives, so tests can check what the orchestrator asked.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::error::{ModelError, ModelResult};
use super::traits::LanguageModel;

/// One scripted reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockReply {
    /// Return this text
    Text(String),
    /// Fail the call with this message
    Error(String),
}

impl MockReply {
    pub fn text(text: impl Into<String>) -> Self {
        MockReply::Text(text.into())
    }

    pub fn error(message: impl Into<String>) -> Self {
        MockReply::Error(message.into())
    }
}

/// What to do once the script runs out
#[derive(Debug, Clone, Default)]
pub enum MockMode {
    /// Fail every further call
    #[default]
    Strict,
    /// Keep returning the given reply
    Repeat(MockReply),
}

/// Scripted language model
pub struct MockModel {
    script: Mutex<VecDeque<MockReply>>,
    mode: MockMode,
    prompts: Mutex<Vec<String>>,
}

impl MockModel {
    /// Replay `replies` in order, then fail
    pub fn new(replies: impl IntoIterator<Item = MockReply>) -> Self {
        Self {
            script: Mutex::new(replies.into_iter().collect()),
            mode: MockMode::Strict,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Replay text replies in order, then fail
    pub fn texts<S: Into<String>>(replies: impl IntoIterator<Item = S>) -> Self {
        Self::new(replies.into_iter().map(|s| MockReply::Text(s.into())))
    }

    /// Answer every call with the same reply
    pub fn repeating(reply: MockReply) -> Self {
        Self::new(Vec::new()).with_mode(MockMode::Repeat(reply))
    }

    pub fn with_mode(mut self, mode: MockMode) -> Self {
        self.mode = mode;
        self
    }

    /// Prompts received so far, oldest first
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().len()
    }

    fn next_reply(&self) -> Option<MockReply> {
        if let Some(reply) = self.script.lock().pop_front() {
            return Some(reply);
        }
        match &self.mode {
            MockMode::Strict => None,
            MockMode::Repeat(reply) => Some(reply.clone()),
        }
    }
}

#[async_trait]
impl LanguageModel for MockModel {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, prompt: &str) -> ModelResult<String> {
        self.prompts.lock().push(prompt.to_string());

        match self.next_reply() {
            Some(MockReply::Text(text)) => Ok(text),
            Some(MockReply::Error(message)) => Err(ModelError::request("mock", message)),
            None => Err(ModelError::Other("Mock script exhausted".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_script_then_strict() {
        let model = MockModel::new(vec![MockReply::text("one"), MockReply::error("down")]);

        assert_eq!(model.complete("a").await.unwrap(), "one");
        assert!(matches!(
            model.complete("b").await,
            Err(ModelError::Request { .. })
        ));
        assert!(matches!(model.complete("c").await, Err(ModelError::Other(_))));
        assert_eq!(model.prompts(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_repeating() {
        let model = MockModel::repeating(MockReply::text("again"));

        for _ in 0..3 {
            assert_eq!(model.complete("p").await.unwrap(), "again");
        }
        assert_eq!(model.call_count(), 3);
    }
}
