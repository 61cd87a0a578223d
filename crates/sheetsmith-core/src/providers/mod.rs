//! Language model providers
//!
//! The orchestrator only needs "prompt in, text out", expressed by the
//! [`LanguageModel`] trait. `GenaiModel` reaches real APIs through the `genai`
//! crate; `MockModel` replays scripted replies for tests.

mod error;
mod genai_model;
mod mock;
mod traits;

pub use error::{ModelError, ModelResult};
pub use genai_model::{create_client, GenaiModel};
pub use mock::{MockMode, MockModel, MockReply};
pub use traits::{LanguageModel, ModelConfig};

use crate::logging::Logger;
use std::sync::Arc;

/// Create a model for the given config
///
/// The model name `mock` yields a `MockModel` that answers every prompt with
/// an empty JSON object; anything else goes through genai.
pub fn create_model(config: ModelConfig, logger: Arc<dyn Logger>) -> Arc<dyn LanguageModel> {
    match config.model.to_lowercase().as_str() {
        "mock" => Arc::new(MockModel::repeating(MockReply::text("{}"))),
        _ => Arc::new(GenaiModel::new(config, logger)),
    }
}
