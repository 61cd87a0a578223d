//! Language model error types

use thiserror::Error;

/// Errors that can occur while asking a model for a completion
#[derive(Error, Debug)]
pub enum ModelError {
    /// The request to the model API failed
    #[error("{model} request failed: {message}")]
    Request { model: String, message: String },

    /// The model answered with no text
    #[error("{0} returned an empty response")]
    EmptyResponse(String),

    /// Every attempt failed
    #[error("Model failed after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: String },

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ModelError {
    pub fn request(model: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Request {
            model: model.into(),
            message: message.into(),
        }
    }
}

pub type ModelResult<T> = Result<T, ModelError>;
