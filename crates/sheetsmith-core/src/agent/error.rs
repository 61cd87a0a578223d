//! Orchestrator setup errors
//!
//! Only construction and startup can fail with an error; a user request always
//! ends in an `ExecutionOutcome`.

use thiserror::Error;

use crate::config::ConfigError;
use crate::providers::ModelError;
use crate::rpc::RpcError;
use crate::workspace::WorkspaceError;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Workspace error: {0}")]
    Workspace(#[from] WorkspaceError),

    #[error("Tool process error: {0}")]
    Backend(#[from] RpcError),

    #[error("Language model error: {0}")]
    Model(#[from] ModelError),
}

pub type AgentResult<T> = Result<T, AgentError>;
