//! Tool process client errors

use thiserror::Error;

/// Errors that can occur while talking to the tool process
#[derive(Error, Debug)]
pub enum RpcError {
    #[error("Failed to spawn tool process '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Writing to the child failed because its stdin is gone
    #[error("Tool process pipe broken: {0}")]
    ProcessBroken(String),

    #[error("Tool process produced no output")]
    NoOutput,

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Client not initialized")]
    NotInitialized,

    #[error("Tool process not running")]
    NotRunning,
}

pub type RpcResult<T> = Result<T, RpcError>;
