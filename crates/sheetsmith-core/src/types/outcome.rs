//! Terminal outcome of one user request

use serde::{Deserialize, Serialize};

/// How the retry loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    /// A tool call succeeded
    Completed,
    /// A fatal workspace error stopped the loop early
    Aborted,
    /// Every attempt failed with a recoverable error
    Exhausted,
}

/// What the caller of the orchestrator gets back: a status and a
/// human-readable message (result text or error text).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub status: ExecutionStatus,
    pub message: String,
}

impl ExecutionOutcome {
    pub fn completed(message: impl Into<String>) -> Self {
        Self {
            status: ExecutionStatus::Completed,
            message: message.into(),
        }
    }

    pub fn aborted(message: impl Into<String>) -> Self {
        Self {
            status: ExecutionStatus::Aborted,
            message: message.into(),
        }
    }

    pub fn exhausted(message: impl Into<String>) -> Self {
        Self {
            status: ExecutionStatus::Exhausted,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Completed
    }
}
