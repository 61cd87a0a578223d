//! Seam between the orchestrator and whatever executes tools

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::types::ToolCallOutcome;

use super::error::RpcResult;
use super::protocol::ToolDescriptor;

/// Something that can run spreadsheet tools.
///
/// `ToolProcessClient` is the production implementation. Tool failures are
/// reported through [`ToolCallOutcome`], never as errors.
#[async_trait]
pub trait ToolBackend: Send + Sync {
    /// Bring the backend up; must succeed before calls are made
    async fn initialize(&self) -> RpcResult<()>;

    /// Tools the backend advertises
    async fn list_tools(&self) -> RpcResult<Vec<ToolDescriptor>>;

    async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> ToolCallOutcome;

    async fn close(&self);
}
