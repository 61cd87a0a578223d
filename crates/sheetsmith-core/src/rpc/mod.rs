//! Client for the spreadsheet tool process
//!
//! The tool server runs as a child process and speaks JSON-RPC 2.0, one
//! message per line, over its stdin/stdout:
//!
//! - `initialize`: handshake with protocol version and client info
//! - `tools/list`: advertised tools
//! - `tools/call`: `{name, arguments}` -> `{content: [{type, text}], isError}`
//!
//! ```rust,ignore
//! let client = ToolProcessClient::new(ToolProcessConfig::default(), logger);
//! client.initialize().await?;
//! let outcome = client.call_tool("create_workbook", args).await;
//! ```

mod backend;
mod client;
mod error;
mod protocol;

pub use backend::ToolBackend;
pub use client::{ToolProcessClient, ToolProcessConfig, PROTOCOL_VERSION};
pub use error::{RpcError, RpcResult};
pub use protocol::{ToolCallResult, ToolContent, ToolDescriptor, DEFAULT_SUCCESS_TEXT};
