//! Sheetsmith Core
//!
//! Natural-language spreadsheet editing. A language model proposes one tool
//! call per request; the crate repairs the proposal, validates it against the
//! known tool schemas, resolves workbook names inside a managed workspace and
//! forwards the call to a spreadsheet tool process over stdio JSON-RPC.
//!
//! ## Execution
//!
//! ```rust,ignore
//! use sheetsmith_core::{load_settings, ConsoleLogger, ExecutionOrchestrator};
//!
//! let settings = load_settings(None)?;
//! let logger = Arc::new(ConsoleLogger::new());
//! let orchestrator = ExecutionOrchestrator::from_settings(&settings, logger)?;
//! orchestrator.initialize().await?;
//!
//! let outcome = orchestrator.execute("create a workbook called Budget").await;
//! println!("{}", outcome.message);
//! ```

pub mod types;
pub mod logging;
pub mod config;
pub mod providers;
pub mod rpc;
pub mod tools;
pub mod workspace;
pub mod agent;

// Re-export commonly used types
pub use types::{ExecutionOutcome, ExecutionStatus, ToolCallOutcome, ToolCallProposal};

pub use logging::{Logger, NoOpLogger, ConsoleLogger};

pub use config::{load_settings, AgentSettings, ConfigError, ConfigResult, SettingsFile};

pub use providers::{create_model, GenaiModel, LanguageModel, MockModel, ModelConfig, ModelError};

pub use rpc::{ToolBackend, ToolProcessClient, ToolProcessConfig, RpcError, RpcResult};

pub use tools::{ArgumentNormalizer, DispatchRoute, SchemaError, SchemaRegistry};

pub use workspace::{WorkspaceError, WorkspaceRegistry, WorkspaceResult};

pub use agent::{AgentError, AgentResult, ExecutionOrchestrator, DEFAULT_MAX_ATTEMPTS};
