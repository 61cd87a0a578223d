//! Workspace of workbook files
//!
//! A flat directory of `.xlsx` files plus two bookkeeping files:
//! - `.workspace_state.json`: canonical name -> path, and the active workbook
//! - `.execution_log.jsonl`: one JSON line per dispatched tool call
//!
//! ```rust,ignore
//! use sheetsmith_core::workspace::WorkspaceRegistry;
//!
//! let registry = WorkspaceRegistry::open("/excel_files", logger)?;
//! registry.register("Budget")?;
//! let path = registry.resolve(None)?; // /excel_files/Budget.xlsx
//! ```

mod error;
mod exec_log;
mod names;
mod registry;
mod state;

pub use error::{Severity, WorkspaceError, WorkspaceResult};
pub use exec_log::ExecutionLogEntry;
pub use names::{
    bare_file_name, canonicalize, has_workbook_extension, similarity, suggest,
    DEFAULT_SUGGESTION_CUTOFF, WORKBOOK_EXTENSION,
};
pub use registry::{WorkspaceLock, WorkspaceRegistry, LOG_FILE_NAME, STATE_FILE_NAME};
pub use state::{ReconcileReport, WorkspaceState};
