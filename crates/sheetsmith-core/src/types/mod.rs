//! Types shared between the orchestrator, the normalizer and the tool backends

mod tool;
mod outcome;

pub use tool::{ToolCallProposal, ToolCallOutcome};
pub use outcome::{ExecutionOutcome, ExecutionStatus};
