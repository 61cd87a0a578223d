//! Request orchestration
//!
//! [`ExecutionOrchestrator`] drives the retry loop: it asks the language model
//! for a tool call, repairs and validates the proposal, and hands it to the
//! tool backend. Failed attempts are described back to the model.

mod error;
mod extract;
mod orchestrator;
mod prompt;

pub use error::{AgentError, AgentResult};
pub use extract::extract_json_object;
pub use orchestrator::{ExecutionOrchestrator, DEFAULT_MAX_ATTEMPTS};
pub use prompt::build_prompt;
