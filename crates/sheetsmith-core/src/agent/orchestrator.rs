//! Execution orchestrator
//!
//! Turns one natural-language request into at most `max_attempts` model round
//! trips. Each attempt goes through the same pipeline:
//!
//! ```text
//! prompt -> model -> JSON proposal -> normalize -> default sheet -> validate
//!        -> dispatch (Create | BatchCreate | Rename | Generic) -> execution log
//! ```
//!
//! Recoverable failures are fed back into the next prompt. A fatal workspace
//! error ends the request immediately. The workspace lock is held for the
//! whole loop.

use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::config::AgentSettings;
use crate::logging::Logger;
use crate::providers::{create_model, LanguageModel};
use crate::rpc::{ToolBackend, ToolProcessClient};
use crate::tools::{ArgumentNormalizer, DispatchRoute, SchemaRegistry};
use crate::types::{ExecutionOutcome, ToolCallOutcome, ToolCallProposal};
use crate::workspace::{Severity, WorkspaceError, WorkspaceRegistry};
use crate::{log_debug, log_error, log_info, log_warn};

use super::error::AgentResult;
use super::extract::extract_json_object;
use super::prompt::build_prompt;

/// Attempts per request unless configured otherwise
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

const INVALID_JSON: &str = "LLM failed to produce valid JSON";
const SHEET_REQUIRED: &str = "Tool requires sheet_name";

/// Why one attempt did not complete
enum AttemptFailure {
    Recoverable(String),
    Fatal(WorkspaceError),
}

impl From<WorkspaceError> for AttemptFailure {
    fn from(error: WorkspaceError) -> Self {
        match error.severity() {
            Severity::Recoverable => AttemptFailure::Recoverable(error.to_string()),
            Severity::Fatal => AttemptFailure::Fatal(error),
        }
    }
}

/// Runs user requests against the workspace, the model and the tool backend
pub struct ExecutionOrchestrator {
    workspace: Arc<WorkspaceRegistry>,
    backend: Arc<dyn ToolBackend>,
    model: Arc<dyn LanguageModel>,
    normalizer: ArgumentNormalizer,
    schemas: SchemaRegistry,
    max_attempts: u32,
    logger: Arc<dyn Logger>,
}

impl ExecutionOrchestrator {
    pub fn new(
        workspace: Arc<WorkspaceRegistry>,
        backend: Arc<dyn ToolBackend>,
        model: Arc<dyn LanguageModel>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            normalizer: ArgumentNormalizer::new(Arc::clone(&workspace)),
            workspace,
            backend,
            model,
            schemas: SchemaRegistry::new(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            logger,
        }
    }

    /// Wire up the production stack described by `settings`
    pub fn from_settings(settings: &AgentSettings, logger: Arc<dyn Logger>) -> AgentResult<Self> {
        settings.validate()?;

        let workspace = WorkspaceRegistry::open(&settings.workspace_root, Arc::clone(&logger))?
            .with_suggestion_cutoff(settings.suggestion_cutoff);
        let backend = ToolProcessClient::new(settings.tool_process_config(), Arc::clone(&logger));
        let model = create_model(settings.model_config(), Arc::clone(&logger));

        Ok(Self::new(Arc::new(workspace), Arc::new(backend), model, logger)
            .with_max_attempts(settings.max_attempts))
    }

    /// Model round trips per request (at least one)
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn workspace(&self) -> &Arc<WorkspaceRegistry> {
        &self.workspace
    }

    /// Canonical name of the workbook follow-up requests default to
    pub fn active_workbook(&self) -> Option<String> {
        self.workspace.active_file()
    }

    /// Start the tool backend and the model.
    ///
    /// Server tools missing from the backend's tool list are reported as
    /// warnings; requests naming them will fail at dispatch.
    pub async fn initialize(&self) -> AgentResult<()> {
        self.backend.initialize().await?;

        match self.backend.list_tools().await {
            Ok(tools) => {
                log_info!(self.logger, "[Orchestrator] Tool backend ready ({} tools)", tools.len());
                let missing: Vec<&str> = self
                    .schemas
                    .tool_names()
                    .filter(|name| self.schemas.is_server_tool(name))
                    .filter(|name| !tools.iter().any(|tool| tool.name == *name))
                    .collect();
                if !missing.is_empty() {
                    log_warn!(
                        self.logger,
                        "[Orchestrator] Tool backend does not advertise: {}",
                        missing.join(", ")
                    );
                }
            }
            Err(e) => log_warn!(self.logger, "[Orchestrator] Could not list tools: {}", e),
        }

        self.model.initialize().await?;
        log_info!(self.logger, "[Orchestrator] Using model {}", self.model.name());
        Ok(())
    }

    /// Stop the tool backend
    pub async fn shutdown(&self) {
        self.backend.close().await;
    }

    /// Carry out one user request
    pub async fn execute(&self, user_request: &str) -> ExecutionOutcome {
        let _lock = self.workspace.acquire_lock().await;
        let mut last_error: Option<String> = None;

        for attempt in 1..=self.max_attempts {
            log_debug!(
                self.logger,
                "[Orchestrator] Attempt {}/{} for: {}",
                attempt,
                self.max_attempts,
                user_request
            );

            let prompt = build_prompt(&self.schemas, user_request, last_error.as_deref());
            match self.attempt(user_request, &prompt).await {
                Ok(message) => {
                    log_info!(self.logger, "[Orchestrator] Completed: {}", message);
                    return ExecutionOutcome::completed(message);
                }
                Err(AttemptFailure::Recoverable(message)) => {
                    log_warn!(
                        self.logger,
                        "[Orchestrator] Attempt {} failed: {}",
                        attempt,
                        message
                    );
                    last_error = Some(message);
                }
                Err(AttemptFailure::Fatal(error)) => {
                    log_error!(self.logger, "[Orchestrator] Fatal workspace error: {}", error);
                    return ExecutionOutcome::aborted(format!("Fatal workspace error: {}", error));
                }
            }
        }

        ExecutionOutcome::exhausted(format!(
            "Max retries exceeded. Last error: {}",
            last_error.unwrap_or_default()
        ))
    }

    async fn attempt(&self, user_request: &str, prompt: &str) -> Result<String, AttemptFailure> {
        let reply = self.model.complete(prompt).await.map_err(|e| {
            AttemptFailure::Recoverable(format!("Language model call failed: {}", e))
        })?;

        let proposal = extract_json_object(&reply)
            .and_then(ToolCallProposal::from_value)
            .ok_or_else(|| AttemptFailure::Recoverable(INVALID_JSON.to_string()))?;
        let tool_name = proposal.tool_name.as_str();

        let mut arguments = self.normalizer.normalize(&proposal.arguments, tool_name)?;
        self.resolve_default_sheet(tool_name, &mut arguments).await;

        if self.schemas.requires_sheet(tool_name) && !has_sheet(&arguments) {
            return Err(AttemptFailure::Recoverable(SHEET_REQUIRED.to_string()));
        }
        self.schemas
            .validate(tool_name, &arguments)
            .map_err(|e| AttemptFailure::Recoverable(e.to_string()))?;

        let route = DispatchRoute::for_tool(tool_name);
        log_debug!(self.logger, "[Orchestrator] Dispatching {} via {:?}", tool_name, route);
        let dispatched = self.dispatch(route, tool_name, &mut arguments).await;

        let logged = match &dispatched {
            Ok(outcome) if outcome.ok => "success".to_string(),
            Ok(outcome) => outcome.text.clone(),
            Err(e) => e.to_string(),
        };
        let filepath = arguments.get("filepath").and_then(Value::as_str);
        self.workspace
            .log_execution(user_request, tool_name, filepath, &arguments, &logged);

        match dispatched? {
            outcome if outcome.ok => Ok(outcome.text),
            outcome => Err(AttemptFailure::Recoverable(outcome.text)),
        }
    }

    /// Fill in `sheet_name` from the workbook's first sheet when the tool needs one
    async fn resolve_default_sheet(&self, tool_name: &str, arguments: &mut Map<String, Value>) {
        if !self.schemas.requires_field(tool_name, "sheet_name") || has_sheet(arguments) {
            return;
        }
        let Some(filepath) = arguments.get("filepath").and_then(Value::as_str) else {
            return;
        };

        let mut request = Map::new();
        request.insert("filepath".to_string(), json!(filepath));
        let outcome = self.backend.call_tool("get_workbook_metadata", request).await;
        if !outcome.ok {
            log_debug!(self.logger, "[Orchestrator] Metadata lookup failed: {}", outcome.text);
            return;
        }

        if let Some(sheet) = first_sheet(&outcome.text) {
            log_debug!(self.logger, "[Orchestrator] Defaulting sheet_name to {}", sheet);
            arguments.insert("sheet_name".to_string(), Value::String(sheet));
        }
    }

    async fn dispatch(
        &self,
        route: DispatchRoute,
        tool_name: &str,
        arguments: &mut Map<String, Value>,
    ) -> Result<ToolCallOutcome, WorkspaceError> {
        match route {
            DispatchRoute::Create => {
                let requested = text_arg(arguments, "filepath");
                let path = self.workspace.register(&requested)?;
                let path = path.to_string_lossy().into_owned();
                arguments.insert("filepath".to_string(), json!(path));

                let mut request = Map::new();
                request.insert("filepath".to_string(), json!(path));
                Ok(self.backend.call_tool(tool_name, request).await)
            }
            DispatchRoute::BatchCreate => Ok(self.create_worksheets(arguments).await),
            DispatchRoute::Rename => {
                let old = text_arg(arguments, "old_filepath");
                let new = text_arg(arguments, "new_filepath");
                let path = self.workspace.rename(&old, &new)?;
                Ok(ToolCallOutcome::success(format!(
                    "Renamed workbook to {}",
                    path.display()
                )))
            }
            DispatchRoute::Generic => {
                Ok(self.backend.call_tool(tool_name, arguments.clone()).await)
            }
        }
    }

    /// One `create_worksheet` call per name, stopping at the first failure
    async fn create_worksheets(&self, arguments: &Map<String, Value>) -> ToolCallOutcome {
        let filepath = text_arg(arguments, "filepath");
        let names: Vec<String> = arguments
            .get("sheet_names")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        if names.is_empty() {
            return ToolCallOutcome::failure("sheet_names must list at least one worksheet");
        }

        for name in &names {
            let mut request = Map::new();
            request.insert("filepath".to_string(), json!(filepath));
            request.insert("sheet_name".to_string(), json!(name));

            let outcome = self.backend.call_tool("create_worksheet", request).await;
            if !outcome.ok {
                return outcome;
            }
        }

        ToolCallOutcome::success(format!("Created worksheets: {}", names.join(", ")))
    }
}

impl std::fmt::Debug for ExecutionOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionOrchestrator")
            .field("workspace", &self.workspace)
            .field("model", &self.model.name())
            .field("max_attempts", &self.max_attempts)
            .finish()
    }
}

fn has_sheet(arguments: &Map<String, Value>) -> bool {
    match arguments.get("sheet_name") {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(_) => true,
    }
}

fn text_arg(arguments: &Map<String, Value>, key: &str) -> String {
    match arguments.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// First sheet named in a `get_workbook_metadata` reply.
///
/// Replies that are not a JSON object are treated as having no sheets.
fn first_sheet(metadata: &str) -> Option<String> {
    let metadata: Value = serde_json::from_str(metadata).ok()?;
    let first = metadata.as_object()?.get("sheets")?.as_array()?.first()?;

    match first {
        Value::String(name) => Some(name.clone()),
        Value::Object(sheet) => sheet
            .get("name")
            .or_else(|| sheet.get("title"))
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}
