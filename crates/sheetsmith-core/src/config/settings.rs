//! Agent settings
//!
//! Every field has a default, so a settings file only needs the values it
//! changes:
//!
//! ```yaml
//! workspace_root: /data/workbooks
//! max_attempts: 5
//! model:
//!   name: gpt-4o-mini
//!   api_base: null
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::providers::ModelConfig;
use crate::rpc::ToolProcessConfig;
use crate::workspace::DEFAULT_SUGGESTION_CUTOFF;

use super::error::{ConfigError, ConfigResult};

/// Environment variable overriding `workspace_root`
pub const ENV_WORKSPACE: &str = "SHEETSMITH_WORKSPACE";
/// Environment variable overriding `model.name`
pub const ENV_MODEL: &str = "SHEETSMITH_MODEL";
/// Environment variable overriding `max_attempts`
pub const ENV_MAX_ATTEMPTS: &str = "SHEETSMITH_MAX_ATTEMPTS";

/// How to launch the tool process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolProcessSettings {
    pub command: String,
    pub args: Vec<String>,
    /// Variable carrying the workspace root to the process
    pub workspace_env_var: String,
}

impl Default for ToolProcessSettings {
    fn default() -> Self {
        let defaults = ToolProcessConfig::default();
        Self {
            command: defaults.program,
            args: defaults.args,
            workspace_env_var: defaults.workspace_env_var,
        }
    }
}

/// Language model settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub name: String,
    pub api_key: Option<String>,
    pub api_key_env: Option<String>,
    pub api_base: Option<String>,
    pub temperature: f64,
    pub max_tokens: u32,
    pub max_retries: u32,
}

impl Default for ModelSettings {
    fn default() -> Self {
        let defaults = ModelConfig::default();
        Self {
            name: defaults.model,
            api_key: defaults.api_key,
            api_key_env: defaults.api_key_env,
            api_base: defaults.api_base,
            temperature: defaults.temperature,
            max_tokens: defaults.max_tokens,
            max_retries: defaults.max_retries,
        }
    }
}

/// Top-level settings for the orchestrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Directory holding the workbooks
    pub workspace_root: PathBuf,
    /// Model round trips per user request
    pub max_attempts: u32,
    /// Minimum similarity for "did you mean" hints
    pub suggestion_cutoff: f64,
    pub tool_process: ToolProcessSettings,
    pub model: ModelSettings,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            workspace_root: PathBuf::from("/excel_files"),
            max_attempts: 3,
            suggestion_cutoff: DEFAULT_SUGGESTION_CUTOFF,
            tool_process: ToolProcessSettings::default(),
            model: ModelSettings::default(),
        }
    }
}

impl AgentSettings {
    /// Apply `SHEETSMITH_*` overrides from the process environment
    pub fn apply_env_overrides(&mut self) -> ConfigResult<()> {
        self.apply_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(root) = lookup(ENV_WORKSPACE).filter(|v| !v.is_empty()) {
            self.workspace_root = PathBuf::from(root);
        }
        if let Some(model) = lookup(ENV_MODEL).filter(|v| !v.is_empty()) {
            self.model.name = model;
        }
        if let Some(attempts) = lookup(ENV_MAX_ATTEMPTS).filter(|v| !v.is_empty()) {
            self.max_attempts = attempts.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!(
                    "{} must be a positive integer, got '{}'",
                    ENV_MAX_ATTEMPTS, attempts
                ))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid("max_attempts must be at least 1".to_string()));
        }
        if self.tool_process.command.trim().is_empty() {
            return Err(ConfigError::Invalid("tool_process.command must not be empty".to_string()));
        }
        if !(0.0..=1.0).contains(&self.suggestion_cutoff) {
            return Err(ConfigError::Invalid(format!(
                "suggestion_cutoff must be between 0 and 1, got {}",
                self.suggestion_cutoff
            )));
        }
        Ok(())
    }

    /// Launch settings for the tool process, pointed at this workspace
    pub fn tool_process_config(&self) -> ToolProcessConfig {
        ToolProcessConfig::new(&self.tool_process.command, self.tool_process.args.iter().cloned())
            .with_workspace_env_var(&self.tool_process.workspace_env_var)
            .with_workspace_root(&self.workspace_root)
    }

    pub fn model_config(&self) -> ModelConfig {
        ModelConfig {
            model: self.model.name.clone(),
            api_key: self.model.api_key.clone(),
            api_key_env: self.model.api_key_env.clone(),
            api_base: self.model.api_base.clone(),
            temperature: self.model.temperature,
            max_tokens: self.model.max_tokens,
            max_retries: self.model.max_retries,
        }
    }
}
