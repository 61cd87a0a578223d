//! Configuration
//!
//! `AgentSettings` is read from YAML (`SettingsFile`), then adjusted by
//! `SHEETSMITH_WORKSPACE`, `SHEETSMITH_MODEL` and `SHEETSMITH_MAX_ATTEMPTS`.

mod error;
mod file;
mod settings;

pub use error::{ConfigError, ConfigResult};
pub use file::{load_settings, ConfigLevel, SettingsFile};
pub use settings::{
    AgentSettings, ModelSettings, ToolProcessSettings, ENV_MAX_ATTEMPTS, ENV_MODEL,
    ENV_WORKSPACE,
};
