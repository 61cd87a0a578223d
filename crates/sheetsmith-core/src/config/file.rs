//! File-based settings (YAML)
//!
//! Supports user-level (~/.config/sheetsmith/config.yaml) and workspace-level
//! (.config/sheetsmith/config.yaml) files.

use std::fs;
use std::path::{Path, PathBuf};

use super::error::{ConfigError, ConfigResult};
use super::settings::AgentSettings;

/// Config level (user or workspace)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLevel {
    /// User-level config (~/.config/sheetsmith/config.yaml)
    User,
    /// Workspace-level config (.config/sheetsmith/config.yaml in workspace root)
    Workspace,
}

impl ConfigLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigLevel::User => "user",
            ConfigLevel::Workspace => "workspace",
        }
    }
}

/// A YAML settings file
///
/// # Example
///
/// ```no_run
/// use sheetsmith_core::config::SettingsFile;
///
/// let settings = SettingsFile::user().load().unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct SettingsFile {
    path: PathBuf,
    level: ConfigLevel,
}

impl SettingsFile {
    pub fn new(path: impl Into<PathBuf>, level: ConfigLevel) -> Self {
        Self {
            path: path.into(),
            level,
        }
    }

    /// User-level settings (~/.config/sheetsmith/config.yaml)
    pub fn user() -> Self {
        // XDG config directory (~/.config on Linux, ~/Library/Application Support on macOS)
        let config_dir = dirs::config_dir().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config")
        });
        Self::new(config_dir.join("sheetsmith").join("config.yaml"), ConfigLevel::User)
    }

    /// Workspace-level settings (.config/sheetsmith/config.yaml)
    pub fn workspace(workspace_root: impl AsRef<Path>) -> Self {
        let path = workspace_root
            .as_ref()
            .join(".config")
            .join("sheetsmith")
            .join("config.yaml");
        Self::new(path, ConfigLevel::Workspace)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn level(&self) -> ConfigLevel {
        self.level
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read the file; a missing file yields the defaults
    pub fn load(&self) -> ConfigResult<AgentSettings> {
        if !self.path.exists() {
            return Ok(AgentSettings::default());
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(AgentSettings::default());
        }

        serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
            path: self.path.clone(),
            source,
        })
    }

    /// Write the settings, creating parent directories
    pub fn save(&self, settings: &AgentSettings) -> ConfigResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(settings).map_err(|source| ConfigError::Yaml {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

/// Resolve the effective settings.
///
/// The workspace file wins over the user file when it exists; environment
/// overrides are applied last and the result is validated.
pub fn load_settings(workspace_root: Option<&Path>) -> ConfigResult<AgentSettings> {
    let workspace = workspace_root.map(SettingsFile::workspace);
    let file = match workspace {
        Some(file) if file.exists() => file,
        _ => SettingsFile::user(),
    };

    let mut settings = file.load()?;
    settings.apply_env_overrides()?;
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempdir().unwrap();
        let file = SettingsFile::new(dir.path().join("config.yaml"), ConfigLevel::User);

        assert!(!file.exists());
        assert_eq!(file.load().unwrap(), AgentSettings::default());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let file = SettingsFile::workspace(dir.path());
        assert_eq!(file.level(), ConfigLevel::Workspace);
        assert_eq!(file.level().as_str(), "workspace");
        assert!(file.path().ends_with(".config/sheetsmith/config.yaml"));

        let mut settings = AgentSettings::default();
        settings.max_attempts = 4;
        settings.model.name = "gpt-4o-mini".to_string();
        file.save(&settings).unwrap();

        let content = fs::read_to_string(file.path()).unwrap();
        assert!(content.contains("max_attempts: 4"));
        assert!(content.contains("gpt-4o-mini"));

        assert_eq!(file.load().unwrap(), settings);
    }

    #[test]
    fn test_invalid_yaml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "max_attempts: [unclosed").unwrap();

        let err = SettingsFile::new(&path, ConfigLevel::User).load().unwrap_err();
        assert!(matches!(err, ConfigError::Yaml { .. }));
    }
}
