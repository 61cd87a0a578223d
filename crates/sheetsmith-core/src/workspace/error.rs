//! Workspace error types

use std::path::PathBuf;

use thiserror::Error;

/// How the retry loop should react to a workspace error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Feed the message back to the model and try again
    Recoverable,
    /// Abort the whole user request
    Fatal,
}

/// Errors raised by the workspace registry
#[derive(Error, Debug)]
pub enum WorkspaceError {
    /// The rename source has no registry entry
    #[error("File not tracked: {0}")]
    FileNotTracked(String),

    /// No file on disk matches the requested name
    #[error("File '{name}' not found{}", did_you_mean(.suggestion))]
    FileNotFound {
        name: String,
        suggestion: Option<String>,
    },

    /// No file was named and nothing is active
    #[error("No active workbook available")]
    NoActiveWorkbook,

    /// The registry points at a file that is gone from disk
    #[error("Physical file missing: {}", .0.display())]
    PhysicalFileMissing(PathBuf),

    #[error("Workspace IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Workspace state error: {0}")]
    State(#[from] serde_json::Error),
}

fn did_you_mean(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(name) => format!(". Did you mean '{}'?", name),
        None => String::new(),
    }
}

impl WorkspaceError {
    pub fn severity(&self) -> Severity {
        match self {
            WorkspaceError::FileNotTracked(_)
            | WorkspaceError::FileNotFound { .. }
            | WorkspaceError::NoActiveWorkbook => Severity::Recoverable,
            WorkspaceError::PhysicalFileMissing(_)
            | WorkspaceError::Io(_)
            | WorkspaceError::State(_) => Severity::Fatal,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

pub type WorkspaceResult<T> = Result<T, WorkspaceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let with_hint = WorkspaceError::FileNotFound {
            name: "Bugdet.xlsx".to_string(),
            suggestion: Some("Budget.xlsx".to_string()),
        };
        assert_eq!(
            with_hint.to_string(),
            "File 'Bugdet.xlsx' not found. Did you mean 'Budget.xlsx'?"
        );

        let bare = WorkspaceError::FileNotFound {
            name: "Nope.xlsx".to_string(),
            suggestion: None,
        };
        assert_eq!(bare.to_string(), "File 'Nope.xlsx' not found");
    }

    #[test]
    fn test_severity() {
        assert_eq!(WorkspaceError::NoActiveWorkbook.severity(), Severity::Recoverable);
        assert_eq!(
            WorkspaceError::FileNotTracked("a.xlsx".into()).severity(),
            Severity::Recoverable
        );
        assert!(WorkspaceError::PhysicalFileMissing(PathBuf::from("/w/a.xlsx")).is_fatal());
        assert!(WorkspaceError::Io(std::io::Error::other("disk")).is_fatal());
    }
}
