//! Persisted workspace state
//!
//! Stored as pretty JSON: `{"files": {name: path}, "active_file": name | null}`.
//! Every save goes through a temporary sibling file followed by a rename, so
//! a crash never leaves a half-written state file behind.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::error::WorkspaceResult;

/// Registry contents: canonical file name -> absolute path, plus the active file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceState {
    #[serde(default)]
    pub files: BTreeMap<String, PathBuf>,
    #[serde(default)]
    pub active_file: Option<String>,
}

/// What a reconciliation pass changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub removed: Vec<String>,
    pub added: Vec<String>,
    pub cleared_active: bool,
}

impl ReconcileReport {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty() && !self.cleared_active
    }
}

impl WorkspaceState {
    /// Load from disk. A missing file yields the empty state.
    pub fn load(path: &Path) -> WorkspaceResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Atomically replace the file at `path` with this state
    pub fn save(&self, path: &Path) -> WorkspaceResult<()> {
        let content = serde_json::to_vec_pretty(self)?;
        atomic_write_file(path, &content)?;
        Ok(())
    }

    /// Make the registry agree with the files found on disk.
    ///
    /// Entries whose file vanished are dropped, unregistered files are added,
    /// and an active pointer left dangling is cleared.
    pub fn reconcile_with(&mut self, on_disk: &BTreeMap<String, PathBuf>) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        self.files.retain(|name, _| {
            let keep = on_disk.contains_key(name);
            if !keep {
                report.removed.push(name.clone());
            }
            keep
        });

        for (name, path) in on_disk {
            if !self.files.contains_key(name) {
                self.files.insert(name.clone(), path.clone());
                report.added.push(name.clone());
            }
        }

        if let Some(active) = &self.active_file {
            if !self.files.contains_key(active) {
                self.active_file = None;
                report.cleared_active = true;
            }
        }

        report
    }

    /// Registered key matching `name`, exact match first, then ignoring case
    pub fn find_key(&self, name: &str) -> Option<String> {
        if self.files.contains_key(name) {
            return Some(name.to_string());
        }
        let wanted = name.to_lowercase();
        self.files.keys().find(|key| key.to_lowercase() == wanted).cloned()
    }

    /// Path of the active file, if any
    pub fn active_path(&self) -> Option<PathBuf> {
        self.active_file
            .as_ref()
            .and_then(|name| self.files.get(name))
            .cloned()
    }
}

fn atomic_write_file(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| std::io::Error::other("state path has no parent"))?;
    let tmp_name = format!(
        "{}.tmp-{}",
        path.file_name().and_then(|v| v.to_str()).unwrap_or("state"),
        std::process::id(),
    );
    let tmp_path = parent.join(tmp_name);

    {
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(content)?;
        file.sync_all()?;
    }

    if let Err(err) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err);
    }
    Ok(())
}
