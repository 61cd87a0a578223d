//! Workspace registry
//!
//! Owns the durable mapping of canonical workbook names to paths under a single
//! workspace root, the active-file pointer, and the coarse execution lock.
//!
//! State mutations happen under a short synchronous lock and are persisted
//! before the method returns. The execution lock is separate: the orchestrator
//! holds it for a whole retry loop, the registry never takes it itself.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Map, Value};
use tokio::sync::{Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard};

use crate::logging::Logger;

use super::error::{WorkspaceError, WorkspaceResult};
use super::exec_log::ExecutionLogEntry;
use super::names::{
    bare_file_name, canonicalize, has_workbook_extension, suggest, DEFAULT_SUGGESTION_CUTOFF,
};
use super::state::WorkspaceState;

/// Registry state file, relative to the workspace root
pub const STATE_FILE_NAME: &str = ".workspace_state.json";

/// Execution log, relative to the workspace root
pub const LOG_FILE_NAME: &str = ".execution_log.jsonl";

/// Held for the duration of one user request. Dropping it releases the lock.
pub struct WorkspaceLock<'a> {
    _guard: AsyncMutexGuard<'a, ()>,
}

impl WorkspaceLock<'_> {
    /// Release explicitly; equivalent to dropping the guard
    pub fn release(self) {}
}

/// Registry of workbooks in one workspace directory
pub struct WorkspaceRegistry {
    root: PathBuf,
    state_path: PathBuf,
    log_path: PathBuf,
    suggestion_cutoff: f64,
    state: Mutex<WorkspaceState>,
    execution_lock: AsyncMutex<()>,
    logger: Arc<dyn Logger>,
}

impl WorkspaceRegistry {
    /// Open (creating if needed) the workspace at `root`.
    ///
    /// Loads the persisted state, falling back to an empty registry when the
    /// state file is unreadable JSON, then reconciles with the directory.
    pub fn open(root: impl AsRef<Path>, logger: Arc<dyn Logger>) -> WorkspaceResult<Self> {
        fs::create_dir_all(root.as_ref())?;
        let root = std::path::absolute(root.as_ref())?;
        let state_path = root.join(STATE_FILE_NAME);
        let log_path = root.join(LOG_FILE_NAME);

        let state = match WorkspaceState::load(&state_path) {
            Ok(state) => state,
            Err(WorkspaceError::State(e)) => {
                logger.warn(&format!(
                    "[Workspace] Ignoring unreadable state file {}: {}",
                    state_path.display(),
                    e
                ));
                WorkspaceState::default()
            }
            Err(e) => return Err(e),
        };

        let registry = Self {
            root,
            state_path,
            log_path,
            suggestion_cutoff: DEFAULT_SUGGESTION_CUTOFF,
            state: Mutex::new(state),
            execution_lock: AsyncMutex::new(()),
            logger,
        };
        registry.reconcile()?;

        registry.logger.info(&format!(
            "[Workspace] Opened {} ({} workbooks)",
            registry.root.display(),
            registry.state.lock().files.len()
        ));

        Ok(registry)
    }

    /// Minimum similarity for "did you mean" hints
    pub fn with_suggestion_cutoff(mut self, cutoff: f64) -> Self {
        self.suggestion_cutoff = cutoff;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Canonical registry key for a name
    pub fn canonicalize(&self, name: &str) -> String {
        canonicalize(name)
    }

    /// Sync the registry with the workbooks actually present under the root
    pub fn reconcile(&self) -> WorkspaceResult<()> {
        let on_disk = self.scan_disk()?;
        let mut state = self.state.lock();
        self.reconcile_locked(&mut state, &on_disk);
        self.persist(&state)
    }

    /// Register a brand-new workbook and make it active.
    ///
    /// Does not touch the disk beyond persisting the registry; creating the
    /// file is up to the caller.
    pub fn register(&self, filename: &str) -> WorkspaceResult<PathBuf> {
        let canonical = canonicalize(&bare_file_name(filename));
        let path = self.root.join(&canonical);

        let mut state = self.state.lock();
        state.files.insert(canonical.clone(), path.clone());
        state.active_file = Some(canonical.clone());
        self.persist(&state)?;

        self.logger.debug(&format!("[Workspace] Registered {}", canonical));
        Ok(path)
    }

    /// Resolve a user-supplied name to an existing workbook.
    ///
    /// With no name, returns the active workbook. Otherwise matches the
    /// canonical name case-insensitively against the files on disk and makes
    /// the match active.
    pub fn resolve(&self, filename: Option<&str>) -> WorkspaceResult<PathBuf> {
        let requested = filename
            .map(bare_file_name)
            .filter(|name| !name.trim().is_empty());

        let on_disk = self.scan_disk()?;
        let mut state = self.state.lock();
        self.reconcile_locked(&mut state, &on_disk);

        let Some(requested) = requested else {
            self.persist(&state)?;
            return state.active_path().ok_or(WorkspaceError::NoActiveWorkbook);
        };

        let canonical = canonicalize(&requested);
        let wanted = canonical.to_lowercase();
        let found = on_disk
            .iter()
            .find(|(name, _)| name.to_lowercase() == wanted)
            .map(|(name, path)| (name.clone(), path.clone()));

        match found {
            Some((name, path)) => {
                state.files.insert(name.clone(), path.clone());
                state.active_file = Some(name);
                self.persist(&state)?;
                Ok(path)
            }
            None => {
                self.persist(&state)?;
                let suggestion = suggest(&canonical, state.files.keys(), self.suggestion_cutoff);
                Err(WorkspaceError::FileNotFound {
                    name: requested,
                    suggestion,
                })
            }
        }
    }

    /// Rename a tracked workbook on disk and in the registry.
    ///
    /// Either both the file and the registry entry move, or the registry is
    /// left as it was.
    pub fn rename(&self, old_name: &str, new_name: &str) -> WorkspaceResult<PathBuf> {
        let old_bare = bare_file_name(old_name);
        let old_canonical = canonicalize(&old_bare);
        let new_canonical = canonicalize(&bare_file_name(new_name));

        let mut state = self.state.lock();
        let old_key = state
            .find_key(&old_canonical)
            .ok_or_else(|| WorkspaceError::FileNotTracked(old_bare.clone()))?;
        let old_path = state.files[&old_key].clone();

        if !old_path.exists() {
            return Err(WorkspaceError::PhysicalFileMissing(old_path));
        }

        let new_path = self.root.join(&new_canonical);
        fs::rename(&old_path, &new_path)?;

        state.files.remove(&old_key);
        state.files.insert(new_canonical.clone(), new_path.clone());
        state.active_file = Some(new_canonical.clone());
        self.persist(&state)?;

        self.logger.info(&format!(
            "[Workspace] Renamed {} -> {}",
            old_key, new_canonical
        ));
        Ok(new_path)
    }

    /// Path of the active workbook, if any
    pub fn active_path(&self) -> Option<PathBuf> {
        self.state.lock().active_path()
    }

    /// Canonical name of the active workbook, if any
    pub fn active_file(&self) -> Option<String> {
        self.state.lock().active_file.clone()
    }

    /// Snapshot of the registered workbooks
    pub fn files(&self) -> BTreeMap<String, PathBuf> {
        self.state.lock().files.clone()
    }

    /// Append one record to the execution log. Failures are logged, not returned.
    pub fn log_execution(
        &self,
        user_command: &str,
        tool_name: &str,
        filepath: Option<&str>,
        arguments: &Map<String, Value>,
        result: &str,
    ) {
        let entry = ExecutionLogEntry::now(user_command, tool_name, filepath, arguments, result);
        if let Err(e) = entry.append_to(&self.log_path) {
            self.logger.warn(&format!(
                "[Workspace] Failed to append execution log {}: {}",
                self.log_path.display(),
                e
            ));
        }
    }

    /// Wait for exclusive use of the workspace
    pub async fn acquire_lock(&self) -> WorkspaceLock<'_> {
        WorkspaceLock {
            _guard: self.execution_lock.lock().await,
        }
    }

    fn scan_disk(&self) -> WorkspaceResult<BTreeMap<String, PathBuf>> {
        let mut found = BTreeMap::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if has_workbook_extension(&name) {
                found.insert(name, entry.path());
            }
        }
        Ok(found)
    }

    fn reconcile_locked(&self, state: &mut WorkspaceState, on_disk: &BTreeMap<String, PathBuf>) {
        let report = state.reconcile_with(on_disk);
        if !report.is_empty() {
            self.logger.debug(&format!(
                "[Workspace] Reconciled: added {:?}, removed {:?}, cleared active: {}",
                report.added, report.removed, report.cleared_active
            ));
        }
    }

    fn persist(&self, state: &WorkspaceState) -> WorkspaceResult<()> {
        state.save(&self.state_path)
    }
}

impl std::fmt::Debug for WorkspaceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkspaceRegistry")
            .field("root", &self.root)
            .field("state_path", &self.state_path)
            .field("suggestion_cutoff", &self.suggestion_cutoff)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;
    use crate::workspace::Severity;
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};

    fn open_workspace() -> (TempDir, WorkspaceRegistry) {
        let dir = tempdir().unwrap();
        let registry = WorkspaceRegistry::open(dir.path(), Arc::new(NoOpLogger)).unwrap();
        (dir, registry)
    }

    fn touch(registry: &WorkspaceRegistry, name: &str) -> PathBuf {
        let path = registry.root().join(name);
        fs::write(&path, b"PK").unwrap();
        path
    }

    #[test]
    fn test_open_creates_root_and_state() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("nested").join("ws");
        let registry = WorkspaceRegistry::open(&root, Arc::new(NoOpLogger)).unwrap();

        assert!(root.is_dir());
        assert!(registry.state_path().exists());
        assert!(registry.files().is_empty());
        assert!(registry.active_path().is_none());
    }

    #[test]
    fn test_open_discovers_existing_workbooks() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("Budget.xlsx"), b"PK").unwrap();
        fs::write(dir.path().join("notes.txt"), b"hi").unwrap();
        fs::create_dir(dir.path().join("Archive.xlsx")).unwrap();

        let registry = WorkspaceRegistry::open(dir.path(), Arc::new(NoOpLogger)).unwrap();
        let files = registry.files();

        assert_eq!(files.len(), 1);
        assert!(files.contains_key("Budget.xlsx"));
    }

    #[test]
    fn test_open_tolerates_corrupt_state() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(STATE_FILE_NAME), "{{{").unwrap();
        fs::write(dir.path().join("Budget.xlsx"), b"PK").unwrap();

        let registry = WorkspaceRegistry::open(dir.path(), Arc::new(NoOpLogger)).unwrap();
        assert!(registry.files().contains_key("Budget.xlsx"));
    }

    #[test]
    fn test_state_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let registry = WorkspaceRegistry::open(dir.path(), Arc::new(NoOpLogger)).unwrap();
            registry.register("Budget").unwrap();
            fs::write(registry.root().join("Budget.xlsx"), b"PK").unwrap();
            registry.reconcile().unwrap();
        }

        let reopened = WorkspaceRegistry::open(dir.path(), Arc::new(NoOpLogger)).unwrap();
        assert_eq!(reopened.active_file().as_deref(), Some("Budget.xlsx"));
        assert_eq!(
            reopened.active_path(),
            Some(reopened.root().join("Budget.xlsx"))
        );
    }

    #[test]
    fn test_register_sets_active_without_touching_disk() {
        let (_dir, registry) = open_workspace();

        let path = registry.register("  /somewhere/Q1  Report ").unwrap();

        assert_eq!(path, registry.root().join("Q1 Report.xlsx"));
        assert!(!path.exists());
        assert_eq!(registry.active_file().as_deref(), Some("Q1 Report.xlsx"));
        assert_eq!(registry.active_path(), Some(path));
    }

    #[test]
    fn test_resolve_case_insensitive_matches_active() {
        let (_dir, registry) = open_workspace();
        registry.register("Budget").unwrap();
        touch(&registry, "Budget.xlsx");

        let by_name = registry.resolve(Some("budget.xlsx")).unwrap();
        let by_active = registry.resolve(None).unwrap();

        assert_eq!(by_name, registry.root().join("Budget.xlsx"));
        assert_eq!(by_name, by_active);
    }

    #[test]
    fn test_resolve_strips_directories_and_activates() {
        let (_dir, registry) = open_workspace();
        touch(&registry, "Budget.xlsx");
        touch(&registry, "Sales.xlsx");
        registry.register("Budget").unwrap();

        let path = registry.resolve(Some("/elsewhere/sales")).unwrap();

        assert_eq!(path, registry.root().join("Sales.xlsx"));
        assert_eq!(registry.active_file().as_deref(), Some("Sales.xlsx"));
    }

    #[test]
    fn test_resolve_without_active_fails() {
        let (_dir, registry) = open_workspace();

        let err = registry.resolve(None).unwrap_err();
        assert!(matches!(err, WorkspaceError::NoActiveWorkbook));
        assert_eq!(err.severity(), Severity::Recoverable);

        let err = registry.resolve(Some("   ")).unwrap_err();
        assert!(matches!(err, WorkspaceError::NoActiveWorkbook));
    }

    #[test]
    fn test_resolve_missing_suggests_close_name() {
        let (_dir, registry) = open_workspace();
        touch(&registry, "Budget.xlsx");
        registry.reconcile().unwrap();

        let err = registry.resolve(Some("Bugdet")).unwrap_err();
        match &err {
            WorkspaceError::FileNotFound { name, suggestion } => {
                assert_eq!(name, "Bugdet");
                assert_eq!(suggestion.as_deref(), Some("Budget.xlsx"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("Did you mean 'Budget.xlsx'?"));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_resolve_drops_entries_deleted_out_of_band() {
        let (_dir, registry) = open_workspace();
        let path = touch(&registry, "Budget.xlsx");
        registry.resolve(Some("Budget")).unwrap();

        fs::remove_file(&path).unwrap();

        let err = registry.resolve(None).unwrap_err();
        assert!(matches!(err, WorkspaceError::NoActiveWorkbook));
        assert!(registry.files().is_empty());
    }

    #[test]
    fn test_rename_moves_file_and_entry() {
        let (_dir, registry) = open_workspace();
        let old_path = touch(&registry, "Draft.xlsx");
        registry.reconcile().unwrap();

        let new_path = registry.rename(&old_path.to_string_lossy(), "Final").unwrap();

        assert_eq!(new_path, registry.root().join("Final.xlsx"));
        assert!(new_path.exists());
        assert!(!old_path.exists());
        let files = registry.files();
        assert!(files.contains_key("Final.xlsx"));
        assert!(!files.contains_key("Draft.xlsx"));
        assert_eq!(registry.active_file().as_deref(), Some("Final.xlsx"));
    }

    #[test]
    fn test_rename_untracked_is_recoverable() {
        let (_dir, registry) = open_workspace();

        let err = registry.rename("Nope.xlsx", "Other.xlsx").unwrap_err();

        assert!(matches!(err, WorkspaceError::FileNotTracked(ref name) if name == "Nope.xlsx"));
        assert_eq!(err.severity(), Severity::Recoverable);
    }

    #[test]
    fn test_rename_physical_missing_is_fatal_and_leaves_registry() {
        let (_dir, registry) = open_workspace();
        registry.register("Ghost").unwrap();
        let before = registry.files();

        let err = registry.rename("Ghost.xlsx", "Real.xlsx").unwrap_err();

        assert!(matches!(err, WorkspaceError::PhysicalFileMissing(_)));
        assert!(err.is_fatal());
        assert_eq!(registry.files(), before);
        assert_eq!(registry.active_file().as_deref(), Some("Ghost.xlsx"));
    }

    #[test]
    fn test_rename_failure_on_disk_leaves_registry() {
        let (_dir, registry) = open_workspace();
        let old_path = touch(&registry, "Draft.xlsx");
        registry.reconcile().unwrap();
        let blocker = registry.root().join("Final.xlsx");
        fs::create_dir(&blocker).unwrap();
        fs::write(blocker.join("keep"), b"x").unwrap();
        let before = registry.files();
        let active_before = registry.active_file();

        let err = registry.rename("Draft", "Final").unwrap_err();

        assert!(matches!(err, WorkspaceError::Io(_)));
        assert!(err.is_fatal());
        assert!(old_path.exists());
        assert_eq!(registry.files(), before);
        assert_eq!(registry.active_file(), active_before);
    }

    #[test]
    fn test_log_execution_appends() {
        let (_dir, registry) = open_workspace();
        let args = serde_json::json!({ "filepath": "/w/a.xlsx" })
            .as_object()
            .cloned()
            .unwrap();

        registry.log_execution("make a", "create_workbook", Some("/w/a.xlsx"), &args, "success");
        registry.log_execution("make a", "create_workbook", Some("/w/a.xlsx"), &args, "success");

        let content = fs::read_to_string(registry.log_path()).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[tokio::test]
    async fn test_lock_is_exclusive_and_released_on_drop() {
        let (_dir, registry) = open_workspace();
        let registry = Arc::new(registry);

        let guard = registry.acquire_lock().await;

        let contender = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                let _guard = registry.acquire_lock().await;
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!contender.is_finished());

        guard.release();
        tokio::time::timeout(Duration::from_secs(2), contender)
            .await
            .expect("lock should be released")
            .unwrap();
    }
}
