//! Append-only execution log (one JSON object per line)

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One dispatched attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLogEntry {
    /// Seconds since the Unix epoch
    pub timestamp: f64,
    pub user_command: String,
    pub tool_name: String,
    pub filepath: Option<String>,
    pub arguments: Map<String, Value>,
    pub result: String,
}

impl ExecutionLogEntry {
    pub fn now(
        user_command: &str,
        tool_name: &str,
        filepath: Option<&str>,
        arguments: &Map<String, Value>,
        result: &str,
    ) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();

        Self {
            timestamp,
            user_command: user_command.to_string(),
            tool_name: tool_name.to_string(),
            filepath: filepath.map(str::to_string),
            arguments: arguments.clone(),
            result: result.to_string(),
        }
    }

    /// Append this entry as a single line
    pub fn append_to(&self, path: &Path) -> std::io::Result<()> {
        let mut line = serde_json::to_string(self).map_err(std::io::Error::other)?;
        line.push('\n');

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(line.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_append_writes_one_line_per_entry() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.jsonl");
        let args = json!({ "filepath": "/w/a.xlsx" }).as_object().cloned().unwrap();

        ExecutionLogEntry::now("make a", "create_workbook", Some("/w/a.xlsx"), &args, "success")
            .append_to(&path)
            .unwrap();
        ExecutionLogEntry::now("make b", "create_workbook", None, &Map::new(), "boom")
            .append_to(&path)
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: ExecutionLogEntry = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.user_command, "make a");
        assert_eq!(first.filepath.as_deref(), Some("/w/a.xlsx"));
        assert_eq!(first.result, "success");
        assert!(first.timestamp > 0.0);

        let second: ExecutionLogEntry = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.filepath, None);
        assert_eq!(second.result, "boom");
    }
}
