//! Argument normalization
//!
//! Model output uses whatever key names it likes. Before validation the
//! arguments are mapped onto the canonical keys, sheet lists are coerced to
//! arrays of names, and file references are resolved against the workspace.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::workspace::{bare_file_name, canonicalize, WorkspaceRegistry, WorkspaceResult};

use super::registry::SchemaRegistry;

/// Alternate key -> canonical key
const KEY_ALIASES: &[(&str, &str)] = &[
    ("workbook", "filepath"),
    ("workbook_name", "filepath"),
    ("file", "filepath"),
    ("old_file", "old_filepath"),
    ("new_file", "new_filepath"),
    ("worksheet", "sheet_name"),
    ("worksheet_name", "sheet_name"),
    ("sheet", "sheet_name"),
    ("sheets", "sheet_names"),
    ("worksheets", "sheet_names"),
    ("names", "sheet_names"),
];

/// Characters stripped from both ends of each sheet list element
const SHEET_NAME_TRIM: &[char] = &['[', ']', '\'', '"', ' '];

/// Tools that name a workbook that may not exist yet
const NO_ACTIVE_DEFAULT: &[&str] = &["create_workbook", "rename_workbook"];

/// Canonical key for an argument name
pub fn canonical_key(key: &str) -> &str {
    KEY_ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, canonical)| *canonical)
        .unwrap_or(key)
}

/// Coerce a sheet list into an array of trimmed, non-empty names.
///
/// Strings are split on commas. Arrays keep their order with each element
/// stripped of brackets, quotes and spaces. Null is left alone so schema
/// validation can report it; any other scalar becomes a one-element list.
pub fn coerce_sheet_names(value: Value) -> Value {
    let names: Vec<String> = match value {
        Value::Null | Value::Object(_) => return value,
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.trim_matches(SHEET_NAME_TRIM).to_string(),
                other => other.to_string().trim_matches(SHEET_NAME_TRIM).to_string(),
            })
            .filter(|name| !name.is_empty())
            .collect(),
        other => vec![other.to_string()],
    };

    Value::Array(names.into_iter().map(Value::String).collect())
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn path_value(path: std::path::PathBuf) -> Value {
    Value::String(path.to_string_lossy().into_owned())
}

/// Rewrites raw model arguments into the canonical form
pub struct ArgumentNormalizer {
    workspace: Arc<WorkspaceRegistry>,
    schemas: SchemaRegistry,
}

impl ArgumentNormalizer {
    pub fn new(workspace: Arc<WorkspaceRegistry>) -> Self {
        Self {
            workspace,
            schemas: SchemaRegistry::new(),
        }
    }

    /// Normalize the arguments of one proposal.
    ///
    /// Resolution failures come back as workspace errors; their severity
    /// decides whether the caller retries.
    pub fn normalize(
        &self,
        raw: &Map<String, Value>,
        tool_name: &str,
    ) -> WorkspaceResult<Map<String, Value>> {
        let mut args = Map::new();
        for (key, value) in raw {
            args.insert(canonical_key(key).to_string(), value.clone());
        }

        if let Some(names) = args.remove("sheet_names") {
            args.insert("sheet_names".to_string(), coerce_sheet_names(names));
        }

        if tool_name != "create_workbook" {
            self.resolve_primary_file(&mut args, tool_name)?;
        }

        if let Some(old) = args.get("old_filepath").and_then(as_text) {
            let path = self.workspace.resolve(Some(&old))?;
            args.insert("old_filepath".to_string(), path_value(path));
        }

        // New names are only canonicalized; the file does not exist yet.
        if let Some(new) = args.get("new_filepath").and_then(as_text) {
            args.insert(
                "new_filepath".to_string(),
                Value::String(canonicalize(&bare_file_name(&new))),
            );
        }

        Ok(args)
    }

    fn resolve_primary_file(
        &self,
        args: &mut Map<String, Value>,
        tool_name: &str,
    ) -> WorkspaceResult<()> {
        let requested = args
            .get("filepath")
            .and_then(as_text)
            .filter(|name| !name.trim().is_empty());

        let path = match requested {
            Some(name) => self.workspace.resolve(Some(&name))?,
            None if self.defaults_to_active(tool_name) => self.workspace.resolve(None)?,
            None => return Ok(()),
        };

        args.insert("filepath".to_string(), path_value(path));
        Ok(())
    }

    fn defaults_to_active(&self, tool_name: &str) -> bool {
        !NO_ACTIVE_DEFAULT.contains(&tool_name)
            && self.schemas.requires_field(tool_name, "filepath")
    }
}
