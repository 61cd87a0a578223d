//! Schema registry for the spreadsheet tools
//!
//! A fixed table of tool name -> required argument fields. It must agree with
//! the methods the tool process accepts, plus the two composite tools the
//! orchestrator implements itself (`rename_workbook`,
//! `create_multiple_worksheets`).

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde_json::{Map, Value};
use thiserror::Error;

/// Required fields of one tool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolSchema {
    pub name: &'static str,
    pub required: &'static [&'static str],
}

/// Tools handled by the orchestrator without a direct server counterpart
const CLIENT_SIDE_TOOLS: &[&str] = &["rename_workbook", "create_multiple_worksheets"];

/// Tools that cannot run without a target sheet
const SHEET_REQUIRED_TOOLS: &[&str] = &[
    "write_data_to_excel",
    "read_data_from_excel",
    "format_range",
    "merge_cells",
    "unmerge_cells",
    "apply_formula",
    "create_chart",
    "create_table",
];

const TOOL_SCHEMAS: &[ToolSchema] = &[
    ToolSchema {
        name: "create_workbook",
        required: &["filepath"],
    },
    ToolSchema {
        name: "rename_workbook",
        required: &["old_filepath", "new_filepath"],
    },
    ToolSchema {
        name: "create_worksheet",
        required: &["filepath", "sheet_name"],
    },
    ToolSchema {
        name: "create_multiple_worksheets",
        required: &["filepath", "sheet_names"],
    },
    ToolSchema {
        name: "get_workbook_metadata",
        required: &["filepath"],
    },
    ToolSchema {
        name: "write_data_to_excel",
        required: &["filepath", "sheet_name", "data"],
    },
    ToolSchema {
        name: "read_data_from_excel",
        required: &["filepath", "sheet_name"],
    },
    ToolSchema {
        name: "format_range",
        required: &["filepath", "sheet_name", "start_cell"],
    },
    ToolSchema {
        name: "merge_cells",
        required: &["filepath", "sheet_name", "start_cell", "end_cell"],
    },
    ToolSchema {
        name: "unmerge_cells",
        required: &["filepath", "sheet_name", "start_cell", "end_cell"],
    },
    ToolSchema {
        name: "get_merged_cells",
        required: &["filepath", "sheet_name"],
    },
    ToolSchema {
        name: "apply_formula",
        required: &["filepath", "sheet_name", "cell", "formula"],
    },
    ToolSchema {
        name: "validate_formula_syntax",
        required: &["filepath", "sheet_name", "cell", "formula"],
    },
    ToolSchema {
        name: "create_chart",
        required: &[
            "filepath",
            "sheet_name",
            "data_range",
            "chart_type",
            "target_cell",
        ],
    },
    ToolSchema {
        name: "create_pivot_table",
        required: &[
            "filepath",
            "sheet_name",
            "data_range",
            "target_cell",
            "rows",
            "values",
        ],
    },
    ToolSchema {
        name: "create_table",
        required: &["filepath", "sheet_name", "data_range"],
    },
    ToolSchema {
        name: "copy_worksheet",
        required: &["filepath", "source_sheet", "target_sheet"],
    },
    ToolSchema {
        name: "delete_worksheet",
        required: &["filepath", "sheet_name"],
    },
    ToolSchema {
        name: "rename_worksheet",
        required: &["filepath", "old_name", "new_name"],
    },
    ToolSchema {
        name: "copy_range",
        required: &[
            "filepath",
            "sheet_name",
            "source_start",
            "source_end",
            "target_start",
        ],
    },
    ToolSchema {
        name: "delete_range",
        required: &["filepath", "sheet_name", "start_cell", "end_cell"],
    },
    ToolSchema {
        name: "validate_excel_range",
        required: &["filepath", "sheet_name", "start_cell"],
    },
    ToolSchema {
        name: "get_data_validation_info",
        required: &["filepath", "sheet_name"],
    },
    ToolSchema {
        name: "insert_rows",
        required: &["filepath", "sheet_name", "start_row"],
    },
    ToolSchema {
        name: "insert_columns",
        required: &["filepath", "sheet_name", "start_col"],
    },
    ToolSchema {
        name: "delete_sheet_rows",
        required: &["filepath", "sheet_name", "start_row"],
    },
    ToolSchema {
        name: "delete_sheet_columns",
        required: &["filepath", "sheet_name", "start_col"],
    },
];

static INDEX: Lazy<HashMap<&'static str, &'static ToolSchema>> =
    Lazy::new(|| TOOL_SCHEMAS.iter().map(|schema| (schema.name, schema)).collect());

/// Schema validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Missing required fields: [{}]", .0.join(", "))]
    MissingFields(Vec<String>),
}

pub type SchemaResult<T> = Result<T, SchemaError>;

/// Read-only access to the tool table
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaRegistry;

impl SchemaRegistry {
    pub fn new() -> Self {
        Self
    }

    /// Check that `arguments` carries every required field of `tool_name`.
    ///
    /// A field set to JSON `null` counts as missing. All missing fields are
    /// reported together, in table order.
    pub fn validate(&self, tool_name: &str, arguments: &Map<String, Value>) -> SchemaResult<()> {
        let schema = self
            .get(tool_name)
            .ok_or_else(|| SchemaError::UnknownTool(tool_name.to_string()))?;

        let missing: Vec<String> = schema
            .required
            .iter()
            .filter(|field| arguments.get(**field).map_or(true, Value::is_null))
            .map(|field| field.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(SchemaError::MissingFields(missing))
        }
    }

    pub fn get(&self, tool_name: &str) -> Option<&'static ToolSchema> {
        INDEX.get(tool_name).copied()
    }

    pub fn contains(&self, tool_name: &str) -> bool {
        INDEX.contains_key(tool_name)
    }

    /// Every tool name, in table order
    pub fn tool_names(&self) -> impl Iterator<Item = &'static str> {
        TOOL_SCHEMAS.iter().map(|schema| schema.name)
    }

    pub fn required_fields(&self, tool_name: &str) -> Option<&'static [&'static str]> {
        self.get(tool_name).map(|schema| schema.required)
    }

    /// Whether the tool's schema lists `field` as required
    pub fn requires_field(&self, tool_name: &str, field: &str) -> bool {
        self.required_fields(tool_name)
            .is_some_and(|fields| fields.contains(&field))
    }

    /// Whether the tool refuses to run without an explicit sheet
    pub fn requires_sheet(&self, tool_name: &str) -> bool {
        SHEET_REQUIRED_TOOLS.contains(&tool_name)
    }

    /// Whether the tool process itself is expected to implement the tool
    pub fn is_server_tool(&self, tool_name: &str) -> bool {
        self.contains(tool_name) && !CLIENT_SIDE_TOOLS.contains(&tool_name)
    }

    /// One line per tool for the model prompt, e.g.
    /// `create_worksheet: {"filepath": "...", "sheet_name": "..."}`
    pub fn prompt_lines(&self) -> Vec<String> {
        TOOL_SCHEMAS
            .iter()
            .map(|schema| {
                let fields = schema
                    .required
                    .iter()
                    .map(|field| format!("\"{}\": \"...\"", field))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{}: {{{}}}", schema.name, fields)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_table_has_every_tool_once() {
        let registry = SchemaRegistry::new();
        assert_eq!(registry.tool_names().count(), 27);
        assert_eq!(INDEX.len(), 27);
    }

    #[test]
    fn test_validate_ok() {
        let registry = SchemaRegistry::new();
        let result = registry.validate(
            "create_worksheet",
            &args(json!({ "filepath": "/w/a.xlsx", "sheet_name": "Totals", "extra": 1 })),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_unknown_tool() {
        let registry = SchemaRegistry::new();
        let err = registry.validate("launch_rocket", &Map::new()).unwrap_err();
        assert_eq!(err, SchemaError::UnknownTool("launch_rocket".into()));
        assert_eq!(err.to_string(), "Unknown tool: launch_rocket");
    }

    #[test]
    fn test_validate_lists_all_missing_in_order() {
        let registry = SchemaRegistry::new();
        let err = registry
            .validate(
                "merge_cells",
                &args(json!({ "sheet_name": "S", "start_cell": null })),
            )
            .unwrap_err();

        assert_eq!(
            err,
            SchemaError::MissingFields(vec![
                "filepath".into(),
                "start_cell".into(),
                "end_cell".into()
            ])
        );
        assert_eq!(
            err.to_string(),
            "Missing required fields: [filepath, start_cell, end_cell]"
        );
    }

    #[test]
    fn test_sheet_and_server_sets() {
        let registry = SchemaRegistry::new();
        assert!(registry.requires_sheet("create_chart"));
        assert!(!registry.requires_sheet("create_worksheet"));
        assert!(registry.requires_field("create_worksheet", "sheet_name"));
        assert!(!registry.requires_field("create_workbook", "sheet_name"));

        assert!(registry.is_server_tool("create_workbook"));
        assert!(!registry.is_server_tool("rename_workbook"));
        assert!(!registry.is_server_tool("create_multiple_worksheets"));
        assert!(!registry.is_server_tool("launch_rocket"));
    }

    #[test]
    fn test_prompt_lines() {
        let registry = SchemaRegistry::new();
        let lines = registry.prompt_lines();
        assert_eq!(lines.len(), 27);
        assert_eq!(lines[0], "create_workbook: {\"filepath\": \"...\"}");
        assert!(lines
            .iter()
            .any(|l| l == "create_worksheet: {\"filepath\": \"...\", \"sheet_name\": \"...\"}"));
    }
}
