//! How a validated tool call is carried out

/// Execution route for a tool call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchRoute {
    /// Register the new workbook, then ask the tool process to create it
    Create,
    /// One `create_worksheet` call per requested sheet
    BatchCreate,
    /// Handled by the workspace registry alone
    Rename,
    /// Forwarded to the tool process as-is
    Generic,
}

impl DispatchRoute {
    pub fn for_tool(tool_name: &str) -> Self {
        match tool_name {
            "create_workbook" => DispatchRoute::Create,
            "create_multiple_worksheets" => DispatchRoute::BatchCreate,
            "rename_workbook" => DispatchRoute::Rename,
            _ => DispatchRoute::Generic,
        }
    }
}
