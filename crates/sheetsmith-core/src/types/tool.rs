//! Tool-call proposal and outcome types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A `{tool_name, arguments}` pair proposed by the language model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallProposal {
    /// Name of the tool the model wants to run
    pub tool_name: String,
    /// Raw arguments, keys not yet normalized
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl ToolCallProposal {
    pub fn new(tool_name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments,
        }
    }

    /// Build a proposal from a parsed model reply.
    ///
    /// Requires a non-empty string `tool_name`. A missing or null `arguments`
    /// is treated as an empty object; any other non-object is rejected.
    pub fn from_value(value: Value) -> Option<Self> {
        let Value::Object(mut object) = value else {
            return None;
        };

        let tool_name = match object.remove("tool_name") {
            Some(Value::String(name)) if !name.trim().is_empty() => name.trim().to_string(),
            _ => return None,
        };

        let arguments = match object.remove("arguments") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map,
            Some(_) => return None,
        };

        Some(Self { tool_name, arguments })
    }
}

/// Result of a single tool invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallOutcome {
    /// Whether the tool reported success
    pub ok: bool,
    /// Result text on success, error text otherwise
    pub text: String,
}

impl ToolCallOutcome {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            ok: true,
            text: text.into(),
        }
    }

    pub fn failure(text: impl Into<String>) -> Self {
        Self {
            ok: false,
            text: text.into(),
        }
    }
}
