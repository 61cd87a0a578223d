//! Message shapes spoken with the tool process
//!
//! Newline-delimited JSON-RPC 2.0 carrying the MCP `initialize`,
//! `tools/list` and `tools/call` methods.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::types::ToolCallOutcome;

use super::error::{RpcError, RpcResult};

/// Text reported for a successful call that returned no content
pub const DEFAULT_SUCCESS_TEXT: &str = "Success";

/// Build a request envelope
pub fn request(id: u64, method: &str, params: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
        "params": params,
    })
}

/// Build a notification envelope (no id, no response expected)
pub fn notification(method: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "method": method,
    })
}

/// Split a response into its result, or the error it carries
pub fn parse_response(response: Value) -> RpcResult<Value> {
    if let Some(error) = response.get("error").filter(|e| !e.is_null()) {
        let code = error.get("code").and_then(|c| c.as_i64()).unwrap_or(-1);
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(RpcError::Rpc { code, message });
    }

    match response {
        Value::Object(mut map) => map
            .remove("result")
            .ok_or_else(|| RpcError::InvalidResponse("Missing result field".to_string())),
        other => Err(RpcError::InvalidResponse(format!(
            "Expected a JSON object, got {}",
            other
        ))),
    }
}

/// A tool advertised by `tools/list`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "inputSchema")]
    pub input_schema: Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ToolListResult {
    #[serde(default)]
    pub tools: Vec<ToolDescriptor>,
}

/// One content item of a tool result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolContent {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
}

/// Result payload of `tools/call`
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ToolCallResult {
    #[serde(default)]
    pub content: Vec<ToolContent>,
    #[serde(default, rename = "isError")]
    pub is_error: bool,
}

impl ToolCallResult {
    /// Text of the first content item, or "Success" when there is none
    pub fn first_text(&self) -> String {
        self.content
            .first()
            .and_then(|item| item.text.clone())
            .unwrap_or_else(|| DEFAULT_SUCCESS_TEXT.to_string())
    }

    pub fn into_outcome(self) -> ToolCallOutcome {
        let text = self.first_text();
        if self.is_error {
            ToolCallOutcome::failure(text)
        } else {
            ToolCallOutcome::success(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_response_result() {
        let result = parse_response(json!({ "jsonrpc": "2.0", "id": 1, "result": { "ok": true } }));
        assert_eq!(result.unwrap(), json!({ "ok": true }));
    }

    #[test]
    fn test_parse_response_error() {
        let err = parse_response(json!({
            "id": 1,
            "error": { "code": -32601, "message": "Method not found" }
        }))
        .unwrap_err();

        match err {
            RpcError::Rpc { code, message } => {
                assert_eq!(code, -32601);
                assert_eq!(message, "Method not found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_response_missing_result() {
        let err = parse_response(json!({ "id": 1 })).unwrap_err();
        assert!(matches!(err, RpcError::InvalidResponse(_)));
    }

    #[test]
    fn test_call_result_text() {
        let result: ToolCallResult = serde_json::from_value(json!({
            "content": [
                { "type": "text", "text": "Sheet created" },
                { "type": "text", "text": "ignored" }
            ]
        }))
        .unwrap();
        assert_eq!(result.into_outcome(), ToolCallOutcome::success("Sheet created"));

        let empty: ToolCallResult = serde_json::from_value(json!({})).unwrap();
        assert_eq!(empty.first_text(), "Success");

        let image_only: ToolCallResult =
            serde_json::from_value(json!({ "content": [{ "type": "image", "data": "..." }] }))
                .unwrap();
        assert_eq!(image_only.first_text(), "Success");
    }

    #[test]
    fn test_call_result_is_error() {
        let result: ToolCallResult = serde_json::from_value(json!({
            "content": [{ "type": "text", "text": "Sheet 'X' not found" }],
            "isError": true
        }))
        .unwrap();

        let outcome = result.into_outcome();
        assert!(!outcome.ok);
        assert_eq!(outcome.text, "Sheet 'X' not found");
    }

    #[test]
    fn test_tool_descriptor() {
        let list: ToolListResult = serde_json::from_value(json!({
            "tools": [
                {
                    "name": "create_workbook",
                    "description": "Create",
                    "inputSchema": { "type": "object" }
                },
                { "name": "bare" }
            ]
        }))
        .unwrap();

        assert_eq!(list.tools.len(), 2);
        assert_eq!(list.tools[0].input_schema, json!({ "type": "object" }));
        assert_eq!(list.tools[1].description, None);
    }
}
