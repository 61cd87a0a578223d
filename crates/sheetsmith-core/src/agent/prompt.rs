//! Model prompt construction

use crate::tools::SchemaRegistry;

/// Build the prompt for one attempt.
///
/// `previous_error` carries the failure of the last attempt, if any, so the
/// model can correct itself.
pub fn build_prompt(
    schemas: &SchemaRegistry,
    user_request: &str,
    previous_error: Option<&str>,
) -> String {
    let tool_lines = schemas.prompt_lines().join("\n");

    let error_section = match previous_error {
        Some(error) => format!(
            "Previous attempt failed:\n{}\n\nCorrect the mistake and produce valid JSON.\n",
            error
        ),
        None => String::new(),
    };

    format!(
        r#"You are a deterministic Excel automation agent.

Rules:
- Always return valid JSON
- Use exact tool names
- Provide ALL required fields
- Never invent argument names

Tool schemas:
{tool_lines}

{error_section}
User request:
{user_request}

Return ONLY:

{{
  "tool_name": "...",
  "arguments": {{ ... }}
}}
"#
    )
}
