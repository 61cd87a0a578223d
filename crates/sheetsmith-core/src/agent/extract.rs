//! Locating the JSON object in free-form model output

use serde_json::Value;

/// Parse the first balanced `{...}` span in `text`.
///
/// Braces are counted naively, so a brace inside a string literal can end the
/// span early; such a span simply fails to parse.
pub fn extract_json_object(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let mut depth = 0usize;

    for (offset, c) in text[start..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + c.len_utf8();
                    return serde_json::from_str(&text[start..end]).ok();
                }
            }
            _ => {}
        }
    }

    None
}
