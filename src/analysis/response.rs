/*!
 * Extraction of the JSON object from a free-form model reply.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::errors::PipelineError;

static FENCE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```[A-Za-z]*[ \t]*\r?\n?(.*?)```").unwrap());

/// Find the analysis object in a reply.
///
/// The first fenced block holding an object wins; otherwise the first
/// balanced top-level `{...}` span of the whole reply is used.
pub fn extract_json_object(reply: &str) -> Result<Value, PipelineError> {
    for caps in FENCE_REGEX.captures_iter(reply) {
        if let Some(span) = first_balanced_object(&caps[1]) {
            if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(span) {
                return Ok(value);
            }
        }
    }

    let span = first_balanced_object(reply).ok_or_else(|| {
        PipelineError::MalformedAnalysisResponse(format!(
            "no JSON object found in reply ({} chars)",
            reply.chars().count()
        ))
    })?;

    match serde_json::from_str::<Value>(span) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(_) => Err(PipelineError::MalformedAnalysisResponse(
            "reply JSON is not an object".to_string(),
        )),
        Err(e) => Err(PipelineError::MalformedAnalysisResponse(format!("invalid JSON: {}", e))),
    }
}

/// First `{...}` span with balanced braces, ignoring braces inside strings
pub fn first_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}
