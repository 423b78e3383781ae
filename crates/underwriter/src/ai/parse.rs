//! Turning free-form completion text into structured data when possible.

use serde_json::Value;

/// A completion is either a JSON value or opaque text.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedCompletion {
    Structured(Value),
    Raw(String),
}

/// Parses a completion as JSON.
///
/// The whole reply must parse, optionally wrapped in a single ```json
/// fence. Prose around or inside the JSON makes the reply raw.
pub fn parse_completion(text: &str) -> ParsedCompletion {
    let trimmed = text.trim();
    let candidate = strip_fence(trimmed).unwrap_or(trimmed);

    match serde_json::from_str::<Value>(candidate) {
        Ok(value) => ParsedCompletion::Structured(value),
        Err(_) => ParsedCompletion::Raw(text.to_string()),
    }
}

/// Returns the body of a reply that is exactly one fenced block.
fn strip_fence(text: &str) -> Option<&str> {
    let body = text.strip_prefix("```")?.strip_suffix("```")?;
    let body = body.strip_prefix("json").unwrap_or(body);
    if body.contains("```") {
        return None;
    }
    Some(body.trim())
}
