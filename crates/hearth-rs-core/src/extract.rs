//! Turning a responder body into the text shown to the user.
//!
//! The responder's schema is not fixed: it may answer with plain text, a JSON
//! object, or a JSON array of items. `ResponseEnvelope` lists the fields we
//! understand and their precedence; anything else is rendered as JSON and
//! logged as a schema violation.

use log::{debug, warn};
use serde::Deserialize;
use serde_json::Value;

/// Result of interpreting a responder body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// Human-readable content to show as the reply.
    Content(String),
    /// The body was empty or whitespace only.
    Empty,
}

/// Known response fields, tried in declaration order.
#[derive(Debug, Default, Deserialize)]
struct ResponseEnvelope {
    #[serde(default)]
    output: Option<Value>,
    #[serde(default)]
    response: Option<Value>,
    #[serde(default)]
    message: Option<Value>,
    #[serde(default)]
    text: Option<Value>,
    #[serde(default)]
    content: Option<Value>,
}

impl ResponseEnvelope {
    /// First candidate holding a string value.
    fn first_text(self) -> Option<String> {
        [
            self.output,
            self.response,
            self.message,
            self.text,
            self.content,
        ]
        .into_iter()
        .flatten()
        .find_map(|value| match value {
            Value::String(text) => Some(text),
            _ => None,
        })
    }
}

/// Interpret a raw responder body. Never fails.
pub fn extract(body: &str) -> Extraction {
    let trimmed = body.trim_start();
    if trimmed.is_empty() {
        return Extraction::Empty;
    }
    if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
        return Extraction::Content(body.to_string());
    }

    let parsed: Value = match serde_json::from_str(trimmed) {
        Ok(value) => value,
        Err(err) => {
            debug!(
                "structured-looking body is not JSON, using raw text (len={}, error={})",
                body.len(),
                err
            );
            return Extraction::Content(body.to_string());
        }
    };

    if let Some(text) = find_content(&parsed) {
        return Extraction::Content(text);
    }
    warn!(
        "responder body matched no known field, rendering as JSON (shape={})",
        shape(&parsed)
    );
    Extraction::Content(parsed.to_string())
}

fn find_content(value: &Value) -> Option<String> {
    match value {
        Value::Object(_) => ResponseEnvelope::deserialize(value).ok()?.first_text(),
        // Batch-style responders wrap the item in an array.
        Value::Array(items) => items
            .iter()
            .find(|item| item.is_object())
            .and_then(find_content),
        _ => None,
    }
}

fn shape(value: &Value) -> &'static str {
    match value {
        Value::Object(_) => "object",
        Value::Array(_) => "array",
        _ => "scalar",
    }
}
