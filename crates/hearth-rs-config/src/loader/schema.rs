//! Schema validation for Hearth JSON5 configuration layers.
//!
//! Every layer is checked on its own so an error names the file it came from.
//! Keys are optional at this stage; required values are enforced after merge.

use crate::ConfigError;
use serde_json::{Map, Value};

/// Expected JSON shape of a config entry.
enum Kind {
    String,
    Integer,
    OneOf(&'static [&'static str]),
    Object(&'static [(&'static str, Kind)]),
}

const RETRY: &[(&str, Kind)] = &[("attempts", Kind::Integer), ("backoff_ms", Kind::Integer)];

const BACKEND: &[(&str, Kind)] = &[
    ("url", Kind::String),
    ("anon_key", Kind::String),
    ("access_token", Kind::String),
    ("threads_table", Kind::String),
    ("messages_table", Kind::String),
    ("request_timeout_ms", Kind::Integer),
    ("retry", Kind::Object(RETRY)),
];

const WEBHOOK: &[(&str, Kind)] = &[
    ("url", Kind::String),
    ("test_url", Kind::String),
    ("auth_token", Kind::String),
    ("timeout_ms", Kind::Integer),
];

const SESSION: &[(&str, Kind)] = &[
    ("thread_label", Kind::String),
    ("mode", Kind::OneOf(&["production", "test"])),
    ("event_buffer", Kind::Integer),
];

const ROOT: &[(&str, Kind)] = &[
    ("$schema", Kind::String),
    ("backend", Kind::Object(BACKEND)),
    ("webhook", Kind::Object(WEBHOOK)),
    ("session", Kind::Object(SESSION)),
];

/// Validate a single config layer against the schema.
pub(super) fn validate_layer_schema(value: &Value, layer: &str) -> Result<(), ConfigError> {
    check_object(value, ROOT, layer, "")
}

fn check_object(
    value: &Value,
    fields: &[(&str, Kind)],
    layer: &str,
    path: &str,
) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    for (key, entry) in map {
        let entry_path = join_path(path, key);
        let Some((_, kind)) = fields.iter().find(|(name, _)| name == key) else {
            return Err(invalid_field(layer, &entry_path, "unknown key"));
        };
        check_kind(entry, kind, layer, &entry_path)?;
    }
    Ok(())
}

fn check_kind(value: &Value, kind: &Kind, layer: &str, path: &str) -> Result<(), ConfigError> {
    match kind {
        Kind::String if value.is_string() => Ok(()),
        Kind::String => Err(invalid_field(layer, path, "expected string")),
        Kind::Integer if value.is_u64() => Ok(()),
        Kind::Integer => Err(invalid_field(layer, path, "expected non-negative integer")),
        Kind::OneOf(options) => match value.as_str() {
            Some(choice) if options.contains(&choice) => Ok(()),
            _ => Err(invalid_field(
                layer,
                path,
                &format!("expected one of: {}", options.join(", ")),
            )),
        },
        Kind::Object(fields) => check_object(value, fields, layer, path),
    }
}

fn expect_object<'a>(
    value: &'a Value,
    layer: &str,
    path: &str,
) -> Result<&'a Map<String, Value>, ConfigError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(invalid_field(layer, path, "expected object")),
    }
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

/// Build a structured invalid-field error.
fn invalid_field(layer: &str, path: &str, message: &str) -> ConfigError {
    let normalized_path = if path.is_empty() { "root" } else { path };
    ConfigError::InvalidField {
        path: format!("{layer}:{normalized_path}"),
        message: message.to_string(),
    }
}
