//! Request body sanitizing
//!
//! Applied to every create and update body before it reaches a store:
//! keys that the engine would read as operators (`$`-prefixed) or as paths
//! (containing `.`) are dropped at every depth, and `<` in string values is
//! escaped so stored text cannot open an HTML tag.

use serde_json::Value;

use crate::repository::Document;

/// Clean a request body.
pub fn sanitize_body(body: Document) -> Document {
    body.into_iter()
        .filter(|(key, _)| is_plain_key(key))
        .map(|(key, value)| (key, sanitize_value(value)))
        .collect()
}

fn is_plain_key(key: &str) -> bool {
    !key.starts_with('$') && !key.contains('.')
}

fn sanitize_value(value: Value) -> Value {
    match value {
        Value::String(text) if text.contains('<') => Value::String(text.replace('<', "&lt;")),
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize_value).collect()),
        Value::Object(map) => Value::Object(sanitize_body(map)),
        other => other,
    }
}
