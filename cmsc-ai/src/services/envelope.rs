//! Response envelope normalization
//!
//! The backend wraps payloads inconsistently: `{"object": {...}}`,
//! `{"data": {...}}`, or the bare object. Error bodies vary the same way.
//! Everything is unwrapped here, once, so gateway callers only ever see the
//! typed payload or a single error message.

use serde_json::Value;

/// Unwrap a response body to its payload
///
/// Tries each of `keys` in order, then `data`, then falls back to the body
/// itself.
pub fn unwrap_envelope(body: Value, keys: &[&str]) -> Value {
    if let Value::Object(mut map) = body {
        for key in keys.iter().copied().chain(std::iter::once("data")) {
            if let Some(inner) = map.remove(key) {
                if !inner.is_null() {
                    return inner;
                }
            }
        }
        Value::Object(map)
    } else {
        body
    }
}

/// Extract a human-readable message from an error body
///
/// Accepts `{"message"}`, `{"error": "..."}`, `{"error": {"message"}}` and
/// `{"errors": [{"message"}, ...]}`; anything else is returned as trimmed
/// text. An empty body yields `None`.
pub fn error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    let Ok(value) = serde_json::from_str::<Value>(trimmed) else {
        return Some(trimmed.to_string());
    };

    if let Some(message) = value.get("message").and_then(Value::as_str) {
        return Some(message.to_string());
    }

    match value.get("error") {
        Some(Value::String(message)) => return Some(message.clone()),
        Some(Value::Object(inner)) => {
            if let Some(message) = inner.get("message").and_then(Value::as_str) {
                return Some(message.to_string());
            }
        }
        _ => {}
    }

    if let Some(errors) = value.get("errors").and_then(Value::as_array) {
        let messages: Vec<&str> = errors
            .iter()
            .filter_map(|e| e.get("message").and_then(Value::as_str).or_else(|| e.as_str()))
            .collect();
        if !messages.is_empty() {
            return Some(messages.join("; "));
        }
    }

    Some(trimmed.to_string())
}
