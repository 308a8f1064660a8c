//! Input validation for messages, tutor state and user text.

use serde_json::Value;
use thiserror::Error;

use super::types::Role;

/// Check that a raw JSON value has the shape of a chat message.
pub fn validate_message(value: &Value) -> bool {
    let Some(object) = value.as_object() else {
        return false;
    };

    object.get("id").map_or(false, Value::is_string)
        && object.get("content").map_or(false, Value::is_string)
        && object
            .get("role")
            .and_then(Value::as_str)
            .and_then(Role::from_str)
            .is_some()
        && object
            .get("timestamp")
            .and_then(Value::as_str)
            .map_or(false, |ts| chrono::DateTime::parse_from_rfc3339(ts).is_ok())
}

/// Check that a raw JSON value has the shape of a tutor state.
pub fn validate_tutor_state(value: &Value) -> bool {
    let Some(object) = value.as_object() else {
        return false;
    };

    object.get("attempt_number").map_or(false, Value::is_number)
        && object.get("hint_level").map_or(false, Value::is_number)
        && object.get("misconception").map_or(false, Value::is_string)
}

/// Escape characters that are significant in HTML.
pub fn sanitize_input(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '/' => out.push_str("&#x2F;"),
            _ => out.push(c),
        }
    }
    out
}

/// Trim user text and reject it if nothing is left.
pub fn clean_user_text(input: &str) -> Result<String, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty);
    }
    Ok(trimmed.to_string())
}

/// Validation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Message is empty")]
    Empty,
}
