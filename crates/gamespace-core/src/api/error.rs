use reqwest::StatusCode;
use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Message surfaced when the backend gives no structured error
pub const GENERIC_ERROR_MESSAGE: &str = "An unexpected error occurred";

/// Error returned by every `ApiClient` call.
///
/// `Display` always renders the normalized, human-readable message so UI
/// code can show `err.to_string()` directly. The underlying transport error,
/// when there is one, is kept as the error source for logging.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    #[error("An unexpected error occurred")]
    Network(#[from] reqwest::Error),

    #[error("An unexpected error occurred")]
    InvalidResponse(String),

    #[error("No {0} stored - please log in")]
    MissingToken(&'static str),
}

/// Maximum length for error response bodies in log output
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    pub(crate) fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Build an error from a non-success response body
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let parsed = serde_json::from_str::<Value>(body).ok();
        ApiError::Rejected {
            status,
            message: error_message(parsed.as_ref()),
        }
    }

    /// The normalized message, identical to `to_string()`
    pub fn message(&self) -> String {
        self.to_string()
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Rejected { status, .. } => Some(*status),
            ApiError::Network(e) => e.status(),
            _ => None,
        }
    }
}

/// Flatten the backend's `error` field into one human-readable line.
///
/// A string is passed through, an object becomes `"field: message"` pairs
/// joined with `" | "` (array messages joined with a space), and anything
/// else falls back to `GENERIC_ERROR_MESSAGE`.
pub fn error_message(body: Option<&Value>) -> String {
    let Some(error) = body.and_then(|b| b.get("error")) else {
        return GENERIC_ERROR_MESSAGE.to_string();
    };

    match error {
        Value::String(s) if !s.is_empty() => s.clone(),
        Value::Object(fields) => ordered_entries(fields)
            .into_iter()
            .map(|(key, val)| format!("{}: {}", key, field_text(val)))
            .collect::<Vec<_>>()
            .join(" | "),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, val)| format!("{}: {}", i, field_text(val)))
            .collect::<Vec<_>>()
            .join(" | "),
        _ => GENERIC_ERROR_MESSAGE.to_string(),
    }
}

/// Entries in property order: array-index keys ascending, then the rest in
/// the order the backend sent them
fn ordered_entries(fields: &Map<String, Value>) -> Vec<(&String, &Value)> {
    let (mut indexed, named): (Vec<_>, Vec<_>) = fields
        .iter()
        .partition(|(key, _)| array_index(key).is_some());
    indexed.sort_by_key(|(key, _)| array_index(key));
    indexed.extend(named);
    indexed
}

/// Canonical decimal integers below 2^32 - 1, without leading zeros
fn array_index(key: &str) -> Option<u32> {
    let index: u32 = key.parse().ok()?;
    (index != u32::MAX && index.to_string() == key).then_some(index)
}

fn number_text(n: &Number) -> String {
    match n.as_f64() {
        Some(f) if !n.is_i64() && !n.is_u64() && f.fract() == 0.0 && f.abs() < 1e21 => {
            format!("{:.0}", f)
        }
        _ => n.to_string(),
    }
}

fn field_text(val: &Value) -> String {
    match val {
        Value::Array(items) => items.iter().map(join_element).collect::<Vec<_>>().join(" "),
        other => value_text(other),
    }
}

fn join_element(val: &Value) -> String {
    if val.is_null() {
        String::new()
    } else {
        value_text(val)
    }
}

fn value_text(val: &Value) -> String {
    match val {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => number_text(n),
        Value::Array(items) => items.iter().map(join_element).collect::<Vec<_>>().join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}
