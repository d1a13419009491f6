//! Normalized tool output
//!
//! Every tool call ends in exactly one `ToolOutput`: a success payload with
//! nulls stripped, or an error payload (backend error body, or a local
//! `{"error": message}`).

use serde_json::{Value, json};

/// The only value that crosses the dispatch boundary back to the caller
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Success(Value),
    Error(Value),
}

impl ToolOutput {
    /// Success payload with null fields removed
    pub fn success(value: Value) -> Self {
        Self::Success(remove_null_items(value))
    }

    /// Backend error body, passed through unchanged
    pub fn backend_error(body: Value) -> Self {
        Self::Error(body)
    }

    /// Local argument-validation failure
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Error(json!({ "error": message.into() }))
    }

    /// A fault caught at the dispatch boundary
    pub fn fault(message: impl std::fmt::Display) -> Self {
        Self::Error(json!({ "error": format!("Error: {}", message) }))
    }

    pub fn unknown_tool(name: &str) -> Self {
        Self::Error(json!({ "error": format!("Unknown tool: {}", name) }))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    pub fn payload(&self) -> &Value {
        match self {
            Self::Success(v) | Self::Error(v) => v,
        }
    }

    pub fn into_payload(self) -> Value {
        match self {
            Self::Success(v) | Self::Error(v) => v,
        }
    }
}

/// Recursively drop null values from mappings and sequences.
///
/// Key order and element order of everything else is preserved, and the
/// function is idempotent.
pub fn remove_null_items(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, remove_null_items(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .filter(|v| !v.is_null())
                .map(remove_null_items)
                .collect(),
        ),
        other => other,
    }
}
