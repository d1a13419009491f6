//! Tool descriptors
//!
//! A `Tool` is the discovery record a caller sees in `tools/list`: a unique
//! name, a human-readable description and a JSON-schema input contract.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A tool descriptor: name, description and input schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    /// Tool name (e.g., "get_subject_info")
    pub name: String,
    /// Human-readable description for the calling agent
    pub description: String,
    /// JSON schema for input parameters
    #[serde(rename = "inputSchema", alias = "input_schema")]
    pub input_schema: Value,
}

impl Tool {
    /// Create a new tool with an empty object schema
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {}
            }),
        }
    }

    /// Set input schema
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }

    /// Top-level parameter schemas, keyed by parameter name
    pub fn properties(&self) -> Option<&Map<String, Value>> {
        self.input_schema.get("properties").and_then(Value::as_object)
    }

    /// Names listed in the schema's `required` array
    pub fn required(&self) -> Vec<&str> {
        self.input_schema
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn subject_tool() -> Tool {
        Tool::new("get_episodes", "List episodes").with_schema(json!({
            "type": "object",
            "properties": {
                "subject_id": { "type": "integer" },
                "limit": { "type": "integer", "default": 30 }
            },
            "required": ["subject_id"]
        }))
    }

    #[test]
    fn test_tool_new() {
        let tool = Tool::new("get_me_info", "Current user");
        assert_eq!(tool.name, "get_me_info");
        assert_eq!(tool.description, "Current user");
        assert_eq!(tool.input_schema["type"], "object");
        assert!(tool.required().is_empty());
        assert!(tool.properties().unwrap().is_empty());
    }

    #[test]
    fn test_tool_required() {
        let tool = subject_tool();
        assert_eq!(tool.required(), vec!["subject_id"]);
    }

    #[test]
    fn test_tool_properties() {
        let tool = subject_tool();
        let props = tool.properties().unwrap();
        assert_eq!(props["limit"]["default"], 30);
    }

    #[test]
    fn test_tool_serializes_camel_case_schema() {
        let json = serde_json::to_value(subject_tool()).unwrap();
        assert!(json.get("inputSchema").is_some());
        assert!(json.get("input_schema").is_none());
        assert_eq!(json["name"], "get_episodes");
    }

    #[test]
    fn test_tool_deserializes_either_key() {
        let snake: Tool = serde_json::from_str(
            r#"{"name": "a", "description": "b", "input_schema": {"type": "object"}}"#,
        )
        .unwrap();
        let camel: Tool = serde_json::from_str(
            r#"{"name": "a", "description": "b", "inputSchema": {"type": "object"}}"#,
        )
        .unwrap();
        assert_eq!(snake, camel);
    }
}
