//! Tool schema and tool output types.

use serde::{Deserialize, Serialize};

/// The (name, description, parameter-schema) triple offered to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    /// Wrap this definition in the `{type: "function", function: {...}}` shape.
    pub fn as_function(&self) -> FunctionTool<'_> {
        FunctionTool {
            tool_type: "function",
            function: self,
        }
    }
}

/// Function-calling envelope for a tool definition.
#[derive(Debug, Clone, Serialize)]
pub struct FunctionTool<'a> {
    #[serde(rename = "type")]
    pub tool_type: &'static str,
    pub function: &'a ToolDefinition,
}

/// An empty object schema, used when a tool declares no parameters.
pub fn empty_object_schema() -> serde_json::Value {
    serde_json::json!({"type": "object", "properties": {}})
}

/// Result of executing a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub value: serde_json::Value,
}

impl ToolOutput {
    pub fn new(value: serde_json::Value) -> Self {
        Self { value }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            value: serde_json::Value::String(text.into()),
        }
    }

    /// Render the output as tool-result content: strings verbatim, anything
    /// else as compact JSON.
    pub fn render(&self) -> String {
        match &self.value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}
