use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// `tools[]` object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    /// Function declarations available for model function calling.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_declarations: Option<Vec<FunctionDeclaration>>,

    #[serde(default, flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Structured declaration for a callable function tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionDeclaration {
    /// Sanitized function name (`[A-Za-z0-9_-]`, max 128 chars).
    pub name: String,

    /// Brief function description.
    #[serde(default)]
    pub description: String,

    /// OpenAPI-style parameters schema, already cleaned of the JSON-Schema
    /// keywords the upstream rejects.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,

    #[serde(default, flatten)]
    pub extra: BTreeMap<String, Value>,
}
