use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// `toolConfig` object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolConfig {
    pub function_calling_config: FunctionCallingConfig,

    #[serde(default, flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ToolConfig {
    /// The upstream tool-calling mode: auto but schema-checked.
    pub const VALIDATED_MODE: &str = "VALIDATED";

    pub fn validated() -> Self {
        Self {
            function_calling_config: FunctionCallingConfig {
                mode: Self::VALIDATED_MODE.to_string(),
                allowed_function_names: None,
            },
            extra: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionCallingConfig {
    pub mode: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_function_names: Option<Vec<String>>,
}
