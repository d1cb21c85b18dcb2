use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Body for `POST /v1internal:fetchAvailableModels`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchModelsRequest {
    pub project: String,
}

/// Upstream model catalog: a map keyed by model id. The per-model metadata
/// is opaque to the gateway, so it stays a raw value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FetchModelsResponse {
    #[serde(default)]
    pub models: BTreeMap<String, Value>,

    #[serde(default, flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn models_parse_as_keyed_map() {
        let resp: FetchModelsResponse = serde_json::from_value(json!({
            "models": {
                "gemini-2.5-flash": {"displayName": "Flash"},
                "claude-sonnet-4-5": {}
            }
        }))
        .unwrap();

        let ids: Vec<&str> = resp.models.keys().map(String::as_str).collect();
        assert_eq!(ids, vec!["claude-sonnet-4-5", "gemini-2.5-flash"]);
    }

    #[test]
    fn missing_models_key_yields_empty_map() {
        let resp: FetchModelsResponse = serde_json::from_value(json!({})).unwrap();
        assert!(resp.models.is_empty());
    }
}
