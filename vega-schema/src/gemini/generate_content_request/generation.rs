use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// `generationConfig` object.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate_count: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking_config: Option<ThinkingConfig>,

    #[serde(default, flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// `generationConfig.thinkingConfig` object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThinkingConfig {
    pub include_thoughts: bool,
    pub thinking_budget: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn generation_config_roundtrips_camel_case() {
        let input = json!({
            "temperature": 0.4,
            "topP": 1.0,
            "topK": 50,
            "candidateCount": 1,
            "maxOutputTokens": 16384,
            "frequencyPenalty": 0.1,
            "presencePenalty": 0.2,
            "stopSequences": ["<|user|>", "<|bot|>"],
            "thinkingConfig": {
                "includeThoughts": true,
                "thinkingBudget": 1024
            }
        });

        let gc: GenerationConfig = serde_json::from_value(input.clone()).unwrap();
        assert_eq!(gc.candidate_count, Some(1));
        assert_eq!(gc.frequency_penalty, Some(0.1));
        assert_eq!(
            gc.thinking_config,
            Some(ThinkingConfig {
                include_thoughts: true,
                thinking_budget: 1024
            })
        );
        assert_eq!(serde_json::to_value(&gc).unwrap(), input);
    }

    #[test]
    fn unknown_fields_captured_in_extra() {
        let gc: GenerationConfig = serde_json::from_value(json!({
            "responseModalities": ["TEXT"],
            "newFutureField": true
        }))
        .unwrap();

        assert_eq!(gc.extra.get("responseModalities"), Some(&json!(["TEXT"])));
        assert_eq!(gc.extra.get("newFutureField"), Some(&json!(true)));
    }
}
