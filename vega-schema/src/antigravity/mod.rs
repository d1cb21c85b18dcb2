//! Typed request schema for the Antigravity upstream envelope.
//!
//! The internal endpoint wraps a Gemini generate-content request in a
//! metadata envelope carrying the project identity and request bookkeeping.

use crate::gemini::GeminiRequest;
use serde::{Deserialize, Serialize};

/// Runtime metadata needed to wrap a Gemini request into the upstream
/// envelope.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    pub project: String,
    pub request_id: String,
    pub model: String,
}

impl RequestMeta {
    /// Build an upstream envelope from runtime metadata and a typed Gemini
    /// request body.
    pub fn into_request(self, request: GeminiRequest) -> AntigravityRequestBody {
        AntigravityRequestBody {
            project: self.project,
            request_id: self.request_id,
            request,
            model: self.model,
            user_agent: AntigravityRequestBody::USER_AGENT.to_string(),
            request_type: None,
        }
    }
}

/// Antigravity upstream request envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AntigravityRequestBody {
    pub project: String,
    pub request_id: String,
    pub request: GeminiRequest,
    pub model: String,
    pub user_agent: String,

    /// Only set for image-generation requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_type: Option<String>,
}

impl AntigravityRequestBody {
    pub const USER_AGENT: &str = "antigravity";
    pub const REQUEST_TYPE_IMAGE_GEN: &str = "image_gen";

    pub fn is_image_gen(&self) -> bool {
        self.request_type.as_deref() == Some(Self::REQUEST_TYPE_IMAGE_GEN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_roundtrips() {
        let input = json!({
            "project": "test-project",
            "requestId": "agent-b9acb5be-0d95-407e-a9cf-94315ff8a43e",
            "request": {
                "contents": [{
                    "role": "user",
                    "parts": [{"text": "hello"}]
                }]
            },
            "model": "gemini-2.5-flash",
            "userAgent": "antigravity"
        });

        let body: AntigravityRequestBody = serde_json::from_value(input.clone()).unwrap();
        assert!(!body.is_image_gen());
        assert_eq!(serde_json::to_value(&body).unwrap(), input);
    }

    #[test]
    fn into_request_applies_fixed_fields() {
        let request: GeminiRequest = serde_json::from_value(json!({
            "contents": [{"role": "user", "parts": [{"text": "hello"}]}]
        }))
        .unwrap();

        let body = RequestMeta {
            project: "project-1".to_string(),
            request_id: "agent-00000000-0000-4000-8000-000000000000".to_string(),
            model: "gemini-2.5-flash".to_string(),
        }
        .into_request(request);

        assert_eq!(body.user_agent, "antigravity");
        assert_eq!(body.project, "project-1");
        assert!(body.request_type.is_none());
    }

    #[test]
    fn image_gen_request_type_serializes_when_set() {
        let request: GeminiRequest =
            serde_json::from_value(json!({"contents": []})).unwrap();
        let mut body = RequestMeta {
            project: "p".to_string(),
            request_id: "agent-1".to_string(),
            model: "gemini-3-pro-image".to_string(),
        }
        .into_request(request);
        body.request_type = Some(AntigravityRequestBody::REQUEST_TYPE_IMAGE_GEN.to_string());

        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["requestType"], "image_gen");
        assert!(body.is_image_gen());
    }
}
