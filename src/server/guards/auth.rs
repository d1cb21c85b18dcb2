//! Inbound API-key authentication.
//!
//! The OpenAI surface accepts `Authorization: Bearer <key>` only; the Gemini
//! passthrough surface additionally accepts `X-Goog-Api-Key` and `?key=`,
//! matching what Gemini SDKs send.

use crate::server::router::GatewayState;
use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use serde_json::json;
use subtle::{Choice, ConstantTimeEq};

/// Membership test is the only operation; comparisons are constant-time
/// across the whole set.
pub struct ApiKeySet {
    keys: Vec<String>,
}

impl ApiKeySet {
    pub fn new(keys: Vec<String>) -> Self {
        Self { keys }
    }

    pub fn contains(&self, candidate: &str) -> bool {
        let mut matched = Choice::from(0u8);
        for key in &self.keys {
            matched |= candidate.as_bytes().ct_eq(key.as_bytes());
        }
        matched.into()
    }
}

fn extract_bearer_token(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|auth| auth.token().to_string())
}

fn extract_goog_token(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .get("x-goog-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn extract_query_token(query: Option<&str>) -> Option<String> {
    query.and_then(|q| {
        url::form_urlencoded::parse(q.as_bytes())
            .find(|(k, _)| k == "key")
            .map(|(_, v)| v.into_owned())
    })
}

fn check(state: &GatewayState, token: Option<String>) -> Result<(), AuthError> {
    match token {
        Some(key) if state.api_keys.contains(&key) => Ok(()),
        Some(_) => Err(AuthError::InvalidKey),
        None => Err(AuthError::MissingKey),
    }
}

/// Bearer-only guard for the OpenAI-compatible routes.
#[derive(Debug, Clone, Copy)]
pub struct RequireKeyAuth;

impl FromRequestParts<GatewayState> for RequireKeyAuth {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &GatewayState,
    ) -> Result<Self, Self::Rejection> {
        check(state, extract_bearer_token(&parts.headers))?;
        Ok(RequireKeyAuth)
    }
}

/// Guard for the Gemini passthrough routes: bearer, goog header, or query.
#[derive(Debug, Clone, Copy)]
pub struct RequireGeminiKeyAuth;

impl FromRequestParts<GatewayState> for RequireGeminiKeyAuth {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &GatewayState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_goog_token(&parts.headers)
            .or_else(|| extract_bearer_token(&parts.headers))
            .or_else(|| extract_query_token(parts.uri.query()));
        check(state, token)?;
        Ok(RequireGeminiKeyAuth)
    }
}

pub enum AuthError {
    MissingKey,
    InvalidKey,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, reason) = match self {
            AuthError::MissingKey => (StatusCode::UNAUTHORIZED, "Missing API key"),
            AuthError::InvalidKey => (StatusCode::UNAUTHORIZED, "Invalid API key"),
        };
        (
            status,
            Json(json!({ "error": "unauthorized", "reason": reason })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_set_membership() {
        let keys = ApiKeySet::new(vec!["sk-one".to_string(), "sk-two".to_string()]);
        assert!(keys.contains("sk-one"));
        assert!(keys.contains("sk-two"));
        assert!(!keys.contains("sk-three"));
        assert!(!keys.contains(""));
    }

    #[test]
    fn empty_key_set_rejects_everything() {
        let keys = ApiKeySet::new(vec![]);
        assert!(!keys.contains("anything"));
    }

    #[test]
    fn query_token_extraction() {
        assert_eq!(
            extract_query_token(Some("alt=sse&key=sk-abc")),
            Some("sk-abc".to_string())
        );
        assert_eq!(extract_query_token(Some("alt=sse")), None);
        assert_eq!(extract_query_token(None), None);
    }
}
