use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error as ThisError;

use super::IsRetryable;
use super::oauth::OauthError;

#[derive(Debug, ThisError)]
pub enum GatewayError {
    #[error("no projects configured")]
    NoProjectsConfigured,

    #[error("all projects are disabled")]
    AllProjectsDisabled,

    #[error("unknown project: {0}")]
    UnknownProject(String),

    #[error(transparent)]
    Oauth(#[from] OauthError),

    #[error("invalid request: {detail}")]
    BadRequest { detail: String },

    #[error("upstream error with status {status}")]
    UpstreamStatus { status: StatusCode, body: String },

    #[error("upstream auth failed after token refresh: {status}")]
    UpstreamAuth { status: StatusCode },

    #[error("upstream request timed out")]
    Timeout,

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GatewayError {
    pub fn bad_request(detail: impl Into<String>) -> Self {
        GatewayError::BadRequest {
            detail: detail.into(),
        }
    }

    /// Fold reqwest timeouts into the structured timeout error so the HTTP
    /// layer can map them to 504 uniformly.
    pub fn from_send_error(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout
        } else {
            GatewayError::Http(err)
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_body) = match self {
            GatewayError::BadRequest { detail } => (
                StatusCode::BAD_REQUEST,
                ApiErrorObject {
                    code: "BAD_REQUEST".to_string(),
                    message: detail,
                    details: None,
                },
            ),

            GatewayError::NoProjectsConfigured
            | GatewayError::AllProjectsDisabled
            | GatewayError::UnknownProject(_)
            | GatewayError::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiErrorObject {
                    code: "INTERNAL_ERROR".to_string(),
                    message: "An internal server error occurred.".to_string(),
                    details: None,
                },
            ),

            GatewayError::Oauth(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiErrorObject {
                    code: "TOKEN_REFRESH_FAILED".to_string(),
                    message: err.to_string(),
                    details: None,
                },
            ),

            // Forward the upstream body verbatim, preserving the status.
            GatewayError::UpstreamStatus { status, body } => {
                return (
                    status,
                    [(axum::http::header::CONTENT_TYPE, "application/json")],
                    body,
                )
                    .into_response();
            }

            GatewayError::UpstreamAuth { status } => (
                StatusCode::UNAUTHORIZED,
                ApiErrorObject {
                    code: "UPSTREAM_AUTH_FAILED".to_string(),
                    message: format!("Upstream auth failed after token refresh: {status}"),
                    details: None,
                },
            ),

            GatewayError::Timeout => (
                StatusCode::GATEWAY_TIMEOUT,
                ApiErrorObject {
                    code: "TIMEOUT".to_string(),
                    message: "Request timeout".to_string(),
                    details: None,
                },
            ),

            GatewayError::Http(_) => (
                StatusCode::BAD_GATEWAY,
                ApiErrorObject {
                    code: "UPSTREAM_ERROR".to_string(),
                    message: "Upstream service error.".to_string(),
                    details: None,
                },
            ),

            GatewayError::Json(_) => (
                StatusCode::BAD_GATEWAY,
                ApiErrorObject {
                    code: "BAD_UPSTREAM_PAYLOAD".to_string(),
                    message: "Failed to parse upstream response.".to_string(),
                    details: None,
                },
            ),
        };
        (status, Json(ApiErrorBody { inner: error_body })).into_response()
    }
}

/// Standardized API error response payload.
#[derive(Serialize)]
pub struct ApiErrorObject {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Serialize)]
pub struct ApiErrorBody {
    #[serde(rename = "error")]
    pub inner: ApiErrorObject,
}

impl IsRetryable for GatewayError {
    fn is_retryable(&self) -> bool {
        match self {
            GatewayError::Http(err) => err.is_connect() || err.is_request(),
            _ => false,
        }
    }
}
