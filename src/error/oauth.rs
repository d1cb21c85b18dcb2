use super::IsRetryable;
use axum::http::StatusCode;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum OauthError {
    #[error("token refresh failed with status {status}: {body}")]
    RefreshFailed { status: StatusCode, body: String },

    #[error("token endpoint request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("token endpoint returned an unusable payload: {message}")]
    Parse { message: String },
}

impl IsRetryable for OauthError {
    fn is_retryable(&self) -> bool {
        match self {
            OauthError::Request(err) => !err.is_timeout(),
            OauthError::RefreshFailed { .. } | OauthError::Parse { .. } => false,
        }
    }
}
