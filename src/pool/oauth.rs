//! Refresh-token exchange against the OAuth token endpoint.

use crate::error::OauthError;
use crate::pool::OauthConfig;
use chrono::Utc;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Applied when the token endpoint omits `expires_in`.
pub const DEFAULT_EXPIRES_IN_SECS: i64 = 3599;

const TOKEN_ENDPOINT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct TokenEndpointResponse {
    access_token: String,
    expires_in: Option<i64>,
}

/// POST the refresh grant and return `(access_token, expires_at)` with
/// `expires_at` in absolute epoch seconds.
pub async fn refresh_access_token(
    http: &reqwest::Client,
    oauth: &OauthConfig,
    refresh_token: &str,
) -> Result<(String, i64), OauthError> {
    let form = [
        ("client_id", oauth.client_id.as_str()),
        ("client_secret", oauth.client_secret.as_str()),
        ("grant_type", "refresh_token"),
        ("refresh_token", refresh_token),
    ];

    let resp = http
        .post(&oauth.token_url)
        .timeout(TOKEN_ENDPOINT_TIMEOUT)
        .form(&form)
        .send()
        .await?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(OauthError::RefreshFailed { status, body });
    }

    let token: TokenEndpointResponse =
        resp.json().await.map_err(|err| OauthError::Parse {
            message: err.to_string(),
        })?;

    let expires_in = token.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
    debug!(expires_in, "Token endpoint returned a fresh access token");
    Ok((token.access_token, Utc::now().timestamp() + expires_in))
}
