use chrono::Utc;
use rand::Rng as _;
use serde::{Deserialize, Serialize};

/// Refresh this long before the recorded expiry to avoid handing out tokens
/// that die mid-request.
pub const EXPIRY_SKEW_SECS: i64 = 300;

const SESSION_ID_MAX_EXCLUSIVE: i64 = 9_000_000_000_000_000_000;

/// One upstream identity: a project id plus its OAuth refresh/access token
/// pair.
///
/// The persisted shape matches the pool file (`project_id`, `refresh_token`,
/// `access_token`, `expires_at`, `enabled`, `disabled_reason`). The
/// `session_id` is runtime-only: generated when the pool is loaded, scoped
/// to this process, never written to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub project_id: String,

    pub refresh_token: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// Absolute expiry in epoch seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled_reason: Option<String>,

    #[serde(skip, default)]
    pub session_id: String,
}

fn default_enabled() -> bool {
    true
}

impl Project {
    /// True when the access token is missing or within the expiry skew.
    pub fn needs_refresh(&self) -> bool {
        let Some(token) = self.access_token.as_deref() else {
            return true;
        };
        if token.is_empty() {
            return true;
        }
        match self.expires_at {
            Some(expires_at) => expires_at < Utc::now().timestamp() + EXPIRY_SKEW_SECS,
            None => true,
        }
    }

    /// Assign a fresh runtime session id in the upstream's wire shape: a
    /// negative decimal string.
    pub fn assign_session_id(&mut self) {
        let value = rand::rng().random_range(0..SESSION_ID_MAX_EXCLUSIVE);
        self.session_id = format!("-{value}");
    }
}
