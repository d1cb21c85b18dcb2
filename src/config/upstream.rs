use serde::{Deserialize, Serialize};
use url::Url;

/// Upstream endpoint configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UpstreamConfig {
    /// Base API URL for the internal generate-content endpoints.
    /// TOML: `upstream.api_base_url`.
    /// Default: `https://daily-cloudcode-pa.sandbox.googleapis.com`.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: Url,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
        }
    }
}

fn default_api_base_url() -> Url {
    Url::parse("https://daily-cloudcode-pa.sandbox.googleapis.com")
        .expect("default upstream api_base_url must be a valid URL")
}
