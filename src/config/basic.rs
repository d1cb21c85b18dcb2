use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use tracing::warn;

/// Basic (core) configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BasicConfig {
    /// HTTP server listen address (e.g., "0.0.0.0", "127.0.0.1").
    /// TOML: `basic.listen_addr`. Default: `0.0.0.0`.
    #[serde(default = "default_listen_ip")]
    pub listen_addr: IpAddr,

    /// HTTP server listen port.
    /// TOML: `basic.listen_port`. Default: `8000`.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Log level for tracing subscriber initialization
    /// (e.g., "error", "warn", "info", "debug", "trace").
    /// TOML: `basic.loglevel`. Default: `info`.
    #[serde(default = "default_loglevel")]
    pub loglevel: String,

    /// Client API keys accepted on inbound requests.
    /// TOML: `basic.api_keys`. Falls back to the `API_KEYS` environment
    /// variable (a JSON list of strings) when the table is empty.
    #[serde(default)]
    pub api_keys: Vec<String>,
}

impl BasicConfig {
    pub(super) fn apply_env_fallbacks(&mut self) {
        if !self.api_keys.is_empty() {
            return;
        }
        let Ok(raw) = std::env::var("API_KEYS") else {
            return;
        };
        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(keys) => self.api_keys = keys,
            Err(err) => warn!("API_KEYS is not a JSON list of strings, ignoring: {err}"),
        }
    }
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_ip(),
            listen_port: default_listen_port(),
            loglevel: default_loglevel(),
            api_keys: Vec::new(),
        }
    }
}

fn default_listen_ip() -> IpAddr {
    Ipv4Addr::new(0, 0, 0, 0).into()
}

fn default_listen_port() -> u16 {
    8000
}

fn default_loglevel() -> String {
    "info".to_string()
}
