use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

/// Image persistence configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ImageConfig {
    /// Directory where inline image bytes are persisted.
    /// TOML: `images.dir`. Default: `data/images`.
    #[serde(default = "default_dir")]
    pub dir: PathBuf,

    /// Retention: keep at most this many newest files by mtime.
    /// TOML: `images.max_images`. Default: `10`.
    #[serde(default = "default_max_images")]
    pub max_images: usize,

    /// Public base URL used in markdown image links. When unset, derived
    /// from the listen address.
    /// TOML: `images.base_url`. Example: `https://gateway.example.com`.
    #[serde(default)]
    pub base_url: Option<Url>,

    /// Comment-heartbeat interval for image-generation SSE wrappers.
    /// TOML: `images.heartbeat_secs`. Default: `15.0`.
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: f64,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            dir: default_dir(),
            max_images: default_max_images(),
            base_url: None,
            heartbeat_secs: default_heartbeat_secs(),
        }
    }
}

fn default_dir() -> PathBuf {
    PathBuf::from("data/images")
}

fn default_max_images() -> usize {
    10
}

fn default_heartbeat_secs() -> f64 {
    15.0
}
