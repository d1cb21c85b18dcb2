mod basic;
mod images;
mod pool;
mod upstream;

pub use basic::BasicConfig;
pub use images::ImageConfig;
pub use pool::PoolConfig;
pub use upstream::UpstreamConfig;

use figment::{
    Figment,
    providers::{Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Application configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Core server configuration (see `basic` table in config.toml).
    #[serde(default)]
    pub basic: BasicConfig,

    /// Upstream endpoint settings (see `upstream` table in config.toml).
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Project pool settings (see `pool` table in config.toml).
    #[serde(default)]
    pub pool: PoolConfig,

    /// Image persistence settings (see `images` table in config.toml).
    #[serde(default)]
    pub images: ImageConfig,
}

const DEFAULT_CONFIG_FILE: &str = "config.toml";

impl Config {
    /// Builds a Figment that merges defaults and a config TOML file.
    pub fn figment() -> Figment {
        let figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if PathBuf::from(DEFAULT_CONFIG_FILE).is_file() {
            figment.merge(Toml::file(DEFAULT_CONFIG_FILE))
        } else {
            figment
        }
    }

    /// Loads configuration by merging defaults and `config.toml` if present,
    /// then applies the environment fallbacks for keys that may arrive via
    /// env instead of the file.
    pub fn load() -> Self {
        let mut cfg: Self = Self::figment().extract().unwrap_or_else(|err| {
            panic!("failed to extract configuration (defaults + optional config.toml): {err}")
        });
        cfg.basic.apply_env_fallbacks();
        cfg
    }
}
