use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Project pool configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PoolConfig {
    /// Path of the persistent project-pool file.
    /// TOML: `pool.data_file`. Default: `data/tokens.json`.
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,

    /// How many requests a project serves before the round-robin cursor
    /// advances. TOML: `pool.rotation_count`. Default: `1`.
    #[serde(default = "default_rotation_count")]
    pub rotation_count: u32,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
            rotation_count: default_rotation_count(),
        }
    }
}

fn default_data_file() -> PathBuf {
    PathBuf::from("data/tokens.json")
}

fn default_rotation_count() -> u32 {
    1
}
