//! Persistent project-pool storage.
//!
//! The pool lives in a single JSON file (default `data/tokens.json`). When
//! the file is absent, configuration is read from the environment
//! (`PROJECTS`, `OAUTH_CLIENT_ID`, `OAUTH_CLIENT_SECRET`, `OAUTH_TOKEN_URL`)
//! and migrated to the file so later token updates persist.

use crate::pool::Project;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OauthConfig {
    #[serde(default = "default_client_id")]
    pub client_id: String,

    #[serde(default = "default_client_secret")]
    pub client_secret: String,

    #[serde(default = "default_token_url")]
    pub token_url: String,
}

impl Default for OauthConfig {
    fn default() -> Self {
        Self {
            client_id: default_client_id(),
            client_secret: default_client_secret(),
            token_url: default_token_url(),
        }
    }
}

fn default_client_id() -> String {
    "1071006060591-tmhssin2h21lcre235vtolojh4g403ep.apps.googleusercontent.com".to_string()
}

fn default_client_secret() -> String {
    "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".to_string()
}

fn default_token_url() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

/// On-disk shape of the pool file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenFile {
    #[serde(default)]
    pub oauth_config: OauthConfig,

    #[serde(default)]
    pub projects: Vec<Project>,
}

/// Result of loading the pool from disk or environment.
#[derive(Debug, Clone)]
pub struct LoadedPool {
    pub oauth_config: OauthConfig,
    pub projects: Vec<Project>,
}

pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the pool, falling back to environment variables when the file is
    /// absent or unreadable. An empty pool is a warning, not an error: the
    /// process starts and requests fail until projects are configured.
    pub fn load(&self) -> LoadedPool {
        let mut loaded = match std::fs::read(&self.path) {
            Ok(bytes) => match serde_json::from_slice::<TokenFile>(&bytes) {
                Ok(file) => {
                    info!(
                        "Loaded {} projects from {}",
                        file.projects.len(),
                        self.path.display()
                    );
                    LoadedPool {
                        oauth_config: file.oauth_config,
                        projects: file.projects,
                    }
                }
                Err(err) => {
                    error!(
                        "Failed to parse {}: {err}; falling back to environment variables",
                        self.path.display()
                    );
                    self.load_from_env()
                }
            },
            Err(_) => {
                warn!(
                    "Token file {} not found, loading from environment variables",
                    self.path.display()
                );
                self.load_from_env()
            }
        };

        if loaded.projects.is_empty() {
            warn!("No projects configured! Service will start but API requests will fail.");
            warn!(
                "Please configure either {} or the PROJECTS environment variable.",
                self.path.display()
            );
        }

        for project in &mut loaded.projects {
            project.assign_session_id();
        }
        loaded
    }

    fn load_from_env(&self) -> LoadedPool {
        let mut oauth_config = OauthConfig::default();
        if let Ok(client_id) = std::env::var("OAUTH_CLIENT_ID") {
            oauth_config.client_id = client_id;
        }
        if let Ok(client_secret) = std::env::var("OAUTH_CLIENT_SECRET") {
            oauth_config.client_secret = client_secret;
        }
        if let Ok(token_url) = std::env::var("OAUTH_TOKEN_URL") {
            oauth_config.token_url = token_url;
        }

        let projects = match std::env::var("PROJECTS") {
            Ok(raw) => match serde_json::from_str::<Vec<Project>>(&raw) {
                Ok(projects) => projects,
                Err(err) => {
                    error!("PROJECTS is not a valid JSON project list: {err}");
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };

        let loaded = LoadedPool {
            oauth_config,
            projects,
        };

        if !loaded.projects.is_empty() {
            info!(
                "Loaded {} projects from environment variables",
                loaded.projects.len()
            );
            match self.save(&loaded.oauth_config, &loaded.projects) {
                Ok(()) => info!(
                    "Migrated configuration from environment variables to {}",
                    self.path.display()
                ),
                Err(err) => {
                    error!("Failed to migrate configuration to file: {err}");
                    warn!("Tokens will NOT be persisted - please check file permissions");
                }
            }
        }

        loaded
    }

    /// Whole-file write through a temp sibling and an atomic rename.
    pub fn save(&self, oauth_config: &OauthConfig, projects: &[Project]) -> std::io::Result<()> {
        let file = TokenFile {
            oauth_config: oauth_config.clone(),
            projects: projects.to_vec(),
        };
        let payload = serde_json::to_vec_pretty(&file)?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, payload)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}
