//! Project selection and token lifecycle.
//!
//! Selection is round-robin with a per-project usage quota; refresh is
//! coalesced under a dedicated mutex with a double-check so concurrent
//! requests on one expired project hit the OAuth endpoint once. A project
//! that keeps failing auth after a refresh is disabled for the rest of the
//! process lifetime.

use crate::error::GatewayError;
use crate::pool::{LoadedPool, OauthConfig, Project, TokenStore, refresh_access_token};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// Snapshot handed to the request path: enough to address the upstream and
/// scope the signature caches, without borrowing pool state.
#[derive(Debug, Clone)]
pub struct ProjectLease {
    pub project_id: String,
    pub session_id: String,
}

struct PoolState {
    projects: Vec<Project>,
    current_index: usize,
    current_usage_count: u32,
}

pub struct TokenManager {
    store: TokenStore,
    oauth: OauthConfig,
    rotation_count: u32,
    http: reqwest::Client,
    state: Mutex<PoolState>,
    refresh_lock: Mutex<()>,
}

impl TokenManager {
    pub fn new(store: TokenStore, loaded: LoadedPool, rotation_count: u32) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .expect("failed to build reqwest client for token refresh");

        Self {
            store,
            oauth: loaded.oauth_config,
            rotation_count: rotation_count.max(1),
            http,
            state: Mutex::new(PoolState {
                projects: loaded.projects,
                current_index: 0,
                current_usage_count: 0,
            }),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Round-robin pick over enabled projects, advancing the cursor after
    /// `rotation_count` uses.
    pub async fn pick_next(&self) -> Result<ProjectLease, GatewayError> {
        let mut state = self.state.lock().await;

        if state.projects.is_empty() {
            return Err(GatewayError::NoProjectsConfigured);
        }
        if !state.projects.iter().any(|p| p.enabled) {
            return Err(GatewayError::AllProjectsDisabled);
        }

        let len = state.projects.len();
        if state.current_usage_count >= self.rotation_count {
            state.current_usage_count = 0;
            for _ in 0..len {
                state.current_index = (state.current_index + 1) % len;
                if state.projects[state.current_index].enabled {
                    break;
                }
            }
        }

        // The cursor may still sit on a disabled project after a disable.
        for _ in 0..len {
            if state.projects[state.current_index].enabled {
                break;
            }
            state.current_index = (state.current_index + 1) % len;
        }

        state.current_usage_count += 1;
        let index = state.current_index;
        let project = &state.projects[index];
        info!(
            "[Round Robin] using project [{}/{}]: {} (usage: {}/{})",
            index + 1,
            len,
            project.project_id,
            state.current_usage_count,
            self.rotation_count
        );

        Ok(ProjectLease {
            project_id: project.project_id.clone(),
            session_id: project.session_id.clone(),
        })
    }

    /// Return a valid access token for the project, refreshing it first when
    /// missing or near expiry.
    pub async fn get_access_token(&self, project_id: &str) -> Result<String, GatewayError> {
        {
            let state = self.state.lock().await;
            let project = find_project(&state.projects, project_id)?;
            if !project.needs_refresh() {
                if let Some(token) = project.access_token.clone() {
                    return Ok(token);
                }
            }
        }
        self.refresh(project_id).await
    }

    /// Force a refresh after an upstream 401/403, skipping the freshness
    /// fast path. Concurrent callers still coalesce on the refresh mutex.
    pub async fn handle_auth_error(&self, project_id: &str) -> Result<String, GatewayError> {
        warn!("Auth error for {project_id}, forcing token refresh");
        self.refresh(project_id).await
    }

    /// Permanently disable a project for this process and persist the flag.
    pub async fn disable(&self, project_id: &str, reason: &str) {
        let mut state = self.state.lock().await;
        let Ok(project) = find_project_mut(&mut state.projects, project_id) else {
            return;
        };
        project.enabled = false;
        project.disabled_reason = Some(reason.to_string());
        error!("Disabled project {project_id}: {reason}");
        self.persist(&state.projects);
    }

    /// Current pool contents; used by tests and admin surfaces.
    pub async fn snapshot(&self) -> Vec<Project> {
        self.state.lock().await.projects.clone()
    }

    async fn refresh(&self, project_id: &str) -> Result<String, GatewayError> {
        let _guard = self.refresh_lock.lock().await;

        // Double-check under the refresh mutex: another request may have
        // refreshed this project while we waited.
        let refresh_token = {
            let state = self.state.lock().await;
            let project = find_project(&state.projects, project_id)?;
            if !project.needs_refresh() {
                if let Some(token) = project.access_token.clone() {
                    info!("Token for {project_id} already refreshed by another request");
                    return Ok(token);
                }
            }
            project.refresh_token.clone()
        };

        info!("Refreshing access token for project: {project_id}");
        let (access_token, expires_at) =
            refresh_access_token(&self.http, &self.oauth, &refresh_token).await?;

        let mut state = self.state.lock().await;
        let project = find_project_mut(&mut state.projects, project_id)?;
        project.access_token = Some(access_token.clone());
        project.expires_at = Some(expires_at);
        self.persist(&state.projects);

        info!("Successfully refreshed token for {project_id}");
        Ok(access_token)
    }

    fn persist(&self, projects: &[Project]) {
        if let Err(err) = self.store.save(&self.oauth, projects) {
            error!(
                "Failed to save tokens to {}: {err}",
                self.store.path().display()
            );
        }
    }
}

fn find_project<'a>(
    projects: &'a [Project],
    project_id: &str,
) -> Result<&'a Project, GatewayError> {
    projects
        .iter()
        .find(|p| p.project_id == project_id)
        .ok_or_else(|| GatewayError::UnknownProject(project_id.to_string()))
}

fn find_project_mut<'a>(
    projects: &'a mut [Project],
    project_id: &str,
) -> Result<&'a mut Project, GatewayError> {
    projects
        .iter_mut()
        .find(|p| p.project_id == project_id)
        .ok_or_else(|| GatewayError::UnknownProject(project_id.to_string()))
}
