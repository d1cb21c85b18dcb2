//! HTTP client for the internal generate-content endpoints.
//!
//! Every call follows the same auth-retry pattern: on a 401/403, force one
//! token refresh and re-issue exactly once; a second auth failure disables
//! the project. Transport-level send errors get a short backoff retry;
//! HTTP-level failures are surfaced, never retried here.

use crate::error::GatewayError;
use crate::pool::{ProjectLease, TokenManager};
use crate::upstream::UpstreamEndpoints;
use backon::{ExponentialBuilder, Retryable};
use reqwest::StatusCode;
use reqwest::header::{ACCEPT_ENCODING, HeaderMap, HeaderValue};
use serde::Serialize;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;
use vega_schema::antigravity::AntigravityRequestBody;
use vega_schema::gemini::{FetchModelsRequest, FetchModelsResponse};

/// Impersonates the Antigravity desktop client; the upstream rejects other
/// agents.
pub const UPSTREAM_USER_AGENT: &str = "antigravity/1.11.3 windows/amd64";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const IMAGE_GEN_TIMEOUT: Duration = Duration::from_secs(300);
pub const MODEL_LIST_TIMEOUT: Duration = Duration::from_secs(30);

static NETWORK_RETRY_POLICY: LazyLock<ExponentialBuilder> = LazyLock::new(|| {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(100))
        .with_max_delay(Duration::from_millis(300))
        .with_max_times(2)
        .with_jitter()
});

pub struct AntigravityClient {
    http: reqwest::Client,
    endpoints: UpstreamEndpoints,
}

impl AntigravityClient {
    pub fn new(base_url: &Url) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip"));

        let http = reqwest::Client::builder()
            .user_agent(UPSTREAM_USER_AGENT)
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(Duration::from_secs(10))
            .build()
            .expect("failed to build upstream reqwest client");

        Self {
            http,
            endpoints: UpstreamEndpoints::new(base_url),
        }
    }

    pub fn endpoints(&self) -> &UpstreamEndpoints {
        &self.endpoints
    }

    /// Send a converted envelope to the endpoint matching its shape.
    pub async fn send_generate(
        &self,
        manager: &TokenManager,
        lease: &ProjectLease,
        body: &AntigravityRequestBody,
        stream: bool,
    ) -> Result<reqwest::Response, GatewayError> {
        let image_gen = body.is_image_gen();
        let url = self.endpoints.select(stream && !image_gen);
        let timeout = if image_gen {
            IMAGE_GEN_TIMEOUT
        } else {
            REQUEST_TIMEOUT
        };
        self.post_with_auth_retry(manager, &lease.project_id, url, body, timeout)
            .await
    }

    /// Fetch the upstream model catalog through one project.
    pub async fn fetch_models(
        &self,
        manager: &TokenManager,
        lease: &ProjectLease,
    ) -> Result<FetchModelsResponse, GatewayError> {
        let body = FetchModelsRequest {
            project: lease.project_id.clone(),
        };
        let resp = self
            .post_with_auth_retry(
                manager,
                &lease.project_id,
                self.endpoints.models(),
                &body,
                MODEL_LIST_TIMEOUT,
            )
            .await?;
        Ok(resp.json::<FetchModelsResponse>().await?)
    }

    /// POST with bearer auth and the single-shot auth-failure retry.
    pub async fn post_with_auth_retry<T: Serialize + ?Sized>(
        &self,
        manager: &TokenManager,
        project_id: &str,
        url: &Url,
        body: &T,
        timeout: Duration,
    ) -> Result<reqwest::Response, GatewayError> {
        let token = manager.get_access_token(project_id).await?;
        let mut resp = self.post_once(url, &token, body, timeout).await?;

        if is_auth_failure(resp.status()) {
            warn!(
                "Auth error {} from upstream, refreshing token for {project_id}",
                resp.status()
            );
            let token = manager.handle_auth_error(project_id).await?;
            resp = self.post_once(url, &token, body, timeout).await?;

            if is_auth_failure(resp.status()) {
                let status = resp.status();
                manager
                    .disable(
                        project_id,
                        &format!("Auth failed after token refresh: {}", status.as_u16()),
                    )
                    .await;
                return Err(GatewayError::UpstreamAuth { status });
            }
            info!("Retry after token refresh succeeded for {project_id}");
        }

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(GatewayError::UpstreamStatus { status, body });
        }
        Ok(resp)
    }

    async fn post_once<T: Serialize + ?Sized>(
        &self,
        url: &Url,
        token: &str,
        body: &T,
        timeout: Duration,
    ) -> Result<reqwest::Response, GatewayError> {
        (|| async {
            self.http
                .post(url.clone())
                .bearer_auth(token)
                .timeout(timeout)
                .json(body)
                .send()
                .await
        })
        .retry(*NETWORK_RETRY_POLICY)
        .when(|err: &reqwest::Error| err.is_connect())
        .notify(|err, dur: Duration| {
            warn!("Upstream connect error {err}, retrying after {dur:?}");
        })
        .await
        .map_err(GatewayError::from_send_error)
    }
}

fn is_auth_failure(status: StatusCode) -> bool {
    matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
}
