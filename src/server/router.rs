use crate::config::Config;
use crate::convert::ScratchCaches;
use crate::images::ImageStore;
use crate::pool::{TokenManager, TokenStore};
use crate::server::guards::auth::{ApiKeySet, RequireGeminiKeyAuth, RequireKeyAuth};
use crate::server::routes::{chat, gemini, models};
use crate::upstream::AntigravityClient;

use axum::{
    Json, Router,
    extract::Request,
    http::{HeaderName, StatusCode, Version, header::USER_AGENT},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use base64::Engine as _;
use rand::RngCore;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::services::ServeDir;
use tracing::{error, info, warn};

const MAX_REQUEST_ID_LEN: usize = 128;
const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

fn generate_request_id() -> String {
    // 96 bits => 16 chars base64url (no padding).
    let mut bytes = [0u8; 12];
    rand::rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

fn format_http_version(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_11 => "HTTP/1.1",
        Version::HTTP_2 => "HTTP/2",
        Version::HTTP_3 => "HTTP/3",
        _ => "HTTP/?",
    }
}

#[derive(Clone)]
pub struct GatewayState {
    pub manager: Arc<TokenManager>,
    pub upstream: Arc<AntigravityClient>,
    pub caches: Arc<ScratchCaches>,
    pub images: Arc<ImageStore>,
    pub api_keys: Arc<ApiKeySet>,
    pub heartbeat: Duration,
}

impl GatewayState {
    /// Wire up the full state from configuration: load the pool, build the
    /// upstream client, and size the caches/stores.
    pub fn new(cfg: &Config) -> Self {
        let store = TokenStore::new(cfg.pool.data_file.clone());
        let loaded = store.load();
        let manager = TokenManager::new(store, loaded, cfg.pool.rotation_count);

        let image_base_url = cfg
            .images
            .base_url
            .as_ref()
            .map_or_else(
                || {
                    format!(
                        "http://{}:{}",
                        cfg.basic.listen_addr, cfg.basic.listen_port
                    )
                },
                |url| url.as_str().trim_end_matches('/').to_string(),
            );

        let heartbeat = if cfg.images.heartbeat_secs > 0.0 {
            Duration::from_secs_f64(cfg.images.heartbeat_secs)
        } else {
            Duration::from_secs(15)
        };

        Self {
            manager: Arc::new(manager),
            upstream: Arc::new(AntigravityClient::new(&cfg.upstream.api_base_url)),
            caches: Arc::new(ScratchCaches::default()),
            images: Arc::new(ImageStore::new(
                cfg.images.dir.clone(),
                cfg.images.max_images,
                image_base_url,
            )),
            api_keys: Arc::new(ApiKeySet::new(cfg.basic.api_keys.clone())),
            heartbeat,
        }
    }
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({"status": "ok", "service": "vega-gateway"}))
}

async fn not_found_handler() -> StatusCode {
    StatusCode::NOT_FOUND
}

async fn access_log(req: Request, next: Next) -> Response {
    // Capture request metadata before moving `req` into the handler stack.
    let method = req.method().clone();
    let uri = req.uri().clone();
    let version = req.version();

    let request_id = req
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty() && v.len() <= MAX_REQUEST_ID_LEN)
        .map(str::to_string)
        .unwrap_or_else(generate_request_id);

    let user_agent = req
        .headers()
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();

    let start = Instant::now();
    let mut resp = next.run(req).await;

    // Always reflect `x-request-id` for easier correlation, even if the
    // client didn't send one.
    if let Ok(value) = axum::http::HeaderValue::from_str(&request_id) {
        resp.headers_mut().insert(X_REQUEST_ID, value);
    }

    let status = resp.status();
    let latency_ms = start.elapsed().as_millis() as u64;
    let path = uri.path();
    let protocol = format_http_version(version);

    // Note: for SSE responses, `latency_ms` is time-to-first-byte (handler
    // return), not the full stream duration.
    if status.is_server_error() {
        error!(
            "| {:>3} | {} | {:^7} | {:<8} | {} | {}ms | {}",
            status.as_u16(),
            request_id,
            method.as_str(),
            protocol,
            path,
            latency_ms,
            user_agent
        );
    } else if status.is_client_error() {
        warn!(
            "| {:>3} | {} | {:^7} | {:<8} | {} | {}ms | {}",
            status.as_u16(),
            request_id,
            method.as_str(),
            protocol,
            path,
            latency_ms,
            user_agent
        );
    } else {
        info!(
            "| {:>3} | {} | {:^7} | {:<8} | {} | {}ms | {}",
            status.as_u16(),
            request_id,
            method.as_str(),
            protocol,
            path,
            latency_ms,
            user_agent
        );
    }

    resp
}

pub fn gateway_router(state: GatewayState) -> Router {
    let openai = Router::new()
        .route("/v1/chat/completions", post(chat::chat_completions))
        .route("/v1/models", get(models::list_models))
        .layer(middleware::from_extractor_with_state::<RequireKeyAuth, _>(
            state.clone(),
        ));

    let gemini = Router::new()
        .route("/v1/models/{*path}", post(gemini::gemini_proxy))
        .route("/v1beta/models/{*path}", post(gemini::gemini_proxy))
        .layer(
            middleware::from_extractor_with_state::<RequireGeminiKeyAuth, _>(state.clone()),
        );

    Router::new()
        .route("/health", get(health_handler))
        .nest_service("/images", ServeDir::new(state.images.dir()))
        .merge(openai)
        .merge(gemini)
        .fallback(not_found_handler)
        .with_state(state)
        .layer(middleware::from_fn(access_log))
}
