//! One-shot auth-retry semantics: a 401/403 forces a single token refresh
//! and one retry; a second auth failure permanently disables the project.

use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use chrono::Utc;
use serde_json::{Value, json};
use std::{
    collections::VecDeque,
    path::PathBuf,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::{SystemTime, UNIX_EPOCH},
};
use tokio::net::TcpListener;
use tower::ServiceExt;
use url::Url;

fn temp_dir(tag: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX_EPOCH")
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("vega-retry-{tag}-{}-{nanos}", std::process::id()));
    path
}

async fn spawn_test_server(app: Router) -> Url {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });

    Url::parse(&format!("http://{addr}")).expect("valid base url")
}

#[derive(Clone)]
struct StubState {
    /// Status codes the generate endpoint returns, in order.
    statuses: Arc<Mutex<VecDeque<u16>>>,
    refresh_hits: Arc<AtomicUsize>,
}

async fn token_handler(State(stub): State<StubState>) -> Json<Value> {
    stub.refresh_hits.fetch_add(1, Ordering::SeqCst);
    Json(json!({"access_token": "at-refreshed", "expires_in": 3600}))
}

async fn generate_handler(State(stub): State<StubState>) -> Response {
    let status = stub
        .statuses
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or(500);
    if status == 200 {
        return Json(json!({
            "response": {
                "candidates": [{
                    "content": {"role": "model", "parts": [{"text": "ok"}]},
                    "finishReason": "STOP"
                }]
            }
        }))
        .into_response();
    }
    (
        StatusCode::from_u16(status).unwrap(),
        Json(json!({"error": {"code": status}})),
    )
        .into_response()
}

/// Two projects so the pool survives a disable.
fn write_token_file(dir: &PathBuf, token_url: &Url) -> PathBuf {
    let path = dir.join("tokens.json");
    std::fs::create_dir_all(dir).unwrap();
    // Expired token: the first pick refreshes before calling upstream.
    let expired = Utc::now().timestamp() - 60;
    let payload = json!({
        "oauth_config": {
            "client_id": "cid",
            "client_secret": "cs",
            "token_url": token_url.join("/token").unwrap().as_str()
        },
        "projects": [
            {
                "project_id": "proj-a",
                "refresh_token": "rt-a",
                "access_token": "at-stale",
                "expires_at": expired,
                "enabled": true
            },
            {
                "project_id": "proj-b",
                "refresh_token": "rt-b",
                "access_token": "at-b",
                "expires_at": i64::MAX - 1,
                "enabled": true
            }
        ]
    });
    std::fs::write(&path, payload.to_string()).unwrap();
    path
}

struct Harness {
    status: StatusCode,
    stub: StubState,
    state: vega::server::router::GatewayState,
    data_file: PathBuf,
}

async fn run_chat(statuses: Vec<u16>) -> Harness {
    let stub = StubState {
        statuses: Arc::new(Mutex::new(statuses.into())),
        refresh_hits: Arc::new(AtomicUsize::new(0)),
    };
    let upstream = Router::new()
        .route("/v1internal:generateContent", post(generate_handler))
        .route("/token", post(token_handler))
        .with_state(stub.clone());
    let base = spawn_test_server(upstream).await;

    let dir = temp_dir("pool");
    let data_file = write_token_file(&dir, &base);
    let mut cfg = vega::config::Config::default();
    cfg.basic.api_keys = vec!["sk-test".to_string()];
    cfg.upstream.api_base_url = base.clone();
    cfg.pool.data_file = data_file.clone();
    cfg.images.dir = temp_dir("images");

    let state = vega::server::router::GatewayState::new(&cfg);
    let app = vega::server::router::gateway_router(state.clone());

    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/chat/completions")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, "Bearer sk-test")
                .body(Body::from(
                    r#"{"model": "gemini-2.5-flash", "messages": [{"role": "user", "content": "hi"}]}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    Harness {
        status: resp.status(),
        stub,
        state,
        data_file,
    }
}

#[tokio::test]
async fn auth_failure_then_success_recovers_without_disable() {
    let harness = run_chat(vec![401, 200]).await;

    assert_eq!(harness.status, StatusCode::OK);
    // One proactive refresh for the expired token; the mid-request forced
    // refresh coalesces on the already-fresh token.
    assert_eq!(harness.stub.refresh_hits.load(Ordering::SeqCst), 1);

    let snapshot = harness.state.manager.snapshot().await;
    assert!(snapshot.iter().all(|p| p.enabled));
}

#[tokio::test]
async fn repeated_auth_failure_disables_the_project() {
    let harness = run_chat(vec![401, 401]).await;

    assert_eq!(harness.status, StatusCode::UNAUTHORIZED);
    assert_eq!(harness.stub.refresh_hits.load(Ordering::SeqCst), 1);

    let snapshot = harness.state.manager.snapshot().await;
    let failed = snapshot.iter().find(|p| p.project_id == "proj-a").unwrap();
    assert!(!failed.enabled);
    assert!(
        failed
            .disabled_reason
            .as_deref()
            .unwrap()
            .contains("after token refresh")
    );

    // The next pick skips the disabled project.
    let lease = harness.state.manager.pick_next().await.unwrap();
    assert_eq!(lease.project_id, "proj-b");

    // The disable was persisted.
    let on_disk: Value =
        serde_json::from_str(&std::fs::read_to_string(&harness.data_file).unwrap()).unwrap();
    let persisted = on_disk["projects"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["project_id"] == "proj-a")
        .unwrap();
    assert_eq!(persisted["enabled"], false);
}

#[tokio::test]
async fn upstream_error_status_is_forwarded_after_retry_window() {
    let harness = run_chat(vec![503]).await;
    assert_eq!(harness.status, StatusCode::SERVICE_UNAVAILABLE);
}
