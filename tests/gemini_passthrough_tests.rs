//! Native Gemini passthrough routes: no OpenAI conversion, envelope
//! wrapping on the way up, `{"response": ...}` unwrapping on the way down.

use axum::{
    Json, Router,
    body::{Body, to_bytes},
    extract::State,
    http::{Request, StatusCode, header},
    routing::post,
};
use serde_json::{Value, json};
use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
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
    path.push(format!("vega-passthrough-{tag}-{}-{nanos}", std::process::id()));
    path
}

#[derive(Clone, Default)]
struct UpstreamCapture {
    bodies: Arc<Mutex<Vec<Value>>>,
}

async fn generate_handler(
    State(capture): State<UpstreamCapture>,
    Json(body): Json<Value>,
) -> Json<Value> {
    capture.bodies.lock().unwrap().push(body);
    Json(json!({
        "response": {
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "native"}]},
                "finishReason": "STOP"
            }]
        }
    }))
}

async fn setup(tag: &str) -> (Router, UpstreamCapture) {
    let capture = UpstreamCapture::default();
    let upstream = Router::new()
        .route("/v1internal:generateContent", post(generate_handler))
        .with_state(capture.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, upstream).await.unwrap();
    });

    let pool_dir = temp_dir(tag);
    std::fs::create_dir_all(&pool_dir).unwrap();
    let data_file = pool_dir.join("tokens.json");
    std::fs::write(
        &data_file,
        json!({
            "oauth_config": {
                "client_id": "cid",
                "client_secret": "cs",
                "token_url": "http://127.0.0.1:9/token"
            },
            "projects": [{
                "project_id": "proj-a",
                "refresh_token": "rt-a",
                "access_token": "at-a",
                "expires_at": i64::MAX - 1,
                "enabled": true
            }]
        })
        .to_string(),
    )
    .unwrap();

    let mut cfg = vega::config::Config::default();
    cfg.basic.api_keys = vec!["sk-test".to_string()];
    cfg.upstream.api_base_url = Url::parse(&format!("http://{addr}")).unwrap();
    cfg.pool.data_file = data_file;
    cfg.images.dir = temp_dir(&format!("{tag}-images"));

    let state = vega::server::router::GatewayState::new(&cfg);
    (vega::server::router::gateway_router(state), capture)
}

fn gemini_request(uri: &str, headers: &[(&str, &str)]) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder
        .body(Body::from(
            r#"{"contents": [{"role": "user", "parts": [{"text": "hi"}]}]}"#,
        ))
        .unwrap()
}

#[tokio::test]
async fn passthrough_unwraps_response_and_wraps_envelope() {
    let (app, capture) = setup("basic").await;

    let resp = app
        .oneshot(gemini_request(
            "/v1beta/models/gemini-2.5-flash:generateContent",
            &[("x-goog-api-key", "sk-test")],
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    // Unwrapped: no {"response": ...} layer.
    assert!(body.get("response").is_none());
    assert_eq!(
        body["candidates"][0]["content"]["parts"][0]["text"],
        "native"
    );

    let seen = capture.bodies.lock().unwrap().clone();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0]["project"], "proj-a");
    assert_eq!(seen[0]["model"], "gemini-2.5-flash");
    assert_eq!(seen[0]["userAgent"], "antigravity");
    assert!(seen[0]["requestId"].as_str().unwrap().starts_with("agent-"));
    assert_eq!(
        seen[0]["request"]["contents"][0]["parts"][0]["text"],
        "hi"
    );
}

#[tokio::test]
async fn v1_alias_and_query_key_auth_work() {
    let (app, _capture) = setup("querykey").await;

    let resp = app
        .oneshot(gemini_request(
            "/v1/models/gemini-2.5-flash:generateContent?key=sk-test",
            &[],
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn bearer_auth_works_on_passthrough() {
    let (app, _capture) = setup("bearer").await;

    let resp = app
        .oneshot(gemini_request(
            "/v1beta/models/gemini-2.5-flash:generateContent",
            &[("authorization", "Bearer sk-test")],
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_key_is_rejected() {
    let (app, _capture) = setup("nokey").await;

    let resp = app
        .oneshot(gemini_request(
            "/v1beta/models/gemini-2.5-flash:generateContent",
            &[],
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_rpc_is_a_400() {
    let (app, _capture) = setup("badrpc").await;

    let resp = app
        .oneshot(gemini_request(
            "/v1beta/models/gemini-2.5-flash:countTokens",
            &[("x-goog-api-key", "sk-test")],
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
