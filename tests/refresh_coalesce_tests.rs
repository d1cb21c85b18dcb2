//! Concurrent refreshes for one expired project must coalesce: the OAuth
//! endpoint is hit exactly once.

use axum::{Json, Router, extract::State, routing::post};
use chrono::Utc;
use futures::future::join_all;
use serde_json::{Value, json};
use std::{
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use tokio::net::TcpListener;
use url::Url;
use vega::pool::{LoadedPool, OauthConfig, Project, TokenManager, TokenStore};

fn temp_data_file(tag: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX_EPOCH")
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("vega-coalesce-{tag}-{}-{nanos}", std::process::id()));
    path.push("tokens.json");
    path
}

#[derive(Clone, Default)]
struct TokenStub {
    hits: Arc<AtomicUsize>,
}

async fn token_handler(State(stub): State<TokenStub>) -> Json<Value> {
    stub.hits.fetch_add(1, Ordering::SeqCst);
    // Hold the response briefly so concurrent callers really overlap.
    tokio::time::sleep(Duration::from_millis(50)).await;
    Json(json!({"access_token": "at-coalesced", "expires_in": 3600}))
}

async fn spawn_token_server(stub: TokenStub) -> Url {
    let app = Router::new()
        .route("/token", post(token_handler))
        .with_state(stub);
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });
    Url::parse(&format!("http://{addr}")).expect("valid base url")
}

fn expired_project() -> Project {
    Project {
        project_id: "proj-a".to_string(),
        refresh_token: "rt-a".to_string(),
        access_token: Some("at-stale".to_string()),
        expires_at: Some(Utc::now().timestamp() - 60),
        enabled: true,
        disabled_reason: None,
        session_id: "-1".to_string(),
    }
}

#[tokio::test]
async fn concurrent_refreshes_hit_the_endpoint_once() {
    let stub = TokenStub::default();
    let base = spawn_token_server(stub.clone()).await;

    let manager = Arc::new(TokenManager::new(
        TokenStore::new(temp_data_file("once")),
        LoadedPool {
            oauth_config: OauthConfig {
                client_id: "cid".to_string(),
                client_secret: "cs".to_string(),
                token_url: base.join("/token").unwrap().to_string(),
            },
            projects: vec![expired_project()],
        },
        1,
    ));

    let calls = (0..8).map(|_| {
        let manager = manager.clone();
        async move { manager.get_access_token("proj-a").await }
    });
    let tokens = join_all(calls).await;

    for token in tokens {
        assert_eq!(token.unwrap(), "at-coalesced");
    }
    assert_eq!(stub.hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn fresh_token_skips_the_endpoint_entirely() {
    let stub = TokenStub::default();
    let base = spawn_token_server(stub.clone()).await;

    let mut project = expired_project();
    project.access_token = Some("at-live".to_string());
    project.expires_at = Some(Utc::now().timestamp() + 3600);

    let manager = TokenManager::new(
        TokenStore::new(temp_data_file("fresh")),
        LoadedPool {
            oauth_config: OauthConfig {
                client_id: "cid".to_string(),
                client_secret: "cs".to_string(),
                token_url: base.join("/token").unwrap().to_string(),
            },
            projects: vec![project],
        },
        1,
    );

    let token = manager.get_access_token("proj-a").await.unwrap();
    assert_eq!(token, "at-live");
    assert_eq!(stub.hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn refresh_failure_surfaces_status_and_body() {
    let app = Router::new().route(
        "/token",
        post(|| async {
            (
                axum::http::StatusCode::BAD_REQUEST,
                Json(json!({"error": "invalid_grant"})),
            )
        }),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let manager = TokenManager::new(
        TokenStore::new(temp_data_file("fail")),
        LoadedPool {
            oauth_config: OauthConfig {
                client_id: "cid".to_string(),
                client_secret: "cs".to_string(),
                token_url: format!("http://{addr}/token"),
            },
            projects: vec![expired_project()],
        },
        1,
    );

    let err = manager.get_access_token("proj-a").await.unwrap_err();
    let message = err.to_string();
    assert!(message.contains("400"));
    assert!(message.contains("invalid_grant"));
}
