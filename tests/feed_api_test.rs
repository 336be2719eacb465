use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value as JsonValue;
use teleblog_backend::{
    config::{Config, DataSource},
    database::{memory::MemoryStore, Backend},
    routes, AppState,
};
use tower::ServiceExt;

fn demo_config() -> Arc<Config> {
    Arc::new(Config {
        server_address: "127.0.0.1:0".into(),
        data_source: DataSource::Demo,
        database_url: None,
        jwt_secret: "test_secret_key".into(),
        telegram_bot_token: "123:ABC".into(),
        telegram_webhook_secret: None,
        telegram_set_webhook: false,
        webapp_url: "https://blog.example.com".into(),
        init_data_max_age_secs: None,
        static_dir: None,
    })
}

fn app_with(backend: Backend) -> Router {
    routes::router(AppState::new(demo_config(), backend).expect("app state"))
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, JsonValue) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn feed_lists_newest_posts_first() {
    let backend = Backend::demo(Arc::new(MemoryStore::seeded()));
    backend.initialize().await;
    let app = app_with(backend);

    let (status, body) = get_json(&app, "/api/posts").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert_eq!(body["items"][0]["title"], "Welcome to TeleBlog Lite");

    let (status, body) = get_json(&app, "/api/posts?limit=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
}

#[tokio::test]
async fn empty_store_yields_empty_feed() {
    let backend = Backend::demo(Arc::new(MemoryStore::new()));
    backend.initialize().await;
    let app = app_with(backend);

    let (status, body) = get_json(&app, "/api/posts").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0);
    assert!(body["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn health_reflects_store_initialization() {
    let backend = Backend::demo(Arc::new(MemoryStore::seeded()));
    let app = app_with(backend.clone());

    let (status, body) = get_json(&app, "/health").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["store"]["state"], "uninitialized");

    backend.initialize().await;
    let (status, body) = get_json(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["data_source"], "demo");
    assert_eq!(body["store"]["state"], "ready");
}
