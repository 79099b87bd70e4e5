#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use querybank_api::config::ServerConfig;
use querybank_api::router::build_app_router;
use querybank_api::state::AppState;
use querybank_db::registry::TenantSettings;
use querybank_db::DatabaseRegistry;

/// Tenant names registered by [`build_test_app`]. Both point at the test pool.
pub const TENANTS: [&str; 2] = ["d1", "d2"];

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        expose_execution_details: true,
        tenants: TenantSettings {
            host: "localhost".to_string(),
            port: 5432,
            username: "postgres".to_string(),
            password: None,
            max_connections: 10,
            names: TENANTS.iter().map(|n| n.to_string()).collect(),
        },
    }
}

/// Build the full application router around the test pool, which serves as
/// both the template store and every tenant database.
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with(pool, test_config())
}

pub fn build_test_app_with(pool: PgPool, config: ServerConfig) -> Router {
    let tenants = TENANTS.iter().map(|n| (n.to_string(), pool.clone()))
        .collect::<Vec<_>>();
    let state = AppState {
        registry: Arc::new(DatabaseRegistry::new(pool, tenants)),
        config: Arc::new(config.clone()),
    };
    build_app_router(state, &config)
}

/// Base64-encode template text the way clients send it.
pub fn encode(text: &str) -> String {
    STANDARD.encode(text)
}

pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    send_json(app, Method::POST, uri, body).await
}

pub async fn put_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    send_json(app, Method::PUT, uri, body).await
}

async fn send_json(app: Router, method: Method, uri: &str, body: serde_json::Value) -> Response {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
