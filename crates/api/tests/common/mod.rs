#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderValue, Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use courier_api::config::ServerConfig;
use courier_api::router::build_app_router;
use courier_api::state::AppState;
use courier_events::{AnyEventBus, EventBusConfig};

/// Build a test `ServerConfig` with safe defaults.
///
/// Uses `http://localhost:5173` as CORS origin (matching the dev default)
/// and a 30-second request timeout.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec![HeaderValue::from_static("http://localhost:5173")],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        consumer_restart_delay_secs: 1,
        events: EventBusConfig::default(),
    }
}

/// Build the full application router around `bus`.
pub fn build_test_app_with(config: ServerConfig, bus: Arc<AnyEventBus>) -> Router {
    build_app_router(AppState {
        config: Arc::new(config),
        event_bus: bus,
    })
}

/// Build the application with the default config and a fresh in-memory bus.
/// Returns the bus so tests can inspect what was published.
pub fn build_test_app() -> (Router, Arc<AnyEventBus>) {
    let config = test_config();
    let bus = Arc::new(AnyEventBus::from_config(&config.events));
    (build_test_app_with(config, Arc::clone(&bus)), bus)
}

/// Send a GET request.
pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Send a POST request with a JSON body.
pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
