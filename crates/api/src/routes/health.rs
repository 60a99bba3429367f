use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
}

/// Service description payload.
#[derive(Serialize)]
pub struct AboutResponse {
    pub name: &'static str,
    pub version: &'static str,
    /// Environment events are published to and consumed from.
    pub environment: String,
    /// Active event bus adapter.
    pub event_bus: String,
}

/// GET /health -- liveness probe.
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// GET /about -- service name, version and event bus wiring.
async fn about(State(state): State<AppState>) -> Json<AboutResponse> {
    Json(AboutResponse {
        name: "courier",
        version: env!("CARGO_PKG_VERSION"),
        environment: state.config.events.environment.to_string(),
        event_bus: state.event_bus.backend().to_string(),
    })
}

/// Mount health and about routes (intended for root-level, NOT under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/about", get(about))
}
