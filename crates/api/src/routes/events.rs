use axum::routing::post;
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Event publishing routes.
pub fn router() -> Router<AppState> {
    Router::new().route("/events", post(handlers::events::publish))
}
