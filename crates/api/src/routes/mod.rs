pub mod events;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /events                                          publish (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().merge(events::router())
}
