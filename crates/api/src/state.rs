use std::sync::Arc;

use courier_events::AnyEventBus;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Event bus handlers publish to. Entered by `main` for the lifetime of
    /// the server.
    pub event_bus: Arc<AnyEventBus>,
}
