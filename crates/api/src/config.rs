use axum::http::HeaderValue;
use courier_core::config::{env_list, env_or};
use courier_core::error::CoreError;
use courier_events::EventBusConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<HeaderValue>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for background tasks, in seconds (default: `10`).
    pub shutdown_timeout_secs: u64,
    /// Delay before the event consumer restarts after a failure (default: `5`).
    pub consumer_restart_delay_secs: u64,
    /// Event bus settings.
    pub events: EventBusConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Default                    |
    /// |-------------------------------|----------------------------|
    /// | `HOST`                        | `0.0.0.0`                  |
    /// | `PORT`                        | `3000`                     |
    /// | `CORS_ORIGINS`                | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`        | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`       | `10`                       |
    /// | `CONSUMER_RESTART_DELAY_SECS` | `5`                        |
    ///
    /// Event bus variables are documented on [`EventBusConfig::from_env`].
    pub fn from_env() -> Result<Self, CoreError> {
        let host = env_or("HOST", "0.0.0.0".to_string())?;
        let port: u16 = env_or("PORT", 3000)?;

        let cors_origins = parse_origins(&env_list("CORS_ORIGINS", "http://localhost:5173"))?;

        let request_timeout_secs: u64 = env_or("REQUEST_TIMEOUT_SECS", 30)?;
        let shutdown_timeout_secs: u64 = env_or("SHUTDOWN_TIMEOUT_SECS", 10)?;
        let consumer_restart_delay_secs: u64 = env_or("CONSUMER_RESTART_DELAY_SECS", 5)?;

        let events = EventBusConfig::from_env()?;

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            consumer_restart_delay_secs,
            events,
        })
    }
}

/// Validate CORS origins up front so a typo fails at startup, not on the
/// first cross-origin request.
pub fn parse_origins(origins: &[String]) -> Result<Vec<HeaderValue>, CoreError> {
    origins
        .iter()
        .map(|origin| {
            origin.parse::<HeaderValue>().map_err(|e| CoreError::Config {
                key: "CORS_ORIGINS",
                message: format!("'{origin}': {e}"),
            })
        })
        .collect()
}
