use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use courier_core::error::CoreError;
use courier_events::EventBusError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and [`EventBusError`] for
/// transport failures. Implements [`IntoResponse`] to produce consistent
/// JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `courier_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The event bus rejected or could not complete an operation.
    #[error(transparent)]
    EventBus(#[from] EventBusError),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Config { .. } | CoreError::Internal(_) => {
                    tracing::error!(error = %core, "Internal core error");
                    internal()
                }
            },

            // --- Event bus errors ---
            AppError::EventBus(err) => classify_bus_error(err),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Classify an event bus error into an HTTP status, error code, and message.
///
/// - `PublishTimeout` maps to 504; the client may retry.
/// - `Closed` maps to 503 (the server is shutting down).
/// - `NotPending` maps to 409.
/// - Transport failures map to 502 with a sanitized message.
fn classify_bus_error(err: &EventBusError) -> (StatusCode, &'static str, String) {
    match err {
        EventBusError::PublishTimeout { .. } => {
            tracing::warn!(error = %err, "Event publish timed out");
            (StatusCode::GATEWAY_TIMEOUT, "PUBLISH_TIMEOUT", err.to_string())
        }
        EventBusError::Closed => (
            StatusCode::SERVICE_UNAVAILABLE,
            "EVENT_BUS_CLOSED",
            err.to_string(),
        ),
        EventBusError::NotPending { .. } => (StatusCode::CONFLICT, "NOT_PENDING", err.to_string()),
        EventBusError::Transport(_) => {
            tracing::error!(error = %err, "Event transport error");
            (
                StatusCode::BAD_GATEWAY,
                "EVENT_TRANSPORT_ERROR",
                "The event transport failed".to_string(),
            )
        }
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn validation_maps_to_400() {
        let err = AppError::Core(CoreError::Validation("entity_id must not be empty".into()));
        assert_eq!(status_of(err), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn publish_timeout_maps_to_504() {
        let err = AppError::EventBus(EventBusError::PublishTimeout {
            timeout: Duration::from_secs(3),
        });
        assert_eq!(status_of(err), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn closed_bus_maps_to_503() {
        assert_eq!(
            status_of(AppError::EventBus(EventBusError::Closed)),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn transport_error_maps_to_502() {
        let err = AppError::EventBus(EventBusError::Transport("socket closed".into()));
        assert_eq!(status_of(err), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn internal_core_error_maps_to_500() {
        let err = AppError::Core(CoreError::Internal("boom".into()));
        assert_eq!(status_of(err), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
