//! Error types for event bus transports and the delivery loop.

use std::time::Duration;

use crate::event::EventEnvironment;

/// Boxed error returned by event handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

// ---------------------------------------------------------------------------
// EventBusError
// ---------------------------------------------------------------------------

/// Failures raised by an [`EventBus`](crate::bus::EventBus) transport.
#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    /// Publishing did not complete within the caller's deadline.
    ///
    /// Callers may retry. Both shipped adapters guarantee a timed-out
    /// publish left no trace on the bus.
    #[error("Publishing event timed out after {}ms", .timeout.as_millis())]
    PublishTimeout { timeout: Duration },

    /// The event is not pending on this bus (already acknowledged or never
    /// published).
    #[error("Event for entity {entity_id} is not pending in {environment}")]
    NotPending {
        environment: EventEnvironment,
        entity_id: String,
    },

    /// The bus has been exited and no longer accepts operations.
    #[error("Event bus is closed")]
    Closed,

    /// Any other transport-specific failure.
    #[error("Event transport error: {0}")]
    Transport(String),
}

// ---------------------------------------------------------------------------
// DeliveryError
// ---------------------------------------------------------------------------

/// A handler returned a value outside the accepted ack/nack/stop set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Event handler returned an unsupported value: {0}")]
pub struct InvalidOutcome(pub String);

/// Reasons a delivery loop terminates abnormally.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// The transport failed while pulling, acking or nacking.
    #[error(transparent)]
    Bus(#[from] EventBusError),

    /// The handler broke its return-value contract. The in-flight event was
    /// neither acked nor nacked.
    #[error(transparent)]
    InvalidOutcome(#[from] InvalidOutcome),

    /// The handler failed. The in-flight event was nacked before returning.
    #[error("Event handler failed: {0}")]
    Handler(#[source] BoxError),
}
