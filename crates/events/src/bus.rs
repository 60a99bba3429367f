//! The [`EventBus`] transport capability and scoped session guard.
//!
//! Every transport (in-memory, leased, or a future external broker)
//! implements the four primitives on [`EventBus`]. The delivery loop in
//! [`crate::delivery`] is written once against this trait and never against
//! a concrete adapter.

use std::future::Future;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

use crate::error::EventBusError;
use crate::event::{Event, EventEnvironment};

/// Publish deadline used when the caller has no better value.
pub const DEFAULT_PUBLISH_TIMEOUT: Duration = Duration::from_secs(3);

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Transport contract for at-least-once event delivery.
///
/// Implementations must deliver every published event until it is
/// acknowledged, and keep an un-acknowledged event eligible for a later
/// [`pull`](EventBus::pull). No method may block the calling thread
/// indefinitely.
pub trait EventBus: Send + Sync {
    /// Acquire transport resources. Called once per [`BusSession`].
    fn enter(&self) -> impl Future<Output = Result<(), EventBusError>> + Send {
        async { Ok(()) }
    }

    /// Release transport resources.
    ///
    /// Runs from [`BusSession`]'s `Drop`, so it must not block and cannot
    /// fail.
    fn exit(&self) {}

    /// Make `event` visible to future pulls for `event.environment`.
    ///
    /// Must finish within `timeout`, otherwise fails with
    /// [`EventBusError::PublishTimeout`].
    fn publish(
        &self,
        event: Event,
        timeout: Duration,
    ) -> impl Future<Output = Result<(), EventBusError>> + Send;

    /// Return a bounded batch of pending events for `environment`.
    ///
    /// Returns an empty vec instead of waiting when nothing is pending.
    fn pull(
        &self,
        environment: EventEnvironment,
    ) -> impl Future<Output = Result<Vec<Event>, EventBusError>> + Send;

    /// Mark `event` as handled so it is never delivered again.
    fn acknowledge(&self, event: &Event) -> impl Future<Output = Result<(), EventBusError>> + Send;

    /// Mark `event` as not handled. Redelivery policy is transport-defined.
    fn nacknowledge(
        &self,
        event: &Event,
    ) -> impl Future<Output = Result<(), EventBusError>> + Send;
}

impl<T: EventBus> EventBus for Arc<T> {
    fn enter(&self) -> impl Future<Output = Result<(), EventBusError>> + Send {
        (**self).enter()
    }

    fn exit(&self) {
        (**self).exit()
    }

    fn publish(
        &self,
        event: Event,
        timeout: Duration,
    ) -> impl Future<Output = Result<(), EventBusError>> + Send {
        (**self).publish(event, timeout)
    }

    fn pull(
        &self,
        environment: EventEnvironment,
    ) -> impl Future<Output = Result<Vec<Event>, EventBusError>> + Send {
        (**self).pull(environment)
    }

    fn acknowledge(&self, event: &Event) -> impl Future<Output = Result<(), EventBusError>> + Send {
        (**self).acknowledge(event)
    }

    fn nacknowledge(
        &self,
        event: &Event,
    ) -> impl Future<Output = Result<(), EventBusError>> + Send {
        (**self).nacknowledge(event)
    }
}

// ---------------------------------------------------------------------------
// BusSession
// ---------------------------------------------------------------------------

/// Scoped handle on an entered [`EventBus`].
///
/// [`EventBus::exit`] runs exactly once: on [`close`](BusSession::close) or
/// when the session is dropped, including during unwinding and when the
/// owning future is cancelled.
///
/// ```rust
/// use courier_events::{BusSession, InMemoryEventBus};
///
/// # async fn demo() -> Result<(), courier_events::EventBusError> {
/// let session = BusSession::enter(InMemoryEventBus::new()).await?;
/// // publish / receive through `session` ...
/// session.close();
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct BusSession<B: EventBus> {
    bus: B,
    exited: bool,
}

impl<B: EventBus> BusSession<B> {
    /// Enter `bus`. If entering fails the bus is not exited.
    pub async fn enter(bus: B) -> Result<Self, EventBusError> {
        bus.enter().await?;
        tracing::debug!("Event bus session opened");
        Ok(Self { bus, exited: false })
    }

    /// The underlying bus.
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Exit the bus now instead of waiting for drop.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.exited {
            self.exited = true;
            self.bus.exit();
            tracing::debug!("Event bus session closed");
        }
    }
}

impl<B: EventBus> Deref for BusSession<B> {
    type Target = B;

    fn deref(&self) -> &B {
        &self.bus
    }
}

impl<B: EventBus> Drop for BusSession<B> {
    fn drop(&mut self) {
        self.release();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
