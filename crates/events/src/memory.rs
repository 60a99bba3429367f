//! Reference in-memory [`EventBus`] adapter.
//!
//! Keeps one ordered pending list per environment. Pulling is a peek: the
//! whole list is returned and nothing is removed, so a nack needs no work
//! and an event stays pending until it is acknowledged. Concurrent
//! consumers on one environment may therefore see the same event. Use
//! [`LeaseEventBus`](crate::lease::LeaseEventBus) when that matters.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::bus::EventBus;
use crate::error::EventBusError;
use crate::event::{Event, EventEnvironment};

/// In-process event bus for tests and development.
#[derive(Debug, Default)]
pub struct InMemoryEventBus {
    events: Mutex<HashMap<EventEnvironment, Vec<Event>>>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events still pending for `environment`.
    pub async fn pending(&self, environment: EventEnvironment) -> usize {
        self.events
            .lock()
            .await
            .get(&environment)
            .map_or(0, Vec::len)
    }
}

impl EventBus for InMemoryEventBus {
    /// Appends immediately; there is no boundary that could time out.
    async fn publish(&self, event: Event, _timeout: Duration) -> Result<(), EventBusError> {
        tracing::debug!(
            environment = %event.environment,
            entity_id = %event.entity_id,
            "Event published"
        );
        self.events
            .lock()
            .await
            .entry(event.environment)
            .or_default()
            .push(event);
        Ok(())
    }

    async fn pull(&self, environment: EventEnvironment) -> Result<Vec<Event>, EventBusError> {
        Ok(self
            .events
            .lock()
            .await
            .get(&environment)
            .cloned()
            .unwrap_or_default())
    }

    /// Removes the first pending event equal to `event`.
    async fn acknowledge(&self, event: &Event) -> Result<(), EventBusError> {
        let mut events = self.events.lock().await;
        let queue = events.entry(event.environment).or_default();

        match queue.iter().position(|pending| pending == event) {
            Some(index) => {
                queue.remove(index);
                Ok(())
            }
            None => Err(EventBusError::NotPending {
                environment: event.environment,
                entity_id: event.entity_id.clone(),
            }),
        }
    }

    /// No-op: pulled events were never removed.
    async fn nacknowledge(&self, _event: &Event) -> Result<(), EventBusError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
