//! Runtime selection between the shipped [`EventBus`] adapters.

use std::time::Duration;

use crate::bus::EventBus;
use crate::config::{EventBusBackend, EventBusConfig};
use crate::error::EventBusError;
use crate::event::{Event, EventEnvironment};
use crate::lease::LeaseEventBus;
use crate::memory::InMemoryEventBus;

/// An adapter picked from [`EventBusConfig`], dispatching every call to
/// the variant it wraps.
#[derive(Debug)]
pub enum AnyEventBus {
    Memory(InMemoryEventBus),
    Lease(LeaseEventBus),
}

impl AnyEventBus {
    pub fn from_config(config: &EventBusConfig) -> Self {
        match config.backend {
            EventBusBackend::Memory => Self::Memory(InMemoryEventBus::new()),
            EventBusBackend::Lease => Self::Lease(LeaseEventBus::new(config.lease.clone())),
        }
    }

    pub fn backend(&self) -> EventBusBackend {
        match self {
            Self::Memory(_) => EventBusBackend::Memory,
            Self::Lease(_) => EventBusBackend::Lease,
        }
    }
}

impl EventBus for AnyEventBus {
    async fn enter(&self) -> Result<(), EventBusError> {
        match self {
            Self::Memory(bus) => bus.enter().await,
            Self::Lease(bus) => bus.enter().await,
        }
    }

    fn exit(&self) {
        match self {
            Self::Memory(bus) => bus.exit(),
            Self::Lease(bus) => bus.exit(),
        }
    }

    async fn publish(&self, event: Event, timeout: Duration) -> Result<(), EventBusError> {
        match self {
            Self::Memory(bus) => bus.publish(event, timeout).await,
            Self::Lease(bus) => bus.publish(event, timeout).await,
        }
    }

    async fn pull(&self, environment: EventEnvironment) -> Result<Vec<Event>, EventBusError> {
        match self {
            Self::Memory(bus) => bus.pull(environment).await,
            Self::Lease(bus) => bus.pull(environment).await,
        }
    }

    async fn acknowledge(&self, event: &Event) -> Result<(), EventBusError> {
        match self {
            Self::Memory(bus) => bus.acknowledge(event).await,
            Self::Lease(bus) => bus.acknowledge(event).await,
        }
    }

    async fn nacknowledge(&self, event: &Event) -> Result<(), EventBusError> {
        match self {
            Self::Memory(bus) => bus.nacknowledge(event).await,
            Self::Lease(bus) => bus.nacknowledge(event).await,
        }
    }
}
