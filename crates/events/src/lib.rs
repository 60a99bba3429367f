//! Courier event bus and delivery infrastructure.
//!
//! This crate provides the building blocks for at-least-once event
//! delivery:
//!
//! - [`Event`]: the immutable domain event value.
//! - [`EventBus`]: the transport capability (publish, pull, ack, nack)
//!   every adapter implements, plus [`BusSession`] for scoped acquisition.
//! - [`receive_events`] / [`DeliveryLoop`]: the transport-independent
//!   delivery loop that drives a handler against any [`EventBus`].
//! - [`InMemoryEventBus`]: reference adapter with peek semantics.
//! - [`LeaseEventBus`]: bounded adapter that leases pulled events to a
//!   single consumer.
//! - [`AnyEventBus`]: adapter chosen at runtime from [`EventBusConfig`].

pub mod backend;
pub mod bus;
pub mod config;
pub mod delivery;
pub mod error;
pub mod event;
pub mod lease;
pub mod memory;

pub use backend::AnyEventBus;
pub use bus::{BusSession, EventBus, DEFAULT_PUBLISH_TIMEOUT};
pub use config::{EventBusBackend, EventBusConfig};
pub use delivery::{receive_events, DeliveryConfig, DeliveryLoop, Disposition, HandlerOutcome};
pub use error::{BoxError, DeliveryError, EventBusError, InvalidOutcome};
pub use event::{Event, EventEntityType, EventEnvironment, EventMessageType, EventOriginDomain};
pub use lease::{LeaseConfig, LeaseEventBus};
pub use memory::InMemoryEventBus;
