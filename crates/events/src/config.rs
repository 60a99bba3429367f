//! Event bus configuration loaded from environment variables.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use courier_core::config::env_or;
use courier_core::error::CoreError;

use crate::bus::DEFAULT_PUBLISH_TIMEOUT;
use crate::delivery::{DeliveryConfig, DEFAULT_POLL_INTERVAL};
use crate::event::EventEnvironment;
use crate::lease::{LeaseConfig, DEFAULT_BATCH_SIZE, DEFAULT_CAPACITY, DEFAULT_LEASE_DURATION};

/// Which [`EventBus`](crate::bus::EventBus) adapter to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventBusBackend {
    /// [`InMemoryEventBus`](crate::memory::InMemoryEventBus).
    Memory,
    /// [`LeaseEventBus`](crate::lease::LeaseEventBus).
    Lease,
}

impl fmt::Display for EventBusBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Memory => "memory",
            Self::Lease => "lease",
        })
    }
}

impl FromStr for EventBusBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "memory" => Ok(Self::Memory),
            "lease" => Ok(Self::Lease),
            other => Err(format!("unknown event bus backend '{other}', expected memory or lease")),
        }
    }
}

/// Event bus settings.
#[derive(Debug, Clone)]
pub struct EventBusConfig {
    /// Adapter to construct.
    pub backend: EventBusBackend,
    /// Environment this process publishes to and consumes from.
    pub environment: EventEnvironment,
    /// Pause between delivery loop cycles.
    pub poll_interval: Duration,
    /// Deadline applied to every publish.
    pub publish_timeout: Duration,
    /// Settings used when `backend` is [`EventBusBackend::Lease`].
    pub lease: LeaseConfig,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            backend: EventBusBackend::Memory,
            environment: EventEnvironment::Development,
            poll_interval: DEFAULT_POLL_INTERVAL,
            publish_timeout: DEFAULT_PUBLISH_TIMEOUT,
            lease: LeaseConfig::default(),
        }
    }
}

impl EventBusConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default       |
    /// |----------------------------|---------------|
    /// | `EVENT_BUS_BACKEND`        | `memory`      |
    /// | `EVENT_ENVIRONMENT`        | `development` |
    /// | `EVENT_POLL_INTERVAL_MS`   | `100`         |
    /// | `EVENT_PUBLISH_TIMEOUT_MS` | `3000`        |
    /// | `EVENT_LEASE_SECS`         | `30`          |
    /// | `EVENT_BATCH_SIZE`         | `1`           |
    /// | `EVENT_QUEUE_CAPACITY`     | `1024`        |
    pub fn from_env() -> Result<Self, CoreError> {
        let backend = env_or("EVENT_BUS_BACKEND", EventBusBackend::Memory)?;
        let environment = env_or("EVENT_ENVIRONMENT", EventEnvironment::Development)?;

        let poll_interval_ms: u64 =
            env_or("EVENT_POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL.as_millis() as u64)?;
        let publish_timeout_ms: u64 = env_or(
            "EVENT_PUBLISH_TIMEOUT_MS",
            DEFAULT_PUBLISH_TIMEOUT.as_millis() as u64,
        )?;
        let lease_secs: u64 = env_or("EVENT_LEASE_SECS", DEFAULT_LEASE_DURATION.as_secs())?;
        let batch_size: usize = env_or("EVENT_BATCH_SIZE", DEFAULT_BATCH_SIZE)?;
        let capacity: usize = env_or("EVENT_QUEUE_CAPACITY", DEFAULT_CAPACITY)?;

        if batch_size == 0 {
            return Err(CoreError::Config {
                key: "EVENT_BATCH_SIZE",
                message: "must be at least 1".into(),
            });
        }
        if capacity == 0 {
            return Err(CoreError::Config {
                key: "EVENT_QUEUE_CAPACITY",
                message: "must be at least 1".into(),
            });
        }

        Ok(Self {
            backend,
            environment,
            poll_interval: Duration::from_millis(poll_interval_ms),
            publish_timeout: Duration::from_millis(publish_timeout_ms),
            lease: LeaseConfig {
                capacity,
                batch_size,
                lease_duration: Duration::from_secs(lease_secs),
            },
        })
    }

    /// Delivery loop settings derived from this configuration.
    pub fn delivery(&self) -> DeliveryConfig {
        DeliveryConfig {
            poll_interval: self.poll_interval,
        }
    }
}
