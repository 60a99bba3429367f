//! Bounded in-process [`EventBus`] that leases pulled events.
//!
//! Unlike [`InMemoryEventBus`](crate::memory::InMemoryEventBus), pulling
//! moves events out of the ready queue into a lease held until the event is
//! acknowledged, nacked, or the lease expires:
//!
//! - `publish` waits for free capacity, failing with
//!   [`EventBusError::PublishTimeout`] without enqueueing anything if none
//!   frees up in time.
//! - `pull` first returns expired leases to the front of the ready queue,
//!   then leases up to `batch_size` events. Every delivery carries a fresh
//!   UUIDv7 receipt in [`Event::id`]; any id set by the publisher is
//!   replaced.
//! - `acknowledge` drops the lease matching the receipt.
//! - `nacknowledge` puts the event back at the front of its ready queue.
//! - `exit` returns every lease to its ready queue and rejects further
//!   operations until the bus is entered again.
//!
//! Concurrent consumers of one environment never hold the same event at the
//! same time. A consumer that disappears mid-event (for example a cancelled
//! delivery loop) loses its lease once it expires, and the event is then
//! redelivered under a new receipt. Acks and nacks carrying the old receipt
//! fail with [`EventBusError::NotPending`] and leave the new lease alone.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;
use uuid::Uuid;

use crate::bus::EventBus;
use crate::error::EventBusError;
use crate::event::{Event, EventEnvironment};

/// Default upper bound on events held by the bus (ready plus leased).
pub const DEFAULT_CAPACITY: usize = 1024;

/// Default number of events leased per pull.
pub const DEFAULT_BATCH_SIZE: usize = 1;

/// Default time a consumer may hold an event before it is redelivered.
pub const DEFAULT_LEASE_DURATION: Duration = Duration::from_secs(30);

/// Tuning for [`LeaseEventBus`].
#[derive(Debug, Clone)]
pub struct LeaseConfig {
    /// Maximum number of events held, across all environments.
    pub capacity: usize,
    /// Maximum number of events returned by one pull.
    pub batch_size: usize,
    /// How long a pulled event stays reserved for its consumer.
    pub lease_duration: Duration,
}

impl Default for LeaseConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            batch_size: DEFAULT_BATCH_SIZE,
            lease_duration: DEFAULT_LEASE_DURATION,
        }
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Lease {
    event: Event,
    expires_at: Instant,
}

#[derive(Debug, Default)]
struct LeaseState {
    ready: HashMap<EventEnvironment, VecDeque<Event>>,
    /// Leased events keyed by delivery receipt.
    leased: HashMap<String, Lease>,
    closed: bool,
}

impl LeaseState {
    fn len(&self) -> usize {
        self.ready.values().map(VecDeque::len).sum::<usize>() + self.leased.len()
    }

    fn queue(&mut self, environment: EventEnvironment) -> &mut VecDeque<Event> {
        self.ready.entry(environment).or_default()
    }

    /// Move leases matching `expired` back to the front of their queues,
    /// oldest publish first. Returns how many were moved.
    fn return_leases(&mut self, expired: impl Fn(&Lease) -> bool) -> usize {
        let ids: Vec<String> = self
            .leased
            .iter()
            .filter(|(_, lease)| expired(lease))
            .map(|(id, _)| id.clone())
            .collect();

        let mut returned: Vec<Event> = ids
            .iter()
            .filter_map(|id| self.leased.remove(id))
            .map(|lease| lease.event)
            .collect();
        returned.sort_by_key(|event| event.published_at);

        let count = returned.len();
        for event in returned.into_iter().rev() {
            self.queue(event.environment).push_front(event);
        }
        count
    }

    /// Remove a ready event by the receipt of its last delivery.
    fn remove_ready(&mut self, environment: EventEnvironment, id: &str) -> Option<Event> {
        let queue = self.ready.get_mut(&environment)?;
        let index = queue
            .iter()
            .position(|event| event.id.as_deref() == Some(id))?;
        queue.remove(index)
    }
}

// ---------------------------------------------------------------------------
// LeaseEventBus
// ---------------------------------------------------------------------------

/// In-process event bus with leased delivery and bounded capacity.
#[derive(Debug, Default)]
pub struct LeaseEventBus {
    state: Mutex<LeaseState>,
    /// Signalled whenever capacity frees up or the bus closes.
    space: Notify,
    config: LeaseConfig,
}

impl LeaseEventBus {
    pub fn new(config: LeaseConfig) -> Self {
        Self {
            state: Mutex::default(),
            space: Notify::new(),
            config,
        }
    }

    /// Number of events waiting to be pulled for `environment`.
    pub fn ready(&self, environment: EventEnvironment) -> usize {
        self.state().ready.get(&environment).map_or(0, VecDeque::len)
    }

    /// Number of events currently leased to consumers.
    pub fn leased(&self) -> usize {
        self.state().leased.len()
    }

    /// Lock the state. No code path panics while holding the lock, so a
    /// poisoned mutex still holds consistent data.
    fn state(&self) -> MutexGuard<'_, LeaseState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wait until there is room, then enqueue `event`.
    async fn enqueue(&self, event: Event) -> Result<(), EventBusError> {
        loop {
            let notified = self.space.notified();
            tokio::pin!(notified);
            // Register before checking so a release between the check and
            // the await is not missed.
            notified.as_mut().enable();

            {
                let mut state = self.state();
                if state.closed {
                    return Err(EventBusError::Closed);
                }
                if state.len() < self.config.capacity {
                    state.queue(event.environment).push_back(event);
                    return Ok(());
                }
            }

            tracing::trace!(capacity = self.config.capacity, "Event bus full, waiting");
            notified.await;
        }
    }

    fn not_pending(event: &Event) -> EventBusError {
        EventBusError::NotPending {
            environment: event.environment,
            entity_id: event.entity_id.clone(),
        }
    }
}

impl EventBus for LeaseEventBus {
    /// Reopens a bus that was previously exited.
    async fn enter(&self) -> Result<(), EventBusError> {
        self.state().closed = false;
        Ok(())
    }

    fn exit(&self) {
        let returned = {
            let mut state = self.state();
            if state.closed {
                return;
            }
            state.closed = true;
            state.return_leases(|_| true)
        };
        self.space.notify_waiters();
        tracing::info!(returned, "Lease event bus closed");
    }

    async fn publish(&self, mut event: Event, timeout: Duration) -> Result<(), EventBusError> {
        // Ids are receipts issued on delivery.
        event.id = None;
        let environment = event.environment;
        let entity_id = event.entity_id.clone();

        match tokio::time::timeout(timeout, self.enqueue(event)).await {
            Ok(result) => {
                if result.is_ok() {
                    tracing::debug!(%environment, %entity_id, "Event published");
                }
                result
            }
            Err(_) => {
                tracing::warn!(
                    %environment,
                    %entity_id,
                    timeout_ms = timeout.as_millis() as u64,
                    "Event publish timed out"
                );
                Err(EventBusError::PublishTimeout { timeout })
            }
        }
    }

    async fn pull(&self, environment: EventEnvironment) -> Result<Vec<Event>, EventBusError> {
        let now = Instant::now();
        let mut state = self.state();
        if state.closed {
            return Err(EventBusError::Closed);
        }

        let expired = state
            .return_leases(|lease| lease.event.environment == environment && lease.expires_at <= now);
        if expired > 0 {
            tracing::debug!(%environment, expired, "Returned expired leases for redelivery");
        }

        let expires_at = now + self.config.lease_duration;
        let mut batch = Vec::new();
        while batch.len() < self.config.batch_size.max(1) {
            let Some(mut event) = state.queue(environment).pop_front() else {
                break;
            };
            let receipt = Uuid::now_v7().to_string();
            event.id = Some(receipt.clone());
            batch.push(event.clone());
            state.leased.insert(receipt, Lease { event, expires_at });
        }

        Ok(batch)
    }

    async fn acknowledge(&self, event: &Event) -> Result<(), EventBusError> {
        let id = event.id.as_deref().ok_or_else(|| Self::not_pending(event))?;
        {
            let mut state = self.state();
            if state.closed {
                return Err(EventBusError::Closed);
            }
            // A nacked or expired event waiting in the ready queue still
            // answers to its last receipt until it is leased again.
            let removed = state.leased.remove(id).is_some()
                || state.remove_ready(event.environment, id).is_some();
            if !removed {
                return Err(Self::not_pending(event));
            }
        }
        self.space.notify_waiters();
        Ok(())
    }

    async fn nacknowledge(&self, event: &Event) -> Result<(), EventBusError> {
        let id = event.id.as_deref().ok_or_else(|| Self::not_pending(event))?;
        let mut state = self.state();
        if state.closed {
            return Err(EventBusError::Closed);
        }

        match state.leased.remove(id) {
            Some(lease) => {
                state.queue(lease.event.environment).push_front(lease.event);
                Ok(())
            }
            // Already back in the ready queue under this receipt.
            None if state
                .ready
                .get(&event.environment)
                .is_some_and(|queue| queue.iter().any(|e| e.id.as_deref() == Some(id))) =>
            {
                Ok(())
            }
            None => Err(Self::not_pending(event)),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
