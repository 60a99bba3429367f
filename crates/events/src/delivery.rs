//! Transport-independent delivery loop.
//!
//! [`DeliveryLoop::run`] (and the [`receive_events`] shorthand) repeatedly
//! pulls events for one environment, hands each to a caller-supplied
//! handler, and acknowledges or negatively acknowledges it based on the
//! handler's [`Disposition`]:
//!
//! | Handler result                 | Bus action    | Loop          |
//! |--------------------------------|---------------|---------------|
//! | `Ok(Ack)` / `Ok(())` / `Ok(true)` | acknowledge | continue      |
//! | `Ok(Nack)` / `Ok(false)`       | nacknowledge  | continue      |
//! | `Ok(Stop { ack })`             | ack or nack   | return `Ok`   |
//! | `Ok(<unsupported value>)`      | none          | `InvalidOutcome` |
//! | `Err(e)`                       | nacknowledge  | `Handler(e)`  |
//!
//! Delivery is at least once: a loop that fails or is cancelled can simply
//! be started again and resumes from whatever the transport still holds.

use std::future::Future;
use std::time::Duration;

use crate::bus::EventBus;
use crate::error::{BoxError, DeliveryError, InvalidOutcome};
use crate::event::{Event, EventEnvironment};

/// Pause between pull cycles.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

// ---------------------------------------------------------------------------
// Disposition
// ---------------------------------------------------------------------------

/// What the delivery loop should do with the event a handler just saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Handled; acknowledge it.
    Ack,
    /// Not handled; leave it for redelivery.
    Nack,
    /// Stop listening after acking (`ack: true`) or nacking the event.
    Stop { ack: bool },
}

/// Values a handler may return on success.
///
/// Implemented for `()` and `bool` so plain handlers need no ceremony, for
/// [`Disposition`] when the handler wants to stop, and for
/// [`serde_json::Value`] for handlers bridged from dynamic sources, where
/// anything other than `null`, `true` or `false` breaks the contract.
pub trait HandlerOutcome {
    fn into_disposition(self) -> Result<Disposition, InvalidOutcome>;
}

impl HandlerOutcome for Disposition {
    fn into_disposition(self) -> Result<Disposition, InvalidOutcome> {
        Ok(self)
    }
}

impl HandlerOutcome for () {
    fn into_disposition(self) -> Result<Disposition, InvalidOutcome> {
        Ok(Disposition::Ack)
    }
}

impl HandlerOutcome for bool {
    fn into_disposition(self) -> Result<Disposition, InvalidOutcome> {
        Ok(if self {
            Disposition::Ack
        } else {
            Disposition::Nack
        })
    }
}

impl HandlerOutcome for Option<bool> {
    fn into_disposition(self) -> Result<Disposition, InvalidOutcome> {
        self.unwrap_or(true).into_disposition()
    }
}

impl HandlerOutcome for serde_json::Value {
    fn into_disposition(self) -> Result<Disposition, InvalidOutcome> {
        match self {
            serde_json::Value::Null => Ok(Disposition::Ack),
            serde_json::Value::Bool(ack) => ack.into_disposition(),
            other => Err(InvalidOutcome(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// DeliveryLoop
// ---------------------------------------------------------------------------

/// Tuning for [`DeliveryLoop`].
#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    /// How long the loop suspends after each batch so other tasks can run.
    pub poll_interval: Duration,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Delivery loop bound to one bus.
pub struct DeliveryLoop<'a, B> {
    bus: &'a B,
    config: DeliveryConfig,
}

impl<'a, B: EventBus> DeliveryLoop<'a, B> {
    /// Loop with the default [`DeliveryConfig`].
    pub fn new(bus: &'a B) -> Self {
        Self::with_config(bus, DeliveryConfig::default())
    }

    pub fn with_config(bus: &'a B, config: DeliveryConfig) -> Self {
        Self { bus, config }
    }

    /// Deliver events for `environment` to `handler` until it stops.
    ///
    /// Returns `Ok(())` only when the handler answers
    /// [`Disposition::Stop`]. Every other exit is an error; the caller
    /// decides whether to call `run` again.
    pub async fn run<H, Fut, O, E>(
        &self,
        environment: EventEnvironment,
        mut handler: H,
    ) -> Result<(), DeliveryError>
    where
        H: FnMut(Event) -> Fut,
        Fut: Future<Output = Result<O, E>>,
        O: HandlerOutcome,
        E: Into<BoxError>,
    {
        tracing::debug!(%environment, "Delivery loop started");

        loop {
            let events = self.bus.pull(environment).await?;

            for event in events {
                let result = handler(event.clone()).await;

                let disposition = match result {
                    Ok(outcome) => outcome.into_disposition(),
                    Err(err) => {
                        let err: BoxError = err.into();
                        tracing::warn!(
                            %environment,
                            entity_id = %event.entity_id,
                            error = %err,
                            "Event handler failed, nacking event"
                        );
                        // A failed nack leaves the event pending; the handler
                        // error is still what the caller gets.
                        if let Err(nack_err) = self.bus.nacknowledge(&event).await {
                            tracing::error!(
                                %environment,
                                entity_id = %event.entity_id,
                                error = %nack_err,
                                "Failed to nack event after handler failure"
                            );
                        }
                        return Err(DeliveryError::Handler(err));
                    }
                };

                match disposition? {
                    Disposition::Ack => self.bus.acknowledge(&event).await?,
                    Disposition::Nack => self.bus.nacknowledge(&event).await?,
                    Disposition::Stop { ack } => {
                        tracing::debug!(
                            %environment,
                            entity_id = %event.entity_id,
                            ack,
                            "Stop requested by handler, leaving delivery loop"
                        );
                        if ack {
                            self.bus.acknowledge(&event).await?;
                        } else {
                            self.bus.nacknowledge(&event).await?;
                        }
                        return Ok(());
                    }
                }
            }

            // Yield so the loop never monopolises the runtime, even when the
            // transport's pull completes without awaiting anything.
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }
}

/// Run a [`DeliveryLoop`] with the default configuration.
pub async fn receive_events<B, H, Fut, O, E>(
    bus: &B,
    environment: EventEnvironment,
    handler: H,
) -> Result<(), DeliveryError>
where
    B: EventBus,
    H: FnMut(Event) -> Fut,
    Fut: Future<Output = Result<O, E>>,
    O: HandlerOutcome,
    E: Into<BoxError>,
{
    DeliveryLoop::new(bus).run(environment, handler).await
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use assert_matches::assert_matches;

    use super::*;
    use crate::error::EventBusError;
    use crate::event::{EventEntityType, EventMessageType, EventOriginDomain};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Pull,
        Ack(String),
        Nack(String),
    }

    /// Bus that serves a fixed queue once and records every call.
    #[derive(Default)]
    struct ScriptedBus {
        queue: Mutex<Vec<Event>>,
        calls: Mutex<Vec<Call>>,
        fail_nacks: bool,
    }

    impl ScriptedBus {
        fn with_events(ids: &[&str]) -> Self {
            let events = ids
                .iter()
                .map(|id| {
                    Event::new(
                        EventEnvironment::Development,
                        EventOriginDomain::Test,
                        EventMessageType::Test,
                        EventEntityType::Test,
                        *id,
                    )
                })
                .collect();
            Self {
                queue: Mutex::new(events),
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl EventBus for ScriptedBus {
        async fn publish(&self, _event: Event, _timeout: Duration) -> Result<(), EventBusError> {
            Ok(())
        }

        async fn pull(&self, _environment: EventEnvironment) -> Result<Vec<Event>, EventBusError> {
            self.calls.lock().unwrap().push(Call::Pull);
            Ok(std::mem::take(&mut *self.queue.lock().unwrap()))
        }

        async fn acknowledge(&self, event: &Event) -> Result<(), EventBusError> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Ack(event.entity_id.clone()));
            Ok(())
        }

        async fn nacknowledge(&self, event: &Event) -> Result<(), EventBusError> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Nack(event.entity_id.clone()));
            if self.fail_nacks {
                return Err(EventBusError::Transport("nack rejected".into()));
            }
            Ok(())
        }
    }

    #[test]
    fn outcome_conversions() {
        assert_eq!(().into_disposition(), Ok(Disposition::Ack));
        assert_eq!(true.into_disposition(), Ok(Disposition::Ack));
        assert_eq!(false.into_disposition(), Ok(Disposition::Nack));
        assert_eq!(None::<bool>.into_disposition(), Ok(Disposition::Ack));
        assert_eq!(Some(false).into_disposition(), Ok(Disposition::Nack));
        assert_eq!(
            serde_json::Value::Null.into_disposition(),
            Ok(Disposition::Ack)
        );
        assert_eq!(
            serde_json::json!(false).into_disposition(),
            Ok(Disposition::Nack)
        );
        assert_eq!(
            serde_json::json!(42).into_disposition(),
            Err(InvalidOutcome("42".into()))
        );
    }

    #[tokio::test]
    async fn acks_and_nacks_in_pull_order_then_stops() {
        let bus = ScriptedBus::with_events(&["a", "b", "c"]);

        let result = receive_events(&bus, EventEnvironment::Development, |event| async move {
            Ok::<_, BoxError>(match event.entity_id.as_str() {
                "a" => Disposition::Ack,
                "b" => Disposition::Nack,
                _ => Disposition::Stop { ack: false },
            })
        })
        .await;

        assert_matches!(result, Ok(()));
        assert_eq!(
            bus.calls(),
            vec![
                Call::Pull,
                Call::Ack("a".into()),
                Call::Nack("b".into()),
                Call::Nack("c".into()),
            ]
        );
    }

    #[tokio::test]
    async fn stop_skips_rest_of_batch() {
        let bus = ScriptedBus::with_events(&["first", "second"]);

        receive_events(&bus, EventEnvironment::Development, |_| async {
            Ok::<_, BoxError>(Disposition::Stop { ack: true })
        })
        .await
        .unwrap();

        assert_eq!(bus.calls(), vec![Call::Pull, Call::Ack("first".into())]);
    }

    #[tokio::test]
    async fn handler_error_nacks_and_propagates() {
        let bus = ScriptedBus::with_events(&["x", "y"]);

        let result = receive_events(&bus, EventEnvironment::Development, |_| async {
            Err::<(), _>("handler exploded")
        })
        .await;

        assert_matches!(result, Err(DeliveryError::Handler(e)) if e.to_string() == "handler exploded");
        assert_eq!(bus.calls(), vec![Call::Pull, Call::Nack("x".into())]);
    }

    #[tokio::test]
    async fn handler_error_survives_failed_nack() {
        let bus = ScriptedBus {
            fail_nacks: true,
            ..ScriptedBus::with_events(&["x"])
        };

        let result = receive_events(&bus, EventEnvironment::Development, |_| async {
            Err::<(), _>("handler exploded")
        })
        .await;

        assert_matches!(result, Err(DeliveryError::Handler(e)) if e.to_string() == "handler exploded");
        assert_eq!(bus.calls(), vec![Call::Pull, Call::Nack("x".into())]);
    }

    #[tokio::test]
    async fn invalid_outcome_leaves_event_untouched() {
        let bus = ScriptedBus::with_events(&["x"]);

        let result = receive_events(&bus, EventEnvironment::Development, |_| async {
            Ok::<_, BoxError>(serde_json::json!({"ack": "maybe"}))
        })
        .await;

        assert_matches!(result, Err(DeliveryError::InvalidOutcome(_)));
        assert_eq!(bus.calls(), vec![Call::Pull]);
    }

    #[tokio::test(start_paused = true)]
    async fn sleeps_between_empty_pulls() {
        let bus = ScriptedBus::default();
        let config = DeliveryConfig {
            poll_interval: Duration::from_secs(1),
        };
        let delivery = DeliveryLoop::with_config(&bus, config);

        let run = delivery.run(EventEnvironment::Development, |_| async {
            Ok::<_, BoxError>(())
        });
        let timed_out = tokio::time::timeout(Duration::from_millis(3500), run).await;

        assert!(timed_out.is_err());
        // Pulls at t = 0, 1, 2 and 3 seconds.
        assert_eq!(bus.calls(), vec![Call::Pull; 4]);
    }

    #[tokio::test]
    async fn pull_failure_propagates() {
        struct BrokenBus;

        impl EventBus for BrokenBus {
            async fn publish(&self, _: Event, _: Duration) -> Result<(), EventBusError> {
                Ok(())
            }

            async fn pull(&self, _: EventEnvironment) -> Result<Vec<Event>, EventBusError> {
                Err(EventBusError::Transport("connection reset".into()))
            }

            async fn acknowledge(&self, _: &Event) -> Result<(), EventBusError> {
                Ok(())
            }

            async fn nacknowledge(&self, _: &Event) -> Result<(), EventBusError> {
                Ok(())
            }
        }

        let seen = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&seen);
        let result = receive_events(&BrokenBus, EventEnvironment::Production, move |_| {
            *counter.lock().unwrap() += 1;
            async { Ok::<_, BoxError>(()) }
        })
        .await;

        assert_matches!(
            result,
            Err(DeliveryError::Bus(EventBusError::Transport(msg))) if msg == "connection reset"
        );
        assert_eq!(*seen.lock().unwrap(), 0);
    }
}
