//! Event consumer: drives the delivery loop for the configured environment.
//!
//! The delivery loop ends on the first handler or transport failure and
//! leaves the decision to resume to its caller. This task logs the failure,
//! waits `restart_delay`, and starts a fresh loop, which picks up whatever
//! the bus still holds (including the event that failed). It exits when the
//! handler asks to stop or when `cancel` fires.

use std::future::Future;
use std::time::Duration;

use courier_events::{
    BoxError, DeliveryConfig, DeliveryLoop, Disposition, Event, EventBus, EventEnvironment,
    HandlerOutcome,
};
use tokio_util::sync::CancellationToken;

/// Settings for [`run`].
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    pub environment: EventEnvironment,
    pub delivery: DeliveryConfig,
    /// Pause before restarting a failed delivery loop.
    pub restart_delay: Duration,
}

/// Run the consumer until the handler stops it or `cancel` is triggered.
///
/// Returns the number of delivery loops that ended in failure.
pub async fn run<B, H, Fut, O, E>(
    bus: &B,
    config: ConsumerConfig,
    mut handler: H,
    cancel: CancellationToken,
) -> usize
where
    B: EventBus,
    H: FnMut(Event) -> Fut,
    Fut: Future<Output = Result<O, E>>,
    O: HandlerOutcome,
    E: Into<BoxError>,
{
    let environment = config.environment;
    let delivery = DeliveryLoop::with_config(bus, config.delivery.clone());
    let mut failures = 0;

    tracing::info!(
        %environment,
        restart_delay_secs = config.restart_delay.as_secs(),
        "Event consumer started"
    );

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!(%environment, "Event consumer cancelled");
                break;
            }
            result = delivery.run(environment, &mut handler) => match result {
                Ok(()) => {
                    tracing::info!(%environment, "Event consumer stopped by handler");
                    break;
                }
                Err(e) => {
                    failures += 1;
                    tracing::error!(
                        %environment,
                        error = %e,
                        failures,
                        "Event delivery loop failed, restarting"
                    );
                }
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!(%environment, "Event consumer cancelled");
                break;
            }
            _ = tokio::time::sleep(config.restart_delay) => {}
        }
    }

    failures
}

/// Default handler: log every event and acknowledge it.
pub async fn log_event(event: Event) -> anyhow::Result<Disposition> {
    tracing::info!(
        environment = %event.environment,
        origin_domain = %event.origin_domain,
        message_type = %event.message_type,
        entity_type = %event.entity_type,
        entity_id = %event.entity_id,
        published_at = %event.published_at,
        "Event received"
    );
    Ok(Disposition::Ack)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
