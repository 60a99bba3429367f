//! Handlers for the `/events` resource.

use std::collections::BTreeMap;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use courier_core::error::CoreError;
use courier_events::{
    Event, EventBus, EventEntityType, EventMessageType, EventOriginDomain,
};
use serde::Deserialize;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Maximum length of an `entity_id`.
const MAX_ENTITY_ID_LEN: usize = 255;

/// Request body for publishing an event.
///
/// The environment and timestamp are not client-controlled: the server
/// stamps its configured environment and the current time.
#[derive(Debug, Deserialize)]
pub struct PublishEventRequest {
    pub origin_domain: EventOriginDomain,
    pub message_type: EventMessageType,
    pub entity_type: EventEntityType,
    pub entity_id: String,
    #[serde(default)]
    pub extra_data: BTreeMap<String, String>,
}

/// POST /api/v1/events
///
/// Publishes within the configured publish timeout and returns the event
/// as handed to the bus. Transports that assign ids do so internally, so
/// `id` is always `null` here.
pub async fn publish(
    State(state): State<AppState>,
    Json(input): Json<PublishEventRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Event>>)> {
    validate_entity_id(&input.entity_id)?;

    let event = Event::new(
        state.config.events.environment,
        input.origin_domain,
        input.message_type,
        input.entity_type,
        input.entity_id,
    )
    .with_extra_data(input.extra_data);

    state
        .event_bus
        .publish(event.clone(), state.config.events.publish_timeout)
        .await?;

    tracing::info!(
        environment = %event.environment,
        origin_domain = %event.origin_domain,
        entity_id = %event.entity_id,
        "Event accepted"
    );

    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: event })))
}

fn validate_entity_id(entity_id: &str) -> Result<(), CoreError> {
    if entity_id.trim().is_empty() {
        return Err(CoreError::Validation("entity_id must not be empty".into()));
    }
    if entity_id.chars().count() > MAX_ENTITY_ID_LEN {
        return Err(CoreError::Validation(format!(
            "entity_id must be at most {MAX_ENTITY_ID_LEN} characters"
        )));
    }
    Ok(())
}
