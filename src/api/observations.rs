use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;

use crate::{
    api::error::ApiError,
    controller::{AppState, StateEvent},
};

/// One state-change event as delivered by the observation source.
#[derive(Debug, Deserialize)]
pub struct ObservationRequest {
    pub entity_id: String,
    pub payload: serde_json::Value,
}

/// POST /api/v1/observations - Enqueue a state-change event
///
/// Returns 202 immediately; the supervisor task processes events in
/// arrival order. Payload validation happens there, so a malformed payload
/// is accepted here and discarded later with a warning.
pub async fn post_observation(
    State(state): State<AppState>,
    Json(request): Json<ObservationRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .observations
        .try_send(StateEvent { entity_id: request.entity_id, payload: request.payload })
        .map_err(|e| ApiError::ServiceUnavailable(format!("observation queue full: {e}")))?;
    Ok(StatusCode::ACCEPTED)
}
