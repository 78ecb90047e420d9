use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    api::{error::ApiError, response::ApiResponse},
    controller::{AppState, ZoneSnapshot},
};

/// GET /api/v1/zones - Snapshots of every zone, in configuration order
pub async fn get_zones(State(state): State<AppState>) -> Json<ApiResponse<Vec<ZoneSnapshot>>> {
    let snapshots = state.supervisor.all_snapshots().await;
    Json(ApiResponse::success(snapshots))
}

/// GET /api/v1/zones/:entity_id - Snapshot of a single zone
pub async fn get_zone(
    State(state): State<AppState>,
    Path(entity_id): Path<String>,
) -> Result<Json<ApiResponse<ZoneSnapshot>>, ApiError> {
    match state.supervisor.zone_snapshot(&entity_id).await {
        Some(snapshot) => Ok(Json(ApiResponse::success(snapshot))),
        None => Err(ApiError::NotFound(format!("zone {entity_id}"))),
    }
}
