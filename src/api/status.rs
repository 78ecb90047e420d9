use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{api::response::ApiResponse, controller::AppState};

/// System status response
#[derive(Debug, Serialize)]
pub struct SystemStatus {
    timestamp: DateTime<Utc>,
    /// Most recent flow temperature commanded to the boiler, if any
    /// arbitration pass has run yet.
    flow_temp_c: Option<f64>,
    zones_demanding: usize,
    zones_total: usize,
    version: String,
    mode: String,
}

/// GET /api/v1/status - Current supervisor status
pub async fn get_status(State(state): State<AppState>) -> Json<ApiResponse<SystemStatus>> {
    let snapshots = state.supervisor.all_snapshots().await;

    let status = SystemStatus {
        timestamp: Utc::now(),
        flow_temp_c: state.supervisor.last_flow_command().await,
        zones_demanding: snapshots.iter().filter(|z| z.is_demanding_heat).count(),
        zones_total: snapshots.len(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        mode: if cfg!(feature = "sim") {
            "simulated".to_string()
        } else {
            "hardware".to_string()
        },
    };

    Json(ApiResponse::success(status))
}
