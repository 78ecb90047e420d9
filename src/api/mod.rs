pub mod error;
pub mod health;
pub mod observations;
pub mod response;
pub mod status;
pub mod zones;

use axum::{
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::controller::AppState;

pub fn router(state: AppState) -> Router {
    let v1 = Router::new()
        .route("/zones", get(zones::get_zones))
        .route("/zones/:entity_id", get(zones::get_zone))
        .route("/status", get(status::get_status))
        .route("/observations", post(observations::post_observation));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/live", get(health::liveness_check))
        .nest("/api/v1", v1)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(Duration::from_secs(10))),
        )
        .with_state(state)
}
