use anyhow::Result;
use open_heating_controller::{api, config::Config, controller, telemetry};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init_tracing();

    let cfg = Config::load()?;

    let (app_state, observation_rx) = controller::AppState::new(cfg)?;

    let monitored = app_state.supervisor.monitored_entity_ids().await;
    info!(entities = ?monitored, "supervising state changes");

    controller::spawn_supervisor_task(app_state.supervisor.clone(), observation_rx);

    let addr = app_state.cfg.server.socket_addr()?;
    let app = api::router(app_state);

    info!(%addr, "starting Open Heating Controller");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(telemetry::shutdown_signal())
        .await?;

    info!("shutdown complete");
    Ok(())
}
