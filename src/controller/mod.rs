pub mod pid;
pub mod supervisor;
pub mod zone;

use anyhow::Result;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

use crate::config::Config;
use crate::domain::Boiler;

pub use pid::{PidGains, PidTerms};
pub use supervisor::{Supervisor, SupervisorError, MAX_FLOW_TEMP, MIN_FLOW_TEMP};
pub use zone::{ZoneController, ZoneSnapshot};

/// Seconds since the unix epoch, the controller's working clock.
pub(crate) fn unix_now() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

/// One state-change event from the observation source.
#[derive(Debug, Clone)]
pub struct StateEvent {
    pub entity_id: String,
    pub payload: Value,
}

#[derive(Clone)]
pub struct AppState {
    pub cfg: Config,
    pub supervisor: Arc<Supervisor>,
    pub observations: mpsc::Sender<StateEvent>,
}

impl AppState {
    /// Build the supervisor and its observation queue.
    ///
    /// Returns the receiving end alongside so the caller can hand it to
    /// [`spawn_supervisor_task`].
    pub fn new(cfg: Config) -> Result<(Self, mpsc::Receiver<StateEvent>)> {
        #[cfg(feature = "sim")]
        let boiler: Arc<dyn Boiler> = Arc::new(crate::domain::SimulatedBoiler::new());
        #[cfg(not(feature = "sim"))]
        let boiler: Arc<dyn Boiler> = Arc::new(crate::domain::RecordingBoiler::new());

        let supervisor = Arc::new(Supervisor::new(
            &cfg.zones,
            cfg.controller.gains(),
            cfg.controller.base_flow_temp,
            boiler,
        )?);

        let (tx, rx) = mpsc::channel(cfg.controller.channel_capacity.max(1));
        Ok((Self { cfg, supervisor, observations: tx }, rx))
    }
}

/// Drain the observation queue one event at a time.
///
/// A single consumer serializes every update-then-recompute cycle, so two
/// observations are never interleaved against the same zone set.
pub fn spawn_supervisor_task(supervisor: Arc<Supervisor>, mut rx: mpsc::Receiver<StateEvent>) {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            supervisor.handle_observation(&event.entity_id, &event.payload).await;
        }
        info!("observation channel closed, supervisor task exiting");
    });
}
