//! Arbitration supervisor: owns every zone controller, converts incoming
//! state observations into a single boiler flow-temperature command.

use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::pid::PidGains;
use super::zone::{ZoneController, ZoneSnapshot};
use crate::config::ZoneConfig;
use crate::domain::{parse_valve_percent, Boiler, ClimateReading};

/// Flow temperature commanded when no zone wins arbitration (boiler off).
pub const MIN_FLOW_TEMP: f64 = 5.0;

/// Hardware safety ceiling on the commanded flow temperature.
pub const MAX_FLOW_TEMP: f64 = 80.0;

/// Zones above this priority may drive the boiler on their own.
pub const HIGH_PRIORITY_THRESHOLD: f64 = 0.5;

/// Demanding low-priority zones required before any of them is eligible.
pub const LOW_PRIORITY_QUORUM: usize = 2;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("no zones configured")]
    NoZones,
    #[error("duplicate zone entity id: {0}")]
    DuplicateZone(String),
}

pub struct Supervisor {
    inner: RwLock<Zones>,
    boiler: Arc<dyn Boiler>,
    base_flow_temp: f64,
}

struct Zones {
    /// Configuration order; doubles as the arbitration tie-break order.
    zones: Vec<ZoneController>,
    last_flow_command: Option<f64>,
}

impl Supervisor {
    pub fn new(
        configs: &[ZoneConfig],
        gains: PidGains,
        base_flow_temp: f64,
        boiler: Arc<dyn Boiler>,
    ) -> Result<Self, SupervisorError> {
        if configs.is_empty() {
            return Err(SupervisorError::NoZones);
        }
        let mut zones: Vec<ZoneController> = Vec::with_capacity(configs.len());
        for cfg in configs {
            if zones.iter().any(|z| z.entity_id() == cfg.entity_id) {
                return Err(SupervisorError::DuplicateZone(cfg.entity_id.clone()));
            }
            zones.push(ZoneController::new(cfg, gains));
        }
        info!(zone_count = zones.len(), "supervisor initialized");
        Ok(Self {
            inner: RwLock::new(Zones { zones, last_flow_command: None }),
            boiler,
            base_flow_temp,
        })
    }

    /// Every entity id the observation source should deliver events for.
    pub async fn monitored_entity_ids(&self) -> Vec<String> {
        let state = self.inner.read().await;
        let mut ids = Vec::new();
        for zone in &state.zones {
            ids.push(zone.entity_id().to_string());
            if let Some(valve) = zone.valve_entity_id() {
                ids.push(valve.to_string());
            }
        }
        ids
    }

    pub async fn handle_observation(&self, entity_id: &str, payload: &Value) {
        self.handle_observation_at(entity_id, payload, super::unix_now()).await;
    }

    /// Apply one observation, then re-arbitrate and command the boiler.
    ///
    /// The write lock spans the whole update-then-recompute sequence:
    /// winner selection needs a consistent view across all zones, so no
    /// other observation may interleave with it.
    pub async fn handle_observation_at(&self, entity_id: &str, payload: &Value, observed_at: f64) {
        let flow_temp = {
            let mut state = self.inner.write().await;
            if let Some(idx) = state.zones.iter().position(|z| z.entity_id() == entity_id) {
                let zone = &mut state.zones[idx];
                match ClimateReading::from_payload(payload) {
                    Ok(reading) => zone.apply_reading(&reading, observed_at),
                    Err(e) => warn!(
                        zone = %zone.name(),
                        error = %e,
                        "discarding malformed climate observation"
                    ),
                }
            } else if let Some(idx) = state
                .zones
                .iter()
                .position(|z| z.valve_entity_id() == Some(entity_id))
            {
                let zone = &mut state.zones[idx];
                match parse_valve_percent(payload) {
                    Ok(percent) => zone.update_valve_opening(percent),
                    Err(e) => warn!(
                        zone = %zone.name(),
                        error = %e,
                        "discarding malformed valve observation"
                    ),
                }
            } else {
                warn!(entity_id, "observation for unknown entity");
            }

            let flow_temp = arbitrate(&mut state.zones, self.base_flow_temp, observed_at);
            state.last_flow_command = Some(flow_temp);
            flow_temp
        };

        // Fire-and-forget: a failed dispatch is logged, never retried, and
        // never fails the arbitration pass.
        if let Err(e) = self.boiler.set_flow_temp(flow_temp).await {
            warn!(error = %e, flow_temp_c = flow_temp, "boiler command dispatch failed");
        }
    }

    pub async fn zone_snapshot(&self, entity_id: &str) -> Option<ZoneSnapshot> {
        let state = self.inner.read().await;
        state
            .zones
            .iter()
            .find(|z| z.entity_id() == entity_id)
            .map(ZoneController::snapshot)
    }

    /// Snapshots of every zone, in configuration order.
    pub async fn all_snapshots(&self) -> Vec<ZoneSnapshot> {
        let state = self.inner.read().await;
        state.zones.iter().map(ZoneController::snapshot).collect()
    }

    pub async fn last_flow_command(&self) -> Option<f64> {
        self.inner.read().await.last_flow_command
    }
}

/// Pick the winning zone and map its PID output to a flow temperature.
fn arbitrate(zones: &mut [ZoneController], base_flow_temp: f64, now: f64) -> f64 {
    let demanding_low = zones
        .iter()
        .filter(|z| z.is_demanding_heat() && z.priority() <= HIGH_PRIORITY_THRESHOLD)
        .count();

    let mut winner: Option<usize> = None;
    let mut max_demand = 0.0;
    for (idx, zone) in zones.iter().enumerate() {
        let demand = zone.demand_metric();
        debug!(
            zone = %zone.name(),
            demanding = zone.is_demanding_heat(),
            demand_c = demand,
            "zone demand"
        );
        if !is_eligible(zone, demanding_low) {
            continue;
        }
        // strictly-greater keeps the earliest configured zone on ties
        if demand > max_demand {
            max_demand = demand;
            winner = Some(idx);
        }
    }

    match winner {
        Some(idx) => {
            let zone = &mut zones[idx];
            let time_delta = zone.last_update_time().map_or(0.0, |t| (now - t).max(0.0));
            let pid = zone.pid_output(time_delta);
            let flow_temp = (base_flow_temp + pid).clamp(MIN_FLOW_TEMP, MAX_FLOW_TEMP);
            info!(
                zone = %zone.name(),
                demand_c = max_demand,
                pid_output = pid,
                flow_temp_c = flow_temp,
                "boiler on, driven by max-demand zone"
            );
            flow_temp
        }
        None => {
            info!(flow_temp_c = MIN_FLOW_TEMP, "no eligible demand, boiler off");
            MIN_FLOW_TEMP
        }
    }
}

/// Two-tier eligibility.
///
/// High-priority zones qualify whenever they demand heat. Low-priority
/// zones only qualify while at least [`LOW_PRIORITY_QUORUM`] of them demand
/// at once, so a single unimportant room cannot short-cycle the shared
/// boiler.
fn is_eligible(zone: &ZoneController, demanding_low: usize) -> bool {
    if !zone.is_demanding_heat() {
        return false;
    }
    zone.priority() > HIGH_PRIORITY_THRESHOLD || demanding_low >= LOW_PRIORITY_QUORUM
}
