//! Per-zone controller: temperature-error history plus PID state.
//!
//! A zone transitions between idle and heating based on the thermostat's
//! reported action. While heating, each observation accumulates the
//! integral term; while idle the integral is frozen at its last value. A
//! setpoint change wipes it in either state.

use serde::Serialize;
use tracing::{debug, info};

use super::pid::{clamp_integral, PidGains, PidTerms};
use crate::config::ZoneConfig;
use crate::domain::{ClimateReading, HvacAction};

pub struct ZoneController {
    entity_id: String,
    name: String,
    floor_area_m2: f64,
    priority: f64,
    valve_entity_id: Option<String>,
    gains: PidGains,

    current_temp: f64,
    target_temp: f64,
    current_error: f64,
    last_error: f64,
    last_target_temp: Option<f64>,
    is_demanding_heat: bool,
    integral_sum: f64,
    last_update_time: Option<f64>,
    valve_opening_percent: f64,
    last_terms: PidTerms,
}

impl ZoneController {
    pub fn new(cfg: &ZoneConfig, gains: PidGains) -> Self {
        let priority = cfg.priority.clamp(0.0, 1.0);
        info!(
            zone = %cfg.name,
            entity_id = %cfg.entity_id,
            area_m2 = cfg.area,
            priority,
            valve = cfg.valve_entity_id.as_deref().unwrap_or("none"),
            "zone registered"
        );
        Self {
            entity_id: cfg.entity_id.clone(),
            name: cfg.name.clone(),
            floor_area_m2: cfg.area,
            priority,
            valve_entity_id: cfg.valve_entity_id.clone(),
            gains,
            current_temp: 0.0,
            target_temp: 0.0,
            current_error: 0.0,
            last_error: 0.0,
            last_target_temp: None,
            is_demanding_heat: false,
            integral_sum: 0.0,
            last_update_time: None,
            valve_opening_percent: 100.0,
            last_terms: PidTerms::default(),
        }
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn valve_entity_id(&self) -> Option<&str> {
        self.valve_entity_id.as_deref()
    }

    pub fn priority(&self) -> f64 {
        self.priority
    }

    pub fn is_demanding_heat(&self) -> bool {
        self.is_demanding_heat
    }

    pub fn last_update_time(&self) -> Option<f64> {
        self.last_update_time
    }

    /// Apply one validated climate observation.
    ///
    /// `observed_at` is unix seconds. The first observation and any
    /// observation behind the previous one contribute a zero time delta.
    pub fn apply_reading(&mut self, reading: &ClimateReading, observed_at: f64) {
        // A user-driven setpoint move invalidates the accumulated
        // correction; carrying it over would wind the output up or down
        // against the new target.
        if let Some(last_target) = self.last_target_temp {
            if reading.target_temp != last_target {
                info!(
                    zone = %self.name,
                    old_target_c = last_target,
                    new_target_c = reading.target_temp,
                    "target changed, resetting integral"
                );
                self.integral_sum = 0.0;
                self.last_error = 0.0;
            }
        }

        self.is_demanding_heat = reading.hvac_action == HvacAction::Heating;

        let new_error = reading.target_temp - reading.current_temp;
        let time_delta = self
            .last_update_time
            .map_or(0.0, |t| (observed_at - t).max(0.0));

        debug!(
            zone = %self.name,
            current_c = reading.current_temp,
            target_c = reading.target_temp,
            error_c = new_error,
            action = %reading.hvac_action,
            time_delta_s = time_delta,
            "zone state update"
        );

        if self.is_demanding_heat {
            self.integral_sum = clamp_integral(self.integral_sum + new_error * time_delta);
            // previous error, one step behind, feeds the derivative term
            self.last_error = self.current_error;
        }

        self.current_error = new_error;
        self.current_temp = reading.current_temp;
        self.target_temp = reading.target_temp;
        self.last_target_temp = Some(reading.target_temp);
        self.last_update_time = Some(observed_at);
    }

    /// Store the latest reported TRV opening, clamped to [0, 100].
    pub fn update_valve_opening(&mut self, percent: f64) {
        self.valve_opening_percent = percent.clamp(0.0, 100.0);
        debug!(
            zone = %self.name,
            opening_percent = self.valve_opening_percent,
            "valve opening updated"
        );
    }

    /// Heating need as seen by the arbitration pass.
    ///
    /// Zero unless the zone is actively heating with a positive error. A
    /// partially closed valve restricts delivered flow, so the signal is
    /// scaled by `100/opening` to keep the zone competitive; a fully
    /// closed valve gets no boost (the factor would be unbounded).
    pub fn demand_metric(&self) -> f64 {
        if !self.is_demanding_heat || self.current_error <= 0.0 {
            return 0.0;
        }
        let opening = self.valve_opening_percent;
        if opening > 0.0 && opening < 100.0 {
            self.current_error * (100.0 / opening)
        } else {
            self.current_error
        }
    }

    /// Full PID output for this zone, retaining the terms for export.
    pub fn pid_output(&mut self, time_delta: f64) -> f64 {
        let terms = self
            .gains
            .compute(self.current_error, self.integral_sum, self.last_error, time_delta);
        debug!(
            zone = %self.name,
            p = terms.p,
            i = terms.i,
            d = terms.d,
            total = terms.total,
            time_delta_s = time_delta,
            "pid terms"
        );
        self.last_terms = terms;
        terms.total
    }

    /// Read-only projection for monitoring, rounded for display.
    pub fn snapshot(&self) -> ZoneSnapshot {
        ZoneSnapshot {
            entity_id: self.entity_id.clone(),
            name: self.name.clone(),
            floor_area_m2: self.floor_area_m2,
            priority: self.priority,
            current_temp: round2(self.current_temp),
            target_temp: round2(self.target_temp),
            current_error: round2(self.current_error),
            last_error: round2(self.last_error),
            is_demanding_heat: self.is_demanding_heat,
            demand_metric: round2(self.demand_metric()),
            integral_sum: round2(self.integral_sum),
            valve_opening_percent: round2(self.valve_opening_percent),
            pid: PidTerms {
                p: round2(self.last_terms.p),
                i: round2(self.last_terms.i),
                d: round2(self.last_terms.d),
                total: round2(self.last_terms.total),
            },
            last_update_time: self.last_update_time,
        }
    }

    #[cfg(test)]
    pub(crate) fn integral_sum(&self) -> f64 {
        self.integral_sum
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneSnapshot {
    pub entity_id: String,
    pub name: String,
    pub floor_area_m2: f64,
    pub priority: f64,
    pub current_temp: f64,
    pub target_temp: f64,
    pub current_error: f64,
    pub last_error: f64,
    pub is_demanding_heat: bool,
    pub demand_metric: f64,
    pub integral_sum: f64,
    pub valve_opening_percent: f64,
    pub pid: PidTerms,
    pub last_update_time: Option<f64>,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const T0: f64 = 1_700_000_000.0;

    fn zone_config(priority: f64) -> ZoneConfig {
        ZoneConfig {
            entity_id: "climate.test_bedroom".to_string(),
            name: "Bedroom".to_string(),
            area: 15.0,
            priority,
            valve_entity_id: None,
        }
    }

    fn test_zone() -> ZoneController {
        ZoneController::new(&zone_config(1.0), PidGains::default())
    }

    fn reading(current: f64, target: f64, action: HvacAction) -> ClimateReading {
        ClimateReading { current_temp: current, target_temp: target, hvac_action: action }
    }

    #[test]
    fn test_error_and_demand_calculation() {
        let mut zone = test_zone();

        zone.apply_reading(&reading(18.0, 20.0, HvacAction::Heating), T0);
        assert_eq!(zone.current_error, 2.0);
        assert!(zone.is_demanding_heat());
        assert_eq!(zone.demand_metric(), 2.0);

        zone.apply_reading(&reading(18.0, 20.0, HvacAction::Idle), T0 + 60.0);
        assert!(!zone.is_demanding_heat());
        assert_eq!(zone.demand_metric(), 0.0);
    }

    #[test]
    fn test_no_demand_when_at_or_above_target() {
        let mut zone = test_zone();
        zone.apply_reading(&reading(22.5, 22.0, HvacAction::Heating), T0);
        assert_eq!(zone.current_error, -0.5);
        assert_eq!(zone.demand_metric(), 0.0);
    }

    #[test]
    fn test_integral_accumulates_error_times_delta() {
        let mut zone = test_zone();

        // first observation has no elapsed time to integrate over
        zone.apply_reading(&reading(19.0, 20.0, HvacAction::Heating), T0);
        assert_eq!(zone.integral_sum(), 0.0);

        // 1 °C error held for 100 s
        zone.apply_reading(&reading(19.0, 20.0, HvacAction::Heating), T0 + 100.0);
        assert!((zone.integral_sum() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_integral_clamped_under_sustained_error() {
        let mut zone = test_zone();
        zone.apply_reading(&reading(17.0, 22.0, HvacAction::Heating), T0);

        // 5 °C error for two hours would integrate to 36000 unclamped
        for hour in 1..=2 {
            zone.apply_reading(&reading(17.0, 22.0, HvacAction::Heating), T0 + 3600.0 * hour as f64);
        }
        assert_eq!(zone.integral_sum(), 10_000.0);
    }

    #[test]
    fn test_integral_frozen_while_idle() {
        let mut zone = test_zone();
        zone.apply_reading(&reading(19.0, 20.0, HvacAction::Heating), T0);
        zone.apply_reading(&reading(19.0, 20.0, HvacAction::Heating), T0 + 100.0);
        let frozen = zone.integral_sum();
        assert!(frozen > 0.0);

        zone.apply_reading(&reading(19.2, 20.0, HvacAction::Idle), T0 + 200.0);
        assert_eq!(zone.integral_sum(), frozen);

        // resuming heat keeps accumulating from the frozen value
        zone.apply_reading(&reading(19.2, 20.0, HvacAction::Heating), T0 + 300.0);
        assert!(zone.integral_sum() > frozen);
    }

    #[test]
    fn test_setpoint_change_resets_integral_before_accumulation() {
        let mut zone = test_zone();
        zone.apply_reading(&reading(19.0, 20.0, HvacAction::Heating), T0);
        zone.apply_reading(&reading(19.0, 20.0, HvacAction::Heating), T0 + 1800.0);
        assert!(zone.integral_sum() > 1000.0);

        // raising the target wipes the old accumulation; only the new
        // error over this step's delta remains afterwards
        zone.apply_reading(&reading(19.0, 23.0, HvacAction::Heating), T0 + 2400.0);
        assert_eq!(zone.current_error, 4.0);
        assert!((zone.integral_sum() - 4.0 * 600.0).abs() < 1e-9);
    }

    #[test]
    fn test_setpoint_change_resets_while_idle() {
        let mut zone = test_zone();
        zone.apply_reading(&reading(19.0, 20.0, HvacAction::Heating), T0);
        zone.apply_reading(&reading(19.0, 20.0, HvacAction::Heating), T0 + 1800.0);
        assert!(zone.integral_sum() > 0.0);

        // idle zones do not accumulate, so the reset leaves exactly zero
        zone.apply_reading(&reading(19.0, 18.0, HvacAction::Idle), T0 + 2400.0);
        assert_eq!(zone.integral_sum(), 0.0);
    }

    #[test]
    fn test_lowering_setpoint_accumulates_negative_error() {
        let mut zone = test_zone();
        zone.apply_reading(&reading(20.0, 22.0, HvacAction::Heating), T0);
        zone.apply_reading(&reading(20.0, 22.0, HvacAction::Heating), T0 + 1800.0);

        zone.apply_reading(&reading(20.0, 19.0, HvacAction::Heating), T0 + 2400.0);
        assert_eq!(zone.current_error, -1.0);
        assert!((zone.integral_sum() - (-600.0)).abs() < 1e-9);
    }

    #[test]
    fn test_backwards_clock_contributes_nothing() {
        let mut zone = test_zone();
        zone.apply_reading(&reading(19.0, 20.0, HvacAction::Heating), T0);
        zone.apply_reading(&reading(19.0, 20.0, HvacAction::Heating), T0 + 100.0);
        let before = zone.integral_sum();

        // clock steps an hour backwards; the delta must not go negative
        zone.apply_reading(&reading(19.0, 20.0, HvacAction::Heating), T0 - 3500.0);
        assert_eq!(zone.integral_sum(), before);
    }

    #[test]
    fn test_pid_output_matches_terms() {
        let mut zone = test_zone();
        zone.apply_reading(&reading(19.0, 20.0, HvacAction::Heating), T0);
        zone.apply_reading(&reading(18.0, 20.0, HvacAction::Heating), T0 + 10.0);
        // current_error = 2.0, last_error = 1.0, integral = 2.0*10 = 20
        let output = zone.pid_output(10.0);
        let expected = 2.0 * 0.5 + 20.0 * 0.01 + (2.0 - 1.0) / 10.0 * 0.1;
        assert!((output - expected).abs() < 1e-9);
    }

    #[rstest]
    #[case(100.0, 3.0, 3.0)]
    #[case(50.0, 3.0, 6.0)]
    #[case(25.0, 2.0, 8.0)]
    #[case(0.0, 2.0, 2.0)]
    fn test_valve_compensation(#[case] opening: f64, #[case] error: f64, #[case] expected: f64) {
        let mut zone = test_zone();
        zone.update_valve_opening(opening);
        zone.apply_reading(&reading(22.0 - error, 22.0, HvacAction::Heating), T0);
        assert!((zone.demand_metric() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_valve_opening_clamped() {
        let mut zone = test_zone();
        zone.update_valve_opening(140.0);
        assert_eq!(zone.snapshot().valve_opening_percent, 100.0);
        zone.update_valve_opening(-20.0);
        assert_eq!(zone.snapshot().valve_opening_percent, 0.0);
    }

    #[rstest]
    #[case(1.4, 1.0)]
    #[case(-0.3, 0.0)]
    #[case(0.7, 0.7)]
    fn test_priority_clamped_at_construction(#[case] configured: f64, #[case] effective: f64) {
        let zone = ZoneController::new(&zone_config(configured), PidGains::default());
        assert_eq!(zone.priority(), effective);
    }

    #[test]
    fn test_snapshot_idempotent() {
        let mut zone = test_zone();
        zone.apply_reading(&reading(18.7, 21.3, HvacAction::Heating), T0);
        zone.pid_output(0.0);
        let first = zone.snapshot();
        let second = zone.snapshot();
        assert_eq!(first, second);
    }

    proptest::proptest! {
        #[test]
        fn prop_integral_never_leaves_clamp(
            error in -50.0f64..50.0,
            steps in 1usize..40,
            delta in 0.0f64..7200.0,
        ) {
            let mut zone = test_zone();
            for step in 0..steps {
                let at = T0 + delta * step as f64;
                zone.apply_reading(&reading(20.0 - error, 20.0, HvacAction::Heating), at);
                proptest::prop_assert!(zone.integral_sum().abs() <= 10_000.0);
            }
        }
    }
}
