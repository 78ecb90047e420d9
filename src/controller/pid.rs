//! PID gains and term arithmetic for zone heating demand.
//!
//! The integral accumulator itself lives on the zone controller (it is
//! advanced per observation, not per output calculation); this module owns
//! the gains, the anti-windup bound, and the term computation.

use serde::Serialize;

/// Symmetric clamp bound for a zone's accumulated integral.
pub const INTEGRAL_LIMIT: f64 = 10_000.0;

/// Controller gains.
///
/// Defaults are tuned for hydronic heating: a moderate proportional
/// response, a slow integral correction for persistent error, and a small
/// derivative damping term.
#[derive(Debug, Clone, Copy)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

impl Default for PidGains {
    fn default() -> Self {
        Self { kp: 0.5, ki: 0.01, kd: 0.1 }
    }
}

/// One cycle's PID contributions, kept around for state export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PidTerms {
    pub p: f64,
    pub i: f64,
    pub d: f64,
    pub total: f64,
}

impl PidGains {
    /// Compute P, I and D contributions for one arbitration cycle.
    ///
    /// The derivative is suppressed for non-positive time deltas: zero
    /// happens right after an observation updated the zone, negative when
    /// the wall clock stepped backwards.
    pub fn compute(&self, error: f64, integral_sum: f64, last_error: f64, time_delta: f64) -> PidTerms {
        let p = error * self.kp;
        let i = integral_sum * self.ki;
        let d = if time_delta > 0.0 {
            (error - last_error) / time_delta * self.kd
        } else {
            0.0
        };
        PidTerms { p, i, d, total: p + i + d }
    }
}

/// Clamp an accumulated integral into the anti-windup range.
pub fn clamp_integral(sum: f64) -> f64 {
    sum.clamp(-INTEGRAL_LIMIT, INTEGRAL_LIMIT)
}
