//! Multi-zone heating supervisor.
//!
//! Each configured zone wraps one room thermostat with its own PID state.
//! The supervisor arbitrates between demanding zones and commands a single
//! shared boiler with a target flow temperature.

pub mod api;
pub mod config;
pub mod controller;
pub mod domain;
pub mod telemetry;
