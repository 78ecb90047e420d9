use anyhow::Result;
use figment::{providers::{Env, Format, Toml}, Figment};
use serde::Deserialize;
use std::net::SocketAddr;

use crate::controller::pid::PidGains;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub controller: ControllerConfig,
    pub zones: Vec<ZoneConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig { pub host: String, pub port: u16 }
impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ControllerConfig {
    #[serde(default = "default_kp")]
    pub kp: f64,
    #[serde(default = "default_ki")]
    pub ki: f64,
    #[serde(default = "default_kd")]
    pub kd: f64,
    /// Flow temperature commanded at zero PID output.
    #[serde(default = "default_base_flow_temp")]
    pub base_flow_temp: f64,
    /// Observation queue depth before senders see backpressure.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl ControllerConfig {
    pub fn gains(&self) -> PidGains {
        PidGains { kp: self.kp, ki: self.ki, kd: self.kd }
    }
}

fn default_kp() -> f64 { 0.5 }
fn default_ki() -> f64 { 0.01 }
fn default_kd() -> f64 { 0.1 }
fn default_base_flow_temp() -> f64 { 40.0 }
fn default_channel_capacity() -> usize { 64 }

/// One monitored room, consumed once at supervisor construction.
#[derive(Debug, Clone, Deserialize)]
pub struct ZoneConfig {
    /// Climate entity delivering temperature/setpoint/action observations.
    pub entity_id: String,
    pub name: String,
    /// Floor area in m², informational only.
    #[serde(default)]
    pub area: f64,
    /// Arbitration weight in [0, 1]; zones at or below 0.5 need company
    /// before they may drive the boiler.
    #[serde(default = "default_priority")]
    pub priority: f64,
    /// Optional entity reporting the zone's TRV opening percentage.
    #[serde(default)]
    pub valve_entity_id: Option<String>,
}

fn default_priority() -> f64 { 1.0 }

impl Config {
    pub fn load() -> Result<Self> {
        let figment = Figment::new()
            .merge(Toml::file("config/default.toml"))
            .merge(Env::prefixed("OHC__").split("__"));
        Ok(figment.extract()?)
    }
}
