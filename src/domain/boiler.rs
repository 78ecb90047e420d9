use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

/// Boiler-side errors
#[derive(Debug, Error)]
pub enum BoilerError {
    #[error("boiler command channel unavailable: {0}")]
    Unavailable(String),
}

/// The single actuator this controller drives.
///
/// One write-only endpoint: "set flow temperature to X °C". Implementations
/// must submit the command without blocking on delivery confirmation; the
/// supervisor treats the call as fire-and-forget and never retries.
#[async_trait]
pub trait Boiler: Send + Sync {
    async fn set_flow_temp(&self, celsius: f64) -> Result<()>;
}

/// In-memory boiler for the default `sim` feature.
///
/// Remembers the most recent command so the status API has something to
/// report without real hardware attached.
#[derive(Debug, Default)]
pub struct SimulatedBoiler {
    last_flow_temp: Arc<RwLock<Option<f64>>>,
}

impl SimulatedBoiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn last_flow_temp(&self) -> Option<f64> {
        *self.last_flow_temp.read().await
    }
}

#[async_trait]
impl Boiler for SimulatedBoiler {
    async fn set_flow_temp(&self, celsius: f64) -> Result<()> {
        *self.last_flow_temp.write().await = Some(celsius);
        Ok(())
    }
}

/// Test double that records every command in order.
#[derive(Debug, Default)]
pub struct RecordingBoiler {
    pub commands: Arc<RwLock<Vec<f64>>>,
}

impl RecordingBoiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn commands(&self) -> Vec<f64> {
        self.commands.read().await.clone()
    }

    pub async fn last_command(&self) -> Option<f64> {
        self.commands.read().await.last().copied()
    }
}

#[async_trait]
impl Boiler for RecordingBoiler {
    async fn set_flow_temp(&self, celsius: f64) -> Result<()> {
        self.commands.write().await.push(celsius);
        Ok(())
    }
}

/// Test double whose dispatch always fails.
#[derive(Debug, Default)]
pub struct FailingBoiler;

#[async_trait]
impl Boiler for FailingBoiler {
    async fn set_flow_temp(&self, _celsius: f64) -> Result<()> {
        Err(BoilerError::Unavailable("simulated outage".to_string()).into())
    }
}
