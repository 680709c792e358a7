// ABOUTME: Companion relay that polls environment sensors and forwards readings to the server
// ABOUTME: Also reports device states and periodically asks the server to photograph a plant

use anyhow::{bail, Context};
use async_trait::async_trait;
use clap::Parser;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use crate::devices::DeviceState;
use crate::sensors::SensorReading;

#[derive(Debug, Clone, Parser)]
#[command(name = "growroom-relay", version, about = "Relays sensor readings to the grow-room server")]
pub struct RelayConfig {
    #[arg(long, env = "GROWROOM_SERVER", default_value = "http://localhost:5000")]
    pub server: String,

    /// Plant to photograph every `capture_every` cycles.
    #[arg(long, env = "GROWROOM_PLANT_ID")]
    pub plant_id: Option<String>,

    #[arg(long, env = "GROWROOM_RELAY_INTERVAL_SECS", default_value_t = 30)]
    pub interval_secs: u64,

    /// 0 disables scheduled captures.
    #[arg(long, env = "GROWROOM_CAPTURE_EVERY", default_value_t = 120)]
    pub capture_every: u64,

    /// JSON reading file written by an external sampler; simulated readings when unset.
    #[arg(long, env = "GROWROOM_SENSOR_FILE")]
    pub sensor_file: Option<PathBuf>,

    #[arg(long, env = "GROWROOM_RELAY_TIMEOUT_SECS", default_value_t = 10)]
    pub timeout_secs: u64,

    #[arg(long, env = "GROWROOM_LOG_JSON")]
    pub log_json: bool,
}

#[async_trait]
pub trait SensorSource: Send + Sync {
    async fn read(&self) -> anyhow::Result<SensorReading>;
}

/// Fixed readings for bench setups without probes attached.
#[derive(Debug, Clone, Copy)]
pub struct SimulatedSensors {
    pub reading: SensorReading,
}

impl Default for SimulatedSensors {
    fn default() -> Self {
        Self {
            reading: SensorReading {
                temperature: 22.0,
                humidity: 65.0,
                soil_moisture: 45.0,
            },
        }
    }
}

#[async_trait]
impl SensorSource for SimulatedSensors {
    async fn read(&self) -> anyhow::Result<SensorReading> {
        Ok(self.reading)
    }
}

/// Reads the most recent sample from a JSON file.
#[derive(Debug, Clone)]
pub struct FileSensors {
    pub path: PathBuf,
}

#[async_trait]
impl SensorSource for FileSensors {
    async fn read(&self) -> anyhow::Result<SensorReading> {
        let raw = tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("reading {}", self.path.display()))?;
        serde_json::from_slice(&raw).with_context(|| format!("parsing {}", self.path.display()))
    }
}

pub struct Relay {
    client: reqwest::Client,
    server: String,
    plant_id: Option<String>,
    capture_every: u64,
    sensors: Box<dyn SensorSource>,
}

impl Relay {
    pub fn new(
        server: &str,
        plant_id: Option<String>,
        capture_every: u64,
        timeout: Duration,
        sensors: Box<dyn SensorSource>,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("building relay HTTP client")?;
        Ok(Self {
            client,
            server: server.trim_end_matches('/').to_string(),
            plant_id: plant_id.filter(|id| !id.trim().is_empty()),
            capture_every,
            sensors,
        })
    }

    pub fn from_config(config: &RelayConfig) -> anyhow::Result<Self> {
        let sensors: Box<dyn SensorSource> = match &config.sensor_file {
            Some(path) => Box::new(FileSensors { path: path.clone() }),
            None => Box::new(SimulatedSensors::default()),
        };
        Self::new(
            &config.server,
            config.plant_id.clone(),
            config.capture_every,
            Duration::from_secs(config.timeout_secs),
            sensors,
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.server, path)
    }

    pub async fn push_reading(&self, reading: &SensorReading) -> anyhow::Result<()> {
        let response = self
            .client
            .post(self.url("/sensor-data"))
            .json(reading)
            .send()
            .await
            .context("posting sensor data")?;
        if !response.status().is_success() {
            bail!("server rejected sensor data: {}", response.status());
        }
        Ok(())
    }

    pub async fn fetch_devices(&self) -> anyhow::Result<Vec<DeviceState>> {
        let response = self
            .client
            .get(self.url("/api/devices"))
            .send()
            .await
            .context("fetching device states")?;
        if !response.status().is_success() {
            bail!("device state request failed: {}", response.status());
        }
        response.json().await.context("decoding device states")
    }

    /// Redirects are not followed; the server answers a capture with 303.
    pub async fn trigger_capture(&self, plant_id: &str) -> anyhow::Result<()> {
        let response = self
            .client
            .post(self.url(&format!("/capture/{}", plant_id)))
            .send()
            .await
            .context("requesting capture")?;
        let status = response.status();
        if !(status.is_success() || status.is_redirection()) {
            bail!("capture for plant {} failed: {}", plant_id, status);
        }
        Ok(())
    }

    fn capture_due(&self, cycle: u64) -> Option<&str> {
        if self.capture_every == 0 || cycle == 0 || cycle % self.capture_every != 0 {
            return None;
        }
        self.plant_id.as_deref()
    }

    /// One monitoring pass. Each step logs its own failure and the pass carries on.
    pub async fn run_cycle(&self, cycle: u64) {
        tracing::debug!(cycle, "monitoring cycle");

        match self.sensors.read().await {
            Ok(reading) => match self.push_reading(&reading).await {
                Ok(()) => tracing::info!(
                    temperature = reading.temperature,
                    humidity = reading.humidity,
                    soil_moisture = reading.soil_moisture,
                    "sensor data sent"
                ),
                Err(err) => tracing::warn!("sending sensor data failed: {:#}", err),
            },
            Err(err) => tracing::warn!("reading sensors failed: {:#}", err),
        }

        match self.fetch_devices().await {
            Ok(states) => {
                for state in states {
                    tracing::info!(device = %state.device, on = state.on, "device state");
                }
            }
            Err(err) => tracing::warn!("{:#}", err),
        }

        if let Some(plant_id) = self.capture_due(cycle) {
            match self.trigger_capture(plant_id).await {
                Ok(()) => tracing::info!(plant_id = %plant_id, "capture requested"),
                Err(err) => tracing::warn!("{:#}", err),
            }
        }
    }

    /// Runs a cycle every `interval` until `shutdown` resolves.
    pub async fn run(&self, interval: Duration, shutdown: impl Future<Output = ()>) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        let mut cycle: u64 = 0;
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    cycle += 1;
                    self.run_cycle(cycle).await;
                }
            }
        }
        tracing::info!(cycles = cycle, "relay stopped");
    }
}
