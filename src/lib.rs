// ABOUTME: Library root for the grow-room monitor server and its companion relay
// ABOUTME: Wires configuration into concrete hardware, storage and notifier implementations

pub mod calendar;
pub mod camera;
pub mod config;
pub mod devices;
pub mod error;
pub mod notifier;
pub mod photos;
pub mod plants;
pub mod presets;
pub mod relay;
pub mod routes;
pub mod sensors;
pub mod storage;
pub mod types;

#[cfg(test)]
mod calendar_tests;

use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::calendar::CalendarBook;
use crate::camera::{Camera, CommandCamera, SimulatedCamera};
use crate::config::{Config, HardwareMode};
use crate::devices::{DeviceController, GpioLine, SysfsLine};
use crate::notifier::{LogNotifier, Notifier, TelegramNotifier};
use crate::photos::PhotoArchive;
use crate::plants::JsonPlantRepository;
use crate::sensors::SensorLog;
use crate::storage::JsonStore;

pub use crate::routes::{build_router, AppState};

/// Installs the global subscriber for either binary. `RUST_LOG` overrides the
/// default `info` filter; `json` switches to one JSON object per line.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn open_devices(config: &Config) -> anyhow::Result<DeviceController> {
    match config.hardware {
        HardwareMode::Simulated => Ok(DeviceController::simulated()),
        HardwareMode::Sysfs => {
            let open = |pin| -> anyhow::Result<Arc<dyn GpioLine>> {
                Ok(Arc::new(SysfsLine::open(&config.gpio_root, pin)?))
            };
            Ok(DeviceController::new(
                open(config.light_pin)?,
                open(config.fan_pin)?,
                open(config.pump_pin)?,
            ))
        }
    }
}

fn open_camera(config: &Config) -> Arc<dyn Camera> {
    match config.hardware {
        HardwareMode::Simulated => Arc::new(SimulatedCamera),
        HardwareMode::Sysfs => Arc::new(CommandCamera {
            program: config.camera_program.clone(),
            width: config.camera_width,
            height: config.camera_height,
            warmup: config.camera_warmup(),
        }),
    }
}

fn open_notifier(config: &Config) -> anyhow::Result<Arc<dyn Notifier>> {
    match config.telegram() {
        Some((token, chat_id)) => Ok(Arc::new(TelegramNotifier::new(
            token,
            chat_id,
            config.notify_timeout(),
        )?)),
        None => {
            tracing::warn!("Telegram credentials not set; notifications will only be logged");
            Ok(Arc::new(LogNotifier))
        }
    }
}

/// Builds the shared application state described by `config`.
pub async fn init_state(config: &Config) -> anyhow::Result<AppState> {
    tokio::fs::create_dir_all(&config.data_dir)
        .await
        .with_context(|| format!("creating {}", config.data_dir.display()))?;
    let photo_dir = config.photo_dir();
    tokio::fs::create_dir_all(&photo_dir)
        .await
        .with_context(|| format!("creating {}", photo_dir.display()))?;

    let plants = JsonPlantRepository::open(JsonStore::new(config.plants_path())).await;
    let calendar = CalendarBook::new(JsonStore::new(config.calendar_path()));
    let devices = open_devices(config).context("configuring GPIO lines")?;

    Ok(AppState {
        plants: Arc::new(plants),
        calendar: Arc::new(calendar),
        devices: Arc::new(devices),
        photos: Arc::new(PhotoArchive::new(photo_dir, config.photo_history)),
        camera: open_camera(config),
        notifier: open_notifier(config)?,
        sensors: Arc::new(SensorLog::new(config.sensor_history)),
    })
}
