// ABOUTME: Named actuators (light, fan, pump) mapped onto boolean GPIO output lines
// ABOUTME: Provides sysfs and in-memory line drivers plus the toggling controller

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Light,
    Fan,
    Pump,
}

impl Device {
    pub const ALL: [Device; 3] = [Device::Light, Device::Fan, Device::Pump];

    pub fn as_str(self) -> &'static str {
        match self {
            Device::Light => "light",
            Device::Fan => "fan",
            Device::Pump => "pump",
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Device {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "light" => Ok(Device::Light),
            "fan" => Ok(Device::Fan),
            "pump" => Ok(Device::Pump),
            other => Err(AppError::UnknownDevice(other.to_string())),
        }
    }
}

/// One boolean hardware output.
pub trait GpioLine: Send + Sync {
    fn read(&self) -> anyhow::Result<bool>;

    fn write(&self, high: bool) -> anyhow::Result<()>;
}

/// Output level held in memory, for machines without GPIO.
#[derive(Debug, Default)]
pub struct SimulatedLine {
    level: AtomicBool,
}

impl GpioLine for SimulatedLine {
    fn read(&self) -> anyhow::Result<bool> {
        Ok(self.level.load(Ordering::SeqCst))
    }

    fn write(&self, high: bool) -> anyhow::Result<()> {
        self.level.store(high, Ordering::SeqCst);
        Ok(())
    }
}

/// Linux sysfs GPIO output (`/sys/class/gpio/gpioN`).
#[derive(Debug)]
pub struct SysfsLine {
    pin: u32,
    value_path: PathBuf,
}

impl SysfsLine {
    /// Exports `pin` if needed, configures it as an output and drives it low.
    pub fn open(root: &Path, pin: u32) -> anyhow::Result<Self> {
        use anyhow::Context;

        let line_dir = root.join(format!("gpio{}", pin));
        if !line_dir.exists() {
            std::fs::write(root.join("export"), pin.to_string())
                .with_context(|| format!("exporting GPIO {}", pin))?;
        }
        std::fs::write(line_dir.join("direction"), "low")
            .with_context(|| format!("setting GPIO {} as output", pin))?;

        tracing::info!(pin, "GPIO line configured as output");
        Ok(Self {
            pin,
            value_path: line_dir.join("value"),
        })
    }
}

impl GpioLine for SysfsLine {
    fn read(&self) -> anyhow::Result<bool> {
        use anyhow::Context;

        let raw = std::fs::read_to_string(&self.value_path)
            .with_context(|| format!("reading GPIO {}", self.pin))?;
        match raw.trim() {
            "0" => Ok(false),
            "1" => Ok(true),
            other => anyhow::bail!("GPIO {} reported unexpected level {:?}", self.pin, other),
        }
    }

    fn write(&self, high: bool) -> anyhow::Result<()> {
        use anyhow::Context;

        std::fs::write(&self.value_path, if high { "1" } else { "0" })
            .with_context(|| format!("writing GPIO {}", self.pin))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceState {
    pub device: Device,
    pub on: bool,
}

pub struct DeviceController {
    light: Arc<dyn GpioLine>,
    fan: Arc<dyn GpioLine>,
    pump: Arc<dyn GpioLine>,
    switching: Mutex<()>,
}

impl DeviceController {
    pub fn new(light: Arc<dyn GpioLine>, fan: Arc<dyn GpioLine>, pump: Arc<dyn GpioLine>) -> Self {
        Self {
            light,
            fan,
            pump,
            switching: Mutex::new(()),
        }
    }

    pub fn simulated() -> Self {
        Self::new(
            Arc::new(SimulatedLine::default()),
            Arc::new(SimulatedLine::default()),
            Arc::new(SimulatedLine::default()),
        )
    }

    fn line(&self, device: Device) -> &dyn GpioLine {
        match device {
            Device::Light => self.light.as_ref(),
            Device::Fan => self.fan.as_ref(),
            Device::Pump => self.pump.as_ref(),
        }
    }

    fn hardware(device: Device, err: anyhow::Error) -> AppError {
        AppError::HardwareFailure(format!("{}: {:#}", device, err))
    }

    /// Inverts the device's output and returns the new level.
    pub fn toggle(&self, device: Device) -> Result<bool> {
        let _guard = self.switching.lock().unwrap_or_else(|e| e.into_inner());
        let line = self.line(device);
        let next = !line.read().map_err(|e| Self::hardware(device, e))?;
        line.write(next).map_err(|e| Self::hardware(device, e))?;
        tracing::info!(device = %device, on = next, "device toggled");
        Ok(next)
    }

    pub fn set(&self, device: Device, on: bool) -> Result<()> {
        let _guard = self.switching.lock().unwrap_or_else(|e| e.into_inner());
        self.line(device)
            .write(on)
            .map_err(|e| Self::hardware(device, e))?;
        tracing::info!(device = %device, on, "device set");
        Ok(())
    }

    pub fn state(&self, device: Device) -> Result<DeviceState> {
        let on = self
            .line(device)
            .read()
            .map_err(|e| Self::hardware(device, e))?;
        Ok(DeviceState { device, on })
    }

    pub fn states(&self) -> Result<Vec<DeviceState>> {
        Device::ALL.iter().map(|&d| self.state(d)).collect()
    }

    /// Runs `op` on the blocking thread pool. Line drivers may do file I/O.
    pub async fn run_blocking<T, F>(self: &Arc<Self>, op: F) -> Result<T>
    where
        F: FnOnce(&DeviceController) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let controller = Arc::clone(self);
        tokio::task::spawn_blocking(move || op(&controller))
            .await
            .map_err(|err| AppError::Internal(format!("device task failed: {}", err)))?
    }
}
