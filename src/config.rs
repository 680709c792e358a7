// ABOUTME: Server configuration from command-line flags, environment variables and .env
// ABOUTME: Every flag has an environment fallback so the Pi service unit can stay flag-free

use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum HardwareMode {
    /// In-memory GPIO lines and a placeholder camera.
    Simulated,
    /// Linux sysfs GPIO and an external still-capture program.
    Sysfs,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "growroom", version, about = "Grow-room plant monitor server")]
pub struct Config {
    #[arg(long, env = "GROWROOM_BIND", default_value = "0.0.0.0:5000")]
    pub bind: SocketAddr,

    /// Directory holding plants.json and calendar_data.json.
    #[arg(long, env = "GROWROOM_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Defaults to `<data-dir>/photos`.
    #[arg(long, env = "GROWROOM_PHOTO_DIR")]
    pub photo_dir: Option<PathBuf>,

    /// Older photos shown next to the latest one.
    #[arg(long, env = "GROWROOM_PHOTO_HISTORY", default_value_t = 5)]
    pub photo_history: usize,

    #[arg(long, env = "GROWROOM_HARDWARE", value_enum, default_value = "simulated")]
    pub hardware: HardwareMode,

    #[arg(long, env = "GROWROOM_GPIO_ROOT", default_value = "/sys/class/gpio")]
    pub gpio_root: PathBuf,

    #[arg(long, env = "GROWROOM_LIGHT_PIN", default_value_t = 17)]
    pub light_pin: u32,

    #[arg(long, env = "GROWROOM_FAN_PIN", default_value_t = 27)]
    pub fan_pin: u32,

    #[arg(long, env = "GROWROOM_PUMP_PIN", default_value_t = 22)]
    pub pump_pin: u32,

    #[arg(long, env = "GROWROOM_CAMERA_PROGRAM", default_value = "libcamera-still")]
    pub camera_program: String,

    #[arg(long, env = "GROWROOM_CAMERA_WIDTH", default_value_t = 1024)]
    pub camera_width: u32,

    #[arg(long, env = "GROWROOM_CAMERA_HEIGHT", default_value_t = 768)]
    pub camera_height: u32,

    #[arg(long, env = "GROWROOM_CAMERA_WARMUP_MS", default_value_t = 2000)]
    pub camera_warmup_ms: u64,

    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    pub telegram_bot_token: Option<String>,

    #[arg(long, env = "TELEGRAM_CHAT_ID")]
    pub telegram_chat_id: Option<String>,

    #[arg(long, env = "GROWROOM_NOTIFY_TIMEOUT_SECS", default_value_t = 10)]
    pub notify_timeout_secs: u64,

    /// Sensor readings kept in memory.
    #[arg(long, env = "GROWROOM_SENSOR_HISTORY", default_value_t = 288)]
    pub sensor_history: usize,

    #[arg(long, env = "GROWROOM_LOG_JSON")]
    pub log_json: bool,
}

impl Config {
    pub fn plants_path(&self) -> PathBuf {
        self.data_dir.join("plants.json")
    }

    pub fn calendar_path(&self) -> PathBuf {
        self.data_dir.join("calendar_data.json")
    }

    pub fn photo_dir(&self) -> PathBuf {
        self.photo_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("photos"))
    }

    pub fn camera_warmup(&self) -> Duration {
        Duration::from_millis(self.camera_warmup_ms)
    }

    pub fn notify_timeout(&self) -> Duration {
        Duration::from_secs(self.notify_timeout_secs)
    }

    /// Bot token and chat id, when both are set and non-empty.
    pub fn telegram(&self) -> Option<(String, String)> {
        let token = self.telegram_bot_token.as_deref().map(str::trim)?;
        let chat = self.telegram_chat_id.as_deref().map(str::trim)?;
        if token.is_empty() || chat.is_empty() {
            return None;
        }
        Some((token.to_string(), chat.to_string()))
    }
}
