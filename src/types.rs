// ABOUTME: Request and response payloads for the HTTP API
// ABOUTME: Optional fields stay optional here so handlers decide what is missing vs invalid

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::devices::Device;
use crate::photos::PhotoListing;
use crate::plants::{Plant, Stage};
use crate::presets::PresetTask;

// Calendar
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GenerateCalendarRequest {
    pub start_date: Option<String>,
    pub stage: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CalendarEntryRequest {
    pub date: Option<String>,
    pub action: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

// Plants
#[derive(Debug, Serialize, Deserialize)]
pub struct SetStageRequest {
    pub stage: String,
}

#[derive(Debug, Serialize)]
pub struct PlantView {
    pub plant: Plant,
    #[serde(flatten)]
    pub photos: PhotoListing,
}

#[derive(Debug, Serialize)]
pub struct StagePreset {
    pub stage: Stage,
    pub tasks: &'static [PresetTask],
}

// Devices
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ControlRequest {
    pub device: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ControlResponse {
    pub status: String,
    pub device: Device,
    pub on: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SetDeviceRequest {
    pub on: bool,
}

// Sensors
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

// Health
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}
