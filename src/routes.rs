// ABOUTME: HTTP routes binding plants, calendars, devices, photos and sensor readings
// ABOUTME: Handlers receive every collaborator through AppState so hardware can be swapped in tests

use axum::{
    extract::{
        rejection::{FormRejection, JsonRejection, QueryRejection},
        Path, Query, State,
    },
    response::{Json, Redirect},
    routing::{get, post, put},
    Form, Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::calendar::{CalendarBook, PlantCalendar};
use crate::camera::Camera;
use crate::devices::{Device, DeviceController, DeviceState};
use crate::error::{AppError, Result};
use crate::notifier::{notify_best_effort, Notifier};
use crate::photos::{PhotoArchive, PhotoInfo};
use crate::plants::{NewPlant, Plant, PlantRepository, Stage};
use crate::presets;
use crate::sensors::{RecordedReading, SensorLog, SensorReading};
use crate::types::*;

const DEFAULT_SENSOR_HISTORY: usize = 24;

// Extractors whose rejections become `AppError::InvalidRequest` through `?`.
type JsonBody<T> = std::result::Result<Json<T>, JsonRejection>;
type FormBody<T> = std::result::Result<Form<T>, FormRejection>;
type QueryParams<T> = std::result::Result<Query<T>, QueryRejection>;

#[derive(Clone)]
pub struct AppState {
    pub plants: Arc<dyn PlantRepository>,
    pub calendar: Arc<CalendarBook>,
    pub devices: Arc<DeviceController>,
    pub photos: Arc<PhotoArchive>,
    pub camera: Arc<dyn Camera>,
    pub notifier: Arc<dyn Notifier>,
    pub sensors: Arc<SensorLog>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/", get(list_plants))
        .route("/add-plant", post(add_plant))
        .route("/plant/:plant_id", get(view_plant))
        .route("/api/plants", get(list_plants))
        .route("/api/plants/:plant_id", get(get_plant).delete(delete_plant))
        .route("/api/plants/:plant_id/stage", put(set_stage))
        .route("/api/presets", get(list_presets))
        .route(
            "/api/calendar/:plant_id",
            get(get_calendar)
                .post(update_calendar)
                .put(add_calendar)
                .delete(delete_calendar),
        )
        .route("/api/calendar/generate/:plant_id", post(generate_calendar))
        .route("/control", post(control))
        .route("/api/devices", get(list_devices))
        .route("/api/devices/:device", put(set_device))
        .route("/capture/:plant_id", post(capture))
        .route("/latest-photo", get(latest_photo))
        .route("/photo/:filename", get(photo_info))
        .route("/sensor-data", post(receive_sensor_data))
        .route("/api/sensor-data", get(latest_sensor_data))
        .route("/api/sensor-data/history", get(sensor_history))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "Server is running".to_string(),
        timestamp: chrono::Utc::now(),
    })
}

async fn find_plant(state: &AppState, plant_id: &str) -> Result<Plant> {
    state
        .plants
        .get(plant_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Plant not found: {}", plant_id)))
}

// Plants

async fn list_plants(State(state): State<AppState>) -> Result<Json<Vec<Plant>>> {
    Ok(Json(state.plants.list().await?))
}

async fn get_plant(
    Path(plant_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Plant>> {
    Ok(Json(find_plant(&state, &plant_id).await?))
}

async fn add_plant(State(state): State<AppState>, form: FormBody<NewPlant>) -> Result<Redirect> {
    let Form(form) = form?;
    state.plants.add(form).await?;
    Ok(Redirect::to("/"))
}

async fn set_stage(
    Path(plant_id): Path<String>,
    State(state): State<AppState>,
    req: JsonBody<SetStageRequest>,
) -> Result<Json<Plant>> {
    let Json(req) = req?;
    let stage: Stage = req.stage.parse()?;
    Ok(Json(state.plants.set_stage(&plant_id, stage).await?))
}

/// Removes the plant and its calendar. Photos stay in the archive.
async fn delete_plant(
    Path(plant_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<SuccessResponse>> {
    let plant = state.plants.remove(&plant_id).await?;
    state.calendar.remove_all(&plant.id).await?;
    Ok(Json(SuccessResponse::ok()))
}

async fn view_plant(
    Path(plant_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<PlantView>> {
    let plant = find_plant(&state, &plant_id).await?;
    let photos = state.photos.listing(&plant.id).await;
    Ok(Json(PlantView { plant, photos }))
}

async fn list_presets() -> Json<Vec<StagePreset>> {
    Json(
        presets::catalog()
            .into_iter()
            .map(|(stage, tasks)| StagePreset { stage, tasks })
            .collect(),
    )
}

// Calendar

async fn get_calendar(
    Path(plant_id): Path<String>,
    State(state): State<AppState>,
) -> Json<PlantCalendar> {
    Json(state.calendar.get(&plant_id).await)
}

async fn generate_calendar(
    Path(plant_id): Path<String>,
    State(state): State<AppState>,
    req: JsonBody<GenerateCalendarRequest>,
) -> Result<Json<SuccessResponse>> {
    let Json(req) = req?;
    let (Some(start_date), Some(stage)) = (req.start_date.as_deref(), req.stage.as_deref()) else {
        return Err(AppError::InvalidRequest("Invalid request".to_string()));
    };
    state.calendar.generate(&plant_id, stage, start_date).await?;
    Ok(Json(SuccessResponse::ok()))
}

async fn update_calendar(
    Path(plant_id): Path<String>,
    State(state): State<AppState>,
    req: JsonBody<CalendarEntryRequest>,
) -> Result<Json<SuccessResponse>> {
    let Json(req) = req?;
    state
        .calendar
        .update(&plant_id, req.date.as_deref(), req.action.as_deref())
        .await?;
    Ok(Json(SuccessResponse::ok()))
}

async fn add_calendar(
    Path(plant_id): Path<String>,
    State(state): State<AppState>,
    req: JsonBody<CalendarEntryRequest>,
) -> Result<Json<SuccessResponse>> {
    let Json(req) = req?;
    state
        .calendar
        .upsert(&plant_id, req.date.as_deref(), req.action.as_deref())
        .await?;
    Ok(Json(SuccessResponse::ok()))
}

async fn delete_calendar(
    Path(plant_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<SuccessResponse>> {
    state.calendar.remove_all(&plant_id).await?;
    Ok(Json(SuccessResponse::ok()))
}

// Devices

async fn control(
    State(state): State<AppState>,
    req: JsonBody<ControlRequest>,
) -> Result<Json<ControlResponse>> {
    let Json(req) = req?;
    let device: Device = req
        .device
        .as_deref()
        .ok_or_else(|| AppError::InvalidRequest("device is required".to_string()))?
        .parse()?;
    let on = state
        .devices
        .run_blocking(move |devices| devices.toggle(device))
        .await?;
    Ok(Json(ControlResponse {
        status: "ok".to_string(),
        device,
        on,
    }))
}

async fn list_devices(State(state): State<AppState>) -> Result<Json<Vec<DeviceState>>> {
    Ok(Json(state.devices.run_blocking(|devices| devices.states()).await?))
}

async fn set_device(
    Path(device): Path<String>,
    State(state): State<AppState>,
    req: JsonBody<SetDeviceRequest>,
) -> Result<Json<DeviceState>> {
    let Json(req) = req?;
    let device: Device = device.parse()?;
    let current = state
        .devices
        .run_blocking(move |devices| {
            devices.set(device, req.on)?;
            devices.state(device)
        })
        .await?;
    Ok(Json(current))
}

// Photos

async fn capture(
    Path(plant_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Redirect> {
    let plant = find_plant(&state, &plant_id).await?;
    let path = state.photos.capture(&plant, state.camera.as_ref()).await?;

    notify_best_effort(
        state.notifier.as_ref(),
        &format!("New photo for plant {}", plant.name),
        Some(&path),
    )
    .await;

    Ok(Redirect::to(&format!("/plant/{}", plant.id)))
}

async fn latest_photo(State(state): State<AppState>) -> Result<Json<PhotoInfo>> {
    state
        .photos
        .latest_overall()
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("No photos available".to_string()))
}

async fn photo_info(
    Path(filename): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<PhotoInfo>> {
    Ok(Json(state.photos.info(&filename).await?))
}

// Sensors

async fn receive_sensor_data(
    State(state): State<AppState>,
    reading: JsonBody<SensorReading>,
) -> Result<Json<MessageResponse>> {
    let Json(reading) = reading?;
    let recorded = state.sensors.record(reading);
    tracing::info!(
        temperature = recorded.reading.temperature,
        humidity = recorded.reading.humidity,
        soil_moisture = recorded.reading.soil_moisture,
        "sensor data received"
    );
    Ok(Json(MessageResponse {
        message: "Sensor data received".to_string(),
    }))
}

async fn latest_sensor_data(State(state): State<AppState>) -> Result<Json<RecordedReading>> {
    state
        .sensors
        .latest()
        .map(Json)
        .ok_or_else(|| AppError::NotFound("No sensor data yet".to_string()))
}

async fn sensor_history(
    State(state): State<AppState>,
    query: QueryParams<HistoryQuery>,
) -> Result<Json<Vec<RecordedReading>>> {
    let Query(query) = query?;
    Ok(Json(
        state
            .sensors
            .history(query.limit.unwrap_or(DEFAULT_SENSOR_HISTORY)),
    ))
}
