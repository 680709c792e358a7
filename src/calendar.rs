// ABOUTME: Per-plant care calendars: preset projection and ad hoc date/task edits
// ABOUTME: Every mutation is a locked read-modify-write of the whole calendar document

use chrono::{Days, NaiveDate};
use std::collections::BTreeMap;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::plants::Stage;
use crate::presets;
use crate::storage::JsonStore;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// ISO date (`YYYY-MM-DD`) to task description.
pub type PlantCalendar = BTreeMap<String, String>;

/// Plant id to that plant's calendar.
pub type CalendarDocument = BTreeMap<String, PlantCalendar>;

pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_| AppError::InvalidRequest(format!("Invalid date: {}", raw)))
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

/// Dated tasks for `stage` starting at `start`, in preset order.
pub fn project(stage: Stage, start: NaiveDate) -> Result<Vec<(String, &'static str)>> {
    presets::preset(stage)
        .iter()
        .map(|entry| {
            start
                .checked_add_days(Days::new(u64::from(entry.offset)))
                .map(|date| (format_date(date), entry.task))
                .ok_or_else(|| AppError::InvalidRequest("start_date out of range".to_string()))
        })
        .collect()
}

pub struct CalendarBook {
    store: JsonStore<CalendarDocument>,
    write_lock: Mutex<()>,
}

impl CalendarBook {
    pub fn new(store: JsonStore<CalendarDocument>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// The plant's calendar, or an empty one. Unreadable storage is logged
    /// and reads as empty.
    pub async fn get(&self, plant_id: &str) -> PlantCalendar {
        let mut doc = self.store.load_or_default().await;
        doc.remove(plant_id).unwrap_or_default()
    }

    /// Seeds the plant's calendar from a stage preset. Existing entries on the
    /// projected dates are overwritten; other dates are kept.
    pub async fn generate(&self, plant_id: &str, stage: &str, start_date: &str) -> Result<()> {
        if is_blank(stage) || is_blank(start_date) {
            return Err(AppError::InvalidRequest("Invalid request".to_string()));
        }
        let stage: Stage = stage
            .parse()
            .map_err(|_| AppError::InvalidRequest("Invalid request".to_string()))?;
        let start = parse_date(start_date)?;
        let entries = project(stage, start)?;

        self.modify(|doc| {
            let calendar = doc.entry(plant_id.to_string()).or_default();
            for (date, task) in entries {
                calendar.insert(date, task.to_string());
            }
            true
        })
        .await?;

        tracing::info!(plant_id = %plant_id, stage = %stage, start = %start, "calendar generated");
        Ok(())
    }

    /// Strict add/replace of one entry; both fields must be present and non-blank.
    pub async fn upsert(&self, plant_id: &str, date: Option<&str>, task: Option<&str>) -> Result<()> {
        let (date, task) = match (date, task) {
            (Some(d), Some(t)) if !is_blank(d) && !is_blank(t) => (d, t),
            _ => {
                return Err(AppError::InvalidRequest(
                    "Date and action are required".to_string(),
                ))
            }
        };
        let key = format_date(parse_date(date)?);

        self.modify(|doc| {
            doc.entry(plant_id.to_string())
                .or_default()
                .insert(key.clone(), task.to_string());
            true
        })
        .await?;

        tracing::info!(plant_id = %plant_id, date = %key, "calendar entry added");
        Ok(())
    }

    /// Sets the entry for `date`, or removes it when `action` is blank.
    /// Removing a date that has no entry succeeds without touching storage.
    pub async fn update(&self, plant_id: &str, date: Option<&str>, action: Option<&str>) -> Result<()> {
        let date = date
            .filter(|d| !is_blank(d))
            .ok_or_else(|| AppError::InvalidRequest("Date is required".to_string()))?;
        let action =
            action.ok_or_else(|| AppError::InvalidRequest("Action is required".to_string()))?;

        if is_blank(action) {
            // Legacy keys may not parse; match them verbatim before normalizing.
            let normalized = parse_date(date).ok().map(format_date);
            let removed = self
                .modify(|doc| {
                    let Some(calendar) = doc.get_mut(plant_id) else {
                        return false;
                    };
                    let verbatim = calendar.remove(date.trim()).is_some();
                    let canonical = normalized
                        .as_deref()
                        .is_some_and(|key| calendar.remove(key).is_some());
                    verbatim || canonical
                })
                .await?;
            tracing::info!(plant_id = %plant_id, date = %date, removed, "calendar entry cleared");
            return Ok(());
        }

        let key = format_date(parse_date(date)?);
        self.modify(|doc| {
            doc.entry(plant_id.to_string())
                .or_default()
                .insert(key.clone(), action.to_string());
            true
        })
        .await?;

        tracing::info!(plant_id = %plant_id, date = %key, "calendar entry updated");
        Ok(())
    }

    /// Drops the plant's whole calendar. Absent calendars are a successful no-op.
    pub async fn remove_all(&self, plant_id: &str) -> Result<()> {
        let removed = self.modify(|doc| doc.remove(plant_id).is_some()).await?;
        if removed {
            tracing::info!(plant_id = %plant_id, "calendar deleted");
        }
        Ok(())
    }

    /// Applies `change` under the write lock and saves only when it reports a change.
    async fn modify<F>(&self, change: F) -> Result<bool>
    where
        F: FnOnce(&mut CalendarDocument) -> bool,
    {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.store.load().await?;
        let changed = change(&mut doc);
        if changed {
            self.store.save(&doc).await?;
        }
        Ok(changed)
    }
}
