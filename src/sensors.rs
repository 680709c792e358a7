// ABOUTME: Environment readings relayed by the companion client
// ABOUTME: Keeps a bounded, newest-last history in memory; nothing is persisted

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Degrees Celsius.
    pub temperature: f64,
    /// Relative humidity, percent.
    pub humidity: f64,
    #[serde(alias = "soilMoisture")]
    pub soil_moisture: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RecordedReading {
    #[serde(flatten)]
    pub reading: SensorReading,
    pub recorded_at: DateTime<Utc>,
}

pub struct SensorLog {
    capacity: usize,
    readings: RwLock<VecDeque<RecordedReading>>,
}

impl SensorLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            readings: RwLock::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn record(&self, reading: SensorReading) -> RecordedReading {
        let recorded = RecordedReading {
            reading,
            recorded_at: Utc::now(),
        };
        let mut readings = self.readings.write().unwrap_or_else(|e| e.into_inner());
        if readings.len() == self.capacity {
            readings.pop_front();
        }
        readings.push_back(recorded);
        recorded
    }

    pub fn latest(&self) -> Option<RecordedReading> {
        self.readings
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .back()
            .copied()
    }

    /// Up to `limit` readings, newest first.
    pub fn history(&self, limit: usize) -> Vec<RecordedReading> {
        self.readings
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .rev()
            .take(limit)
            .copied()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(temperature: f64) -> SensorReading {
        SensorReading {
            temperature,
            humidity: 60.0,
            soil_moisture: 40.0,
        }
    }

    #[test]
    fn test_history_is_bounded_and_newest_first() {
        let log = SensorLog::new(3);
        for t in 1..=5 {
            log.record(reading(t as f64));
        }

        let temps: Vec<f64> = log
            .history(10)
            .iter()
            .map(|r| r.reading.temperature)
            .collect();
        assert_eq!(temps, vec![5.0, 4.0, 3.0]);
        assert_eq!(log.latest().unwrap().reading.temperature, 5.0);
        assert_eq!(log.history(1).len(), 1);
    }

    #[test]
    fn test_camel_case_soil_moisture_accepted() {
        let parsed: SensorReading =
            serde_json::from_str(r#"{"temperature":22,"humidity":65,"soilMoisture":45}"#).unwrap();
        assert_eq!(parsed.soil_moisture, 45.0);
    }

    #[test]
    fn test_empty_log() {
        let log = SensorLog::new(0);
        assert!(log.latest().is_none());
        assert!(log.history(5).is_empty());
    }
}
