// ABOUTME: Plant records, growth stages, and the repository handlers use to reach them
// ABOUTME: The JSON-backed registry caches the list in memory and persists every change

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::storage::JsonStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Seed,
    Veg,
    Flower,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Seed, Stage::Veg, Stage::Flower];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Seed => "seed",
            Stage::Veg => "veg",
            Stage::Flower => "flower",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "seed" => Ok(Stage::Seed),
            "veg" => Ok(Stage::Veg),
            "flower" => Ok(Stage::Flower),
            _ => Err(AppError::InvalidRequest("Invalid stage".to_string())),
        }
    }
}

/// Persisted shape: `{id, name, strain_type, location, stage}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plant {
    pub id: String,
    pub name: String,
    pub strain_type: String,
    pub location: String,
    pub stage: Stage,
}

/// Unvalidated input for a new plant, as submitted by the add-plant form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewPlant {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub strain_type: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub stage: String,
}

impl NewPlant {
    fn validate(&self) -> Result<(String, String, String, Stage)> {
        let name = self.name.trim();
        let strain_type = self.strain_type.trim();
        let location = self.location.trim();
        let stage = self.stage.trim();

        if [name, strain_type, location, stage].iter().any(|f| f.is_empty()) {
            return Err(AppError::InvalidRequest(
                "All fields are required".to_string(),
            ));
        }

        Ok((
            name.to_string(),
            strain_type.to_string(),
            location.to_string(),
            stage.parse()?,
        ))
    }
}

#[async_trait]
pub trait PlantRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<Plant>>;

    async fn get(&self, id: &str) -> Result<Option<Plant>>;

    async fn add(&self, new: NewPlant) -> Result<Plant>;

    async fn set_stage(&self, id: &str, stage: Stage) -> Result<Plant>;

    /// Deletes the plant and returns it.
    async fn remove(&self, id: &str) -> Result<Plant>;
}

pub type PlantList = Vec<Plant>;

/// Registry backed by `plants.json`, read once at startup.
///
/// Edits made to the file by other processes after startup are not picked
/// up; the server is the only writer.
pub struct JsonPlantRepository {
    store: JsonStore<PlantList>,
    plants: RwLock<PlantList>,
}

impl JsonPlantRepository {
    pub async fn open(store: JsonStore<PlantList>) -> Self {
        let plants = store.load_or_default().await;
        tracing::info!(
            path = %store.path().display(),
            count = plants.len(),
            "plant registry loaded"
        );
        Self {
            store,
            plants: RwLock::new(plants),
        }
    }
}

fn short_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

#[async_trait]
impl PlantRepository for JsonPlantRepository {
    async fn list(&self) -> Result<Vec<Plant>> {
        Ok(self.plants.read().await.clone())
    }

    async fn get(&self, id: &str) -> Result<Option<Plant>> {
        Ok(self.plants.read().await.iter().find(|p| p.id == id).cloned())
    }

    async fn add(&self, new: NewPlant) -> Result<Plant> {
        let (name, strain_type, location, stage) = new.validate()?;

        let mut plants = self.plants.write().await;
        let mut id = short_id();
        while plants.iter().any(|p| p.id == id) {
            id = short_id();
        }

        let plant = Plant {
            id,
            name,
            strain_type,
            location,
            stage,
        };

        let mut next = plants.clone();
        next.push(plant.clone());
        self.store.save(&next).await?;
        *plants = next;

        tracing::info!(plant_id = %plant.id, stage = %plant.stage, "plant added");
        Ok(plant)
    }

    async fn set_stage(&self, id: &str, stage: Stage) -> Result<Plant> {
        let mut plants = self.plants.write().await;
        let index = plants
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| AppError::NotFound("Plant not found".to_string()))?;

        let mut next = plants.clone();
        next[index].stage = stage;
        self.store.save(&next).await?;
        *plants = next;

        tracing::info!(plant_id = %id, stage = %stage, "plant stage changed");
        Ok(plants[index].clone())
    }

    async fn remove(&self, id: &str) -> Result<Plant> {
        let mut plants = self.plants.write().await;
        let index = plants
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| AppError::NotFound("Plant not found".to_string()))?;

        let mut next = plants.clone();
        let removed = next.remove(index);
        self.store.save(&next).await?;
        *plants = next;

        tracing::info!(plant_id = %id, "plant removed");
        Ok(removed)
    }
}
