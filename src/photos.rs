// ABOUTME: Per-plant photo archive: capture to timestamped files and newest-first listings
// ABOUTME: Ordering is by file modification time, ties broken by the timestamp in the name

use chrono::{DateTime, Local, NaiveDateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use crate::camera::Camera;
use crate::error::{AppError, Result};
use crate::plants::Plant;

const EXTENSION: &str = ".jpg";
const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const PARTIAL_SUFFIX: &str = ".part";
const MAX_SAME_SECOND: u32 = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhotoInfo {
    pub filename: String,
    pub plant_id: Option<String>,
    pub captured_at: Option<NaiveDateTime>,
    pub modified: DateTime<Utc>,
    pub size: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PhotoListing {
    pub latest_photo: Option<String>,
    pub photo_history: Vec<String>,
}

/// Splits `<plant_id>_<YYYYmmdd>_<HHMMSS>[-N].jpg` into its plant id and timestamp.
/// `-N` marks the Nth extra photo taken within the same second.
pub fn parse_filename(filename: &str) -> Option<(&str, NaiveDateTime)> {
    let stem = filename.strip_suffix(EXTENSION)?;
    let mut parts = stem.rsplitn(3, '_');
    let time = parts.next()?;
    let time = time.split_once('-').map_or(time, |(hms, _)| hms);
    let date = parts.next()?;
    let plant_id = parts.next()?;
    let stamp = NaiveDateTime::parse_from_str(&format!("{}_{}", date, time), STAMP_FORMAT).ok()?;
    Some((plant_id, stamp))
}

fn sequence(filename: &str) -> u32 {
    filename
        .strip_suffix(EXTENSION)
        .and_then(|stem| stem.rsplit_once('-'))
        .and_then(|(_, n)| n.parse().ok())
        .unwrap_or(0)
}

fn newest_first(a: &PhotoInfo, b: &PhotoInfo) -> Ordering {
    b.modified
        .cmp(&a.modified)
        .then_with(|| b.captured_at.cmp(&a.captured_at))
        .then_with(|| sequence(&b.filename).cmp(&sequence(&a.filename)))
        .then_with(|| b.filename.cmp(&a.filename))
}

pub struct PhotoArchive {
    dir: PathBuf,
    history_len: usize,
}

impl PhotoArchive {
    pub fn new(dir: impl Into<PathBuf>, history_len: usize) -> Self {
        Self {
            dir: dir.into(),
            history_len,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn history_len(&self) -> usize {
        self.history_len
    }

    /// Archive name for a photo taken at `at`; `sequence` > 0 disambiguates
    /// photos taken within the same second.
    pub fn filename_for(plant_id: &str, at: NaiveDateTime, sequence: u32) -> String {
        if sequence == 0 {
            format!("{}_{}{}", plant_id, at.format(STAMP_FORMAT), EXTENSION)
        } else {
            format!("{}_{}-{}{}", plant_id, at.format(STAMP_FORMAT), sequence, EXTENSION)
        }
    }

    /// Claims an unused final name by creating its `.part` file exclusively.
    async fn reserve(&self, plant_id: &str, at: NaiveDateTime) -> Result<(PathBuf, PathBuf)> {
        for sequence in 0..MAX_SAME_SECOND {
            let path = self.dir.join(Self::filename_for(plant_id, at, sequence));
            if tokio::fs::try_exists(&path).await? {
                continue;
            }
            let mut partial = path.clone().into_os_string();
            partial.push(PARTIAL_SUFFIX);
            let partial = PathBuf::from(partial);

            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&partial)
                .await
            {
                Ok(_) => return Ok((partial, path)),
                Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(err) => return Err(err.into()),
            }
        }
        Err(AppError::HardwareFailure(format!(
            "too many captures for plant {} at {}",
            plant_id, at
        )))
    }

    /// Takes a photo of `plant` and returns the written path.
    ///
    /// The camera writes to a reserved `.part` file that is renamed into place
    /// only on success, so a failed capture never touches existing photos.
    pub async fn capture(&self, plant: &Plant, camera: &dyn Camera) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let (partial, path) = self
            .reserve(&plant.id, Local::now().naive_local())
            .await?;

        if let Err(err) = camera.capture(&partial).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(AppError::HardwareFailure(format!(
                "camera capture for plant {}: {:#}",
                plant.id, err
            )));
        }
        if let Err(err) = tokio::fs::rename(&partial, &path).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(err.into());
        }

        tracing::info!(plant_id = %plant.id, path = %path.display(), "photo captured");
        Ok(path)
    }

    async fn scan<F>(&self, keep: F) -> Result<Vec<PhotoInfo>>
    where
        F: Fn(&str) -> bool,
    {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut photos = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let Ok(filename) = entry.file_name().into_string() else {
                continue;
            };
            if !filename.ends_with(EXTENSION) || !keep(&filename) {
                continue;
            }
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            photos.push(self.describe(filename, &metadata)?);
        }

        photos.sort_by(newest_first);
        Ok(photos)
    }

    fn describe(&self, filename: String, metadata: &std::fs::Metadata) -> Result<PhotoInfo> {
        let modified: DateTime<Utc> = metadata.modified()?.into();
        let (plant_id, captured_at) = match parse_filename(&filename) {
            Some((id, at)) => (Some(id.to_string()), Some(at)),
            None => (None, None),
        };
        Ok(PhotoInfo {
            filename,
            plant_id,
            captured_at,
            modified,
            size: metadata.len(),
        })
    }

    /// All photos of one plant, newest first.
    pub async fn list(&self, plant_id: &str) -> Result<Vec<PhotoInfo>> {
        let prefix = format!("{}_", plant_id);
        self.scan(|name| name.starts_with(&prefix)).await
    }

    /// Latest photo plus up to `history_len` older ones. Listing errors are
    /// logged and read as an empty archive.
    pub async fn listing(&self, plant_id: &str) -> PhotoListing {
        match self.list(plant_id).await {
            Ok(photos) => {
                tracing::debug!(plant_id = %plant_id, count = photos.len(), "photos listed");
                let mut names = photos.into_iter().map(|p| p.filename);
                PhotoListing {
                    latest_photo: names.next(),
                    photo_history: names.take(self.history_len).collect(),
                }
            }
            Err(err) => {
                tracing::error!(plant_id = %plant_id, "listing photos failed: {}", err);
                PhotoListing::default()
            }
        }
    }

    /// Most recent photo across every plant.
    pub async fn latest_overall(&self) -> Result<Option<PhotoInfo>> {
        Ok(self.scan(|_| true).await?.into_iter().next())
    }

    /// Metadata for a single archived file.
    pub async fn info(&self, filename: &str) -> Result<PhotoInfo> {
        if filename.is_empty()
            || filename.contains(['/', '\\'])
            || filename.contains("..")
        {
            return Err(AppError::InvalidRequest("Invalid photo name".to_string()));
        }

        let metadata = match tokio::fs::metadata(self.dir.join(filename)).await {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => return Err(AppError::NotFound("Photo not found".to_string())),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(AppError::NotFound("Photo not found".to_string()))
            }
            Err(err) => return Err(err.into()),
        };
        self.describe(filename.to_string(), &metadata)
    }
}
