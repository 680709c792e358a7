// ABOUTME: JSON document persistence for the plant list and the calendar map
// ABOUTME: Writes go to a sibling temp file that is fsynced and renamed over the target

use serde::{de::DeserializeOwned, Serialize};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};

/// A single JSON document on disk.
///
/// Missing files read as `T::default()`. A file that exists but cannot be
/// decoded is either surfaced as `StorageFailure` (`load`) or logged and
/// replaced by the default (`load_or_default`); callers that are about to
/// rewrite the document must use `load` so a corrupt file is never silently
/// overwritten with a partial view.
#[derive(Debug, Clone)]
pub struct JsonStore<T> {
    path: PathBuf,
    _doc: PhantomData<fn() -> T>,
}

impl<T> JsonStore<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _doc: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Result<T> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "document not found, using empty default");
                return Ok(T::default());
            }
            Err(err) => {
                return Err(AppError::StorageFailure(format!(
                    "reading {}: {}",
                    self.path.display(),
                    err
                )))
            }
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(T::default());
        }

        serde_json::from_slice(&bytes).map_err(|err| {
            AppError::StorageFailure(format!("decoding {}: {}", self.path.display(), err))
        })
    }

    pub async fn load_or_default(&self) -> T {
        match self.load().await {
            Ok(doc) => doc,
            Err(err) => {
                tracing::error!(path = %self.path.display(), "{}; falling back to empty document", err);
                T::default()
            }
        }
    }

    pub async fn save(&self, doc: &T) -> Result<()> {
        let json = serde_json::to_vec_pretty(doc)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = self.temp_path();
        let write = async {
            let mut file = tokio::fs::File::create(&tmp).await?;
            file.write_all(&json).await?;
            file.write_all(b"\n").await?;
            file.sync_all().await?;
            drop(file);
            tokio::fs::rename(&tmp, &self.path).await
        };

        if let Err(err) = write.await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(AppError::StorageFailure(format!(
                "writing {}: {}",
                self.path.display(),
                err
            )));
        }

        tracing::debug!(path = %self.path.display(), bytes = json.len(), "document saved");
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(format!(".tmp.{}", std::process::id()));
        self.path.with_file_name(name)
    }
}
