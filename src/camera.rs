// ABOUTME: Still-camera capability used by the photo archive
// ABOUTME: Shells out to a capture program on the Pi, or writes a placeholder when simulated

use anyhow::{bail, Context};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;

#[async_trait]
pub trait Camera: Send + Sync {
    /// Writes one JPEG still to `path`.
    async fn capture(&self, path: &Path) -> anyhow::Result<()>;
}

#[derive(Debug, Clone)]
pub struct CommandCamera {
    pub program: String,
    pub width: u32,
    pub height: u32,
    pub warmup: Duration,
}

impl CommandCamera {
    fn timeout(&self) -> Duration {
        self.warmup + Duration::from_secs(10)
    }
}

#[async_trait]
impl Camera for CommandCamera {
    async fn capture(&self, path: &Path) -> anyhow::Result<()> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-o")
            .arg(path)
            .arg("--width")
            .arg(self.width.to_string())
            .arg("--height")
            .arg(self.height.to_string())
            .arg("-t")
            .arg(self.warmup.as_millis().to_string())
            .arg("-n")
            .kill_on_drop(true);

        tracing::debug!(program = %self.program, path = %path.display(), "starting capture");
        let output = tokio::time::timeout(self.timeout(), cmd.output())
            .await
            .with_context(|| format!("{} timed out after {:?}", self.program, self.timeout()))?
            .with_context(|| format!("running {}", self.program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("{} exited with {}: {}", self.program, output.status, stderr.trim());
        }
        let written = tokio::fs::metadata(path).await.map(|m| m.len()).unwrap_or(0);
        if written == 0 {
            bail!("{} reported success but wrote no image", self.program);
        }
        Ok(())
    }
}

/// Minimal valid JPEG (1x1, grey).
const PLACEHOLDER_JPEG: &[u8] = &[
    0xFF, 0xD8, 0xFF, 0xDB, 0x00, 0x43, 0x00, 0x08, 0x06, 0x06, 0x07, 0x06, 0x05, 0x08, 0x07, 0x07,
    0x07, 0x09, 0x09, 0x08, 0x0A, 0x0C, 0x14, 0x0D, 0x0C, 0x0B, 0x0B, 0x0C, 0x19, 0x12, 0x13, 0x0F,
    0x14, 0x1D, 0x1A, 0x1F, 0x1E, 0x1D, 0x1A, 0x1C, 0x1C, 0x20, 0x24, 0x2E, 0x27, 0x20, 0x22, 0x2C,
    0x23, 0x1C, 0x1C, 0x28, 0x37, 0x29, 0x2C, 0x30, 0x31, 0x34, 0x34, 0x34, 0x1F, 0x27, 0x39, 0x3D,
    0x38, 0x32, 0x3C, 0x2E, 0x33, 0x34, 0x32, 0xFF, 0xC0, 0x00, 0x0B, 0x08, 0x00, 0x01, 0x00, 0x01,
    0x01, 0x01, 0x11, 0x00, 0xFF, 0xC4, 0x00, 0x14, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x09, 0xFF, 0xC4, 0x00, 0x14,
    0x10, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0xFF, 0xDA, 0x00, 0x08, 0x01, 0x01, 0x00, 0x00, 0x3F, 0x00, 0xD2, 0xCF, 0x20, 0xFF,
    0xD9,
];

/// Writes a placeholder image instead of touching hardware.
#[derive(Debug, Clone, Default)]
pub struct SimulatedCamera;

#[async_trait]
impl Camera for SimulatedCamera {
    async fn capture(&self, path: &Path) -> anyhow::Result<()> {
        tokio::fs::write(path, PLACEHOLDER_JPEG)
            .await
            .with_context(|| format!("writing {}", path.display()))
    }
}
