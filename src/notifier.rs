// ABOUTME: Outbound chat notifications (text, then an optional photo) via the Telegram bot API
// ABOUTME: Delivery is best effort; failures are logged and never reach the caller

use anyhow::{bail, Context};
use async_trait::async_trait;
use reqwest::multipart;
use std::path::Path;
use std::time::Duration;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, text: &str, photo: Option<&Path>) -> anyhow::Result<()>;
}

/// Sends through `notifier`, logging instead of returning any failure.
pub async fn notify_best_effort(notifier: &dyn Notifier, text: &str, photo: Option<&Path>) {
    if let Err(err) = notifier.notify(text, photo).await {
        tracing::error!("notification failed: {:#}", err);
    }
}

pub struct TelegramNotifier {
    client: reqwest::Client,
    api_base: String,
    token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub const API_BASE: &'static str = "https://api.telegram.org";

    pub fn new(token: String, chat_id: String, timeout: Duration) -> anyhow::Result<Self> {
        Self::with_api_base(Self::API_BASE.to_string(), token, chat_id, timeout)
    }

    pub fn with_api_base(
        api_base: String,
        token: String,
        chat_id: String,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("building Telegram HTTP client")?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            token,
            chat_id,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    async fn send_message(&self, text: &str) -> anyhow::Result<()> {
        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .form(&[("chat_id", self.chat_id.as_str()), ("text", text)])
            .send()
            .await
            .context("sendMessage request")?;
        if !response.status().is_success() {
            bail!("sendMessage returned {}", response.status());
        }
        tracing::info!("sent Telegram message: {}", text);
        Ok(())
    }

    async fn send_photo(&self, path: &Path) -> anyhow::Result<()> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "photo.jpg".to_string());
        let part = multipart::Part::bytes(bytes)
            .file_name(filename)
            .mime_str("image/jpeg")?;
        let form = multipart::Form::new()
            .text("chat_id", self.chat_id.clone())
            .part("photo", part);

        let response = self
            .client
            .post(self.method_url("sendPhoto"))
            .multipart(form)
            .send()
            .await
            .context("sendPhoto request")?;
        if !response.status().is_success() {
            bail!("sendPhoto returned {}", response.status());
        }
        tracing::info!(path = %path.display(), "sent Telegram photo");
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, text: &str, photo: Option<&Path>) -> anyhow::Result<()> {
        self.send_message(text).await?;
        if let Some(path) = photo {
            if tokio::fs::try_exists(path).await.unwrap_or(false) {
                self.send_photo(path).await?;
            }
        }
        Ok(())
    }
}

/// Used when no bot credentials are configured.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, text: &str, photo: Option<&Path>) -> anyhow::Result<()> {
        tracing::info!(
            photo = ?photo.map(|p| p.display().to_string()),
            "notification (no chat configured): {}",
            text
        );
        Ok(())
    }
}
