use crate::config::TelegramCredentials;
use anyhow::Context;
use reqwest::multipart::{Form, Part};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.telegram.org";
const SEND_TIMEOUT: Duration = Duration::from_secs(60);

#[async_trait::async_trait]
pub trait PhotoSender: Send + Sync {
    async fn send_photo(&self, image: &Path, caption: &str) -> anyhow::Result<()>;
}

#[derive(Debug, Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    base_url: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramClient {
    pub fn from_credentials(creds: &TelegramCredentials) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(SEND_TIMEOUT)
            .timeout(SEND_TIMEOUT)
            .build()
            .context("failed to build telegram http client")?;

        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            bot_token: creds.bot_token.clone(),
            chat_id: creds.chat_id.clone(),
        })
    }
}

#[async_trait::async_trait]
impl PhotoSender for TelegramClient {
    async fn send_photo(&self, image: &Path, caption: &str) -> anyhow::Result<()> {
        let bytes = tokio::fs::read(image)
            .await
            .with_context(|| format!("failed to read {}", image.display()))?;
        let file_name = image
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "report.png".to_string());

        let form = Form::new()
            .text("chat_id", self.chat_id.clone())
            .text("caption", caption.to_string())
            .part(
                "photo",
                Part::bytes(bytes).file_name(file_name).mime_str("image/png")?,
            );

        let url = format!("{}/bot{}/sendPhoto", self.base_url, self.bot_token);
        let res = self
            .http
            .post(url)
            .multipart(form)
            .send()
            .await
            // The URL carries the bot token.
            .map_err(reqwest::Error::without_url)
            .context("telegram sendPhoto request failed")?;

        let status = res.status();
        if !status.is_success() {
            let body = res
                .text()
                .await
                .map_err(reqwest::Error::without_url)
                .unwrap_or_default();
            anyhow::bail!("telegram sendPhoto HTTP {status}: {body}");
        }
        Ok(())
    }
}

pub fn caption_for(index: usize) -> String {
    format!("📊 US Market Daily Part {}", index + 1)
}

/// Sends every image in order, captioned "Part N".
pub async fn deliver_images(
    sender: &dyn PhotoSender,
    images: &[PathBuf],
) -> anyhow::Result<usize> {
    for (i, image) in images.iter().enumerate() {
        sender
            .send_photo(image, &caption_for(i))
            .await
            .with_context(|| format!("failed to deliver {}", image.display()))?;
        tracing::info!(image = %image.display(), part = i + 1, "image sent");
    }
    Ok(images.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingSender;

    #[test]
    fn captions_are_one_based() {
        assert!(caption_for(0).ends_with("Part 1"));
        assert!(caption_for(1).ends_with("Part 2"));
    }

    #[tokio::test]
    async fn send_errors_do_not_expose_bot_token() {
        let client = TelegramClient {
            http: reqwest::Client::new(),
            base_url: "http://127.0.0.1:1".to_string(),
            bot_token: "123456:SECRET-BOT-TOKEN".to_string(),
            chat_id: "-100".to_string(),
        };
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("r_part1.png");
        std::fs::write(&image, b"png").unwrap();

        let err = deliver_images(&client, &[image]).await.unwrap_err();
        let text = format!("{err:#} {err:?}");
        assert!(text.contains("sendPhoto request failed"));
        assert!(!text.contains("SECRET-BOT-TOKEN"));
    }

    #[tokio::test]
    async fn delivers_in_order_with_part_captions() {
        let sender = RecordingSender::default();
        let images = vec![PathBuf::from("a_part1.png"), PathBuf::from("a_part2.png")];
        let n = deliver_images(&sender, &images).await.unwrap();
        assert_eq!(n, 2);

        let sent = sender.sent();
        assert_eq!(sent[0].0, PathBuf::from("a_part1.png"));
        assert!(sent[0].1.ends_with("Part 1"));
        assert!(sent[1].1.ends_with("Part 2"));
    }
}
