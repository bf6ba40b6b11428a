//! Seams between the relay pipeline and the chat platform
//!
//! The pipeline only ever talks to the platform through these two traits:
//! [`Replier`] is bound to the conversation an event came from, and
//! [`AttachmentSource`] turns an [`AttachmentRef`] into bytes on disk.

use crate::event::AttachmentRef;
use crate::fetcher::FetchError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ReplyError {
    #[error("Discord API error: {0}")]
    Discord(#[from] serenity::Error),
}

/// Sends messages back to the conversation of one event
#[async_trait]
pub trait Replier: Send + Sync {
    /// Show a "typing" indicator. Best effort.
    async fn send_typing(&self) -> Result<(), ReplyError>;

    async fn reply(&self, text: &str) -> Result<(), ReplyError>;
}

/// Retrieves attachment bytes from the platform
#[async_trait]
pub trait AttachmentSource: Send + Sync {
    /// Write the whole attachment into `dest`, returning the byte count.
    ///
    /// Stops with [`FetchError::TooLarge`] as soon as more than `max_bytes`
    /// would be written.
    async fn download(
        &self,
        attachment: &AttachmentRef,
        dest: &mut File,
        max_bytes: Option<u64>,
    ) -> Result<u64, FetchError>;
}

/// Downloads attachments from their CDN URL
pub struct HttpAttachmentSource {
    client: Client,
}

impl HttpAttachmentSource {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl AttachmentSource for HttpAttachmentSource {
    async fn download(
        &self,
        attachment: &AttachmentRef,
        dest: &mut File,
        max_bytes: Option<u64>,
    ) -> Result<u64, FetchError> {
        let mut response = self.client.get(&attachment.url).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await? {
            let size = written + chunk.len() as u64;
            if let Some(limit) = max_bytes.filter(|&limit| size > limit) {
                return Err(FetchError::TooLarge { size, limit });
            }
            dest.write_all(&chunk).await?;
            written = size;
        }
        dest.flush().await?;

        debug!("Downloaded attachment {} ({} bytes)", attachment.id, written);
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    fn attachment(url: String) -> AttachmentRef {
        AttachmentRef {
            id: 1,
            url,
            filename: "voice-message.ogg".to_string(),
            size: 4,
            content_type: Some("audio/ogg".to_string()),
        }
    }

    #[tokio::test]
    async fn test_http_download() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/attachments/voice.ogg")
            .with_status(200)
            .with_body("OggS")
            .create_async()
            .await;

        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("out.ogg");
        let mut file = File::create(&path).await.unwrap();

        let source = HttpAttachmentSource::new().unwrap();
        let url = format!("{}/attachments/voice.ogg", server.url());
        let written = source.download(&attachment(url), &mut file, None).await.unwrap();
        assert_eq!(written, 4);
        mock.assert_async().await;

        let mut content = String::new();
        File::open(&path).await.unwrap().read_to_string(&mut content).await.unwrap();
        assert_eq!(content, "OggS");
    }

    #[tokio::test]
    async fn test_http_download_status_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/attachments/gone.ogg")
            .with_status(404)
            .create_async()
            .await;

        let temp = tempfile::tempdir().unwrap();
        let mut file = File::create(temp.path().join("out.ogg")).await.unwrap();

        let source = HttpAttachmentSource::new().unwrap();
        let url = format!("{}/attachments/gone.ogg", server.url());
        let err = source.download(&attachment(url), &mut file, None).await.unwrap_err();
        assert!(matches!(err, FetchError::Status(404)));
    }

    #[tokio::test]
    async fn test_http_download_stops_at_limit() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/attachments/big.ogg")
            .with_status(200)
            .with_body(vec![0u8; 64 * 1024])
            .create_async()
            .await;

        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("out.ogg");
        let mut file = File::create(&path).await.unwrap();

        // Declared size understates the real body
        let source = HttpAttachmentSource::new().unwrap();
        let url = format!("{}/attachments/big.ogg", server.url());
        let err = source
            .download(&attachment(url), &mut file, Some(1024))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::TooLarge { limit: 1024, .. }));
        assert!(std::fs::metadata(&path).unwrap().len() <= 1024);
    }
}
