pub mod client;
pub mod image;
pub mod oauth;

use async_trait::async_trait;
use client::XClient;
use common::{
    build_http_client, Config, PipelineError, PipelineResult, PostReceipt, Publisher,
};
use image::download_image;
use oauth::OAuth1;
use reqwest::Client;
use std::path::Path;
use tracing::{info, warn};

pub struct XPublisher {
    http_client: Client,
    client: XClient,
}

impl XPublisher {
    pub fn new(config: &Config) -> PipelineResult<Self> {
        let http_client = build_http_client(config.http_timeout)
            .map_err(|e| PipelineError::Publish(format!("Failed to build HTTP client: {}", e)))?;
        let client = XClient::new(
            http_client.clone(),
            OAuth1::from_credentials(&config.social),
        );

        Ok(Self {
            http_client,
            client,
        })
    }

    pub fn with_endpoints(mut self, upload_url: &str, post_url: &str) -> Self {
        self.client = self.client.with_endpoints(upload_url, post_url);
        self
    }

    /// Fetches and uploads the image. A failed download means no image, not
    /// a failed post; a failed upload is a publish failure.
    async fn attach_image(&self, image_url: &str) -> PipelineResult<Option<String>> {
        let image = match download_image(&self.http_client, image_url).await {
            Ok(file) => file,
            Err(e) => {
                warn!("{}; posting without an image", e);
                return Ok(None);
            }
        };

        self.upload_saved_image(image.path()).await
    }

    /// Reads the saved image back and uploads it. An unreadable file means no
    /// image; only the upload call itself can fail the post.
    async fn upload_saved_image(&self, path: &Path) -> PipelineResult<Option<String>> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                let e = PipelineError::ImageDownload(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                ));
                warn!("{}; posting without an image", e);
                return Ok(None);
            }
        };
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image.jpg".to_string());

        let media_id = self.client.upload_media(bytes, &file_name).await?;
        info!("Image uploaded, media id {}", media_id);
        Ok(Some(media_id))
    }
}

#[async_trait]
impl Publisher for XPublisher {
    async fn publish(&self, text: &str, image_url: Option<&str>) -> PipelineResult<PostReceipt> {
        let media_id = match image_url {
            Some(url) => self.attach_image(url).await?,
            None => None,
        };

        let post_id = self.client.create_post(text, media_id.as_deref()).await?;
        info!("Successfully posted, post id {}", post_id);

        Ok(PostReceipt { post_id, media_id })
    }

    fn name(&self) -> &'static str {
        "X"
    }
}
