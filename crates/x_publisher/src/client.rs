use common::{PipelineError, PipelineResult};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::oauth::OAuth1;

pub const MEDIA_UPLOAD_URL: &str = "https://upload.twitter.com/1.1/media/upload.json";
pub const CREATE_POST_URL: &str = "https://api.twitter.com/2/tweets";

#[derive(Deserialize)]
struct MediaUploadResponse {
    media_id_string: String,
}

#[derive(Deserialize)]
struct CreatePostResponse {
    data: CreatedPost,
}

#[derive(Deserialize)]
struct CreatedPost {
    id: String,
}

#[derive(Clone)]
pub struct XClient {
    http_client: Client,
    oauth: OAuth1,
    upload_url: String,
    post_url: String,
}

impl XClient {
    pub fn new(http_client: Client, oauth: OAuth1) -> Self {
        Self {
            http_client,
            oauth,
            upload_url: MEDIA_UPLOAD_URL.to_string(),
            post_url: CREATE_POST_URL.to_string(),
        }
    }

    pub fn with_endpoints(mut self, upload_url: &str, post_url: &str) -> Self {
        self.upload_url = upload_url.to_string();
        self.post_url = post_url.to_string();
        self
    }

    /// Uploads image bytes and returns their media id.
    pub async fn upload_media(&self, bytes: Vec<u8>, file_name: &str) -> PipelineResult<String> {
        info!("Uploading media ({} bytes)", bytes.len());
        let form = Form::new().part("media", Part::bytes(bytes).file_name(file_name.to_string()));

        let res = self
            .http_client
            .post(&self.upload_url)
            .header(
                "Authorization",
                self.oauth.authorization("POST", &self.upload_url, &[]),
            )
            .multipart(form)
            .send()
            .await
            .map_err(|e| PipelineError::Publish(format!("Media upload request failed: {}", e)))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(PipelineError::Publish(format!(
                "Media upload failed ({}): {}",
                status, text
            )));
        }

        let media: MediaUploadResponse = res
            .json()
            .await
            .map_err(|e| PipelineError::Publish(format!("Malformed media upload response: {}", e)))?;
        Ok(media.media_id_string)
    }

    /// Creates a post, optionally with one attached media id, and returns the post id.
    pub async fn create_post(&self, text: &str, media_id: Option<&str>) -> PipelineResult<String> {
        let mut body = serde_json::json!({ "text": text });
        if let Some(id) = media_id {
            body["media"] = serde_json::json!({ "media_ids": [id] });
        }
        debug!("Create post payload: {}", body);

        let res = self
            .http_client
            .post(&self.post_url)
            .header(
                "Authorization",
                self.oauth.authorization("POST", &self.post_url, &[]),
            )
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::Publish(format!("Create post request failed: {}", e)))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(PipelineError::Publish(format!(
                "Create post failed ({}): {}",
                status, text
            )));
        }

        let created: CreatePostResponse = res
            .json()
            .await
            .map_err(|e| PipelineError::Publish(format!("Malformed create post response: {}", e)))?;
        Ok(created.data.id)
    }
}
