use common::{PipelineError, PipelineResult};
use reqwest::Client;
use std::io::Write;
use tempfile::NamedTempFile;
use tracing::info;

/// Downloads the image into a fresh temporary file. The file is deleted when
/// the returned handle is dropped.
pub async fn download_image(client: &Client, url: &str) -> PipelineResult<NamedTempFile> {
    info!("Downloading image: {}", url);

    let res = client
        .get(url)
        .send()
        .await
        .map_err(|e| PipelineError::ImageDownload(format!("{}: {}", url, e)))?;

    if !res.status().is_success() {
        return Err(PipelineError::ImageDownload(format!(
            "{} returned status {}",
            url,
            res.status()
        )));
    }

    let bytes = res
        .bytes()
        .await
        .map_err(|e| PipelineError::ImageDownload(format!("Failed to read image body: {}", e)))?;
    if bytes.is_empty() {
        return Err(PipelineError::ImageDownload(format!("{} returned no data", url)));
    }

    let mut file = tempfile::Builder::new()
        .prefix("trendpost-")
        .suffix(".jpg")
        .tempfile()
        .map_err(|e| PipelineError::ImageDownload(format!("Failed to create temp file: {}", e)))?;
    file.write_all(&bytes)
        .and_then(|_| file.flush())
        .map_err(|e| PipelineError::ImageDownload(format!("Failed to write temp file: {}", e)))?;

    info!("Saved {} image bytes to {}", bytes.len(), file.path().display());
    Ok(file)
}
