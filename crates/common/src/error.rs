use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] anyhow::Error),

    #[error("Failed to fetch trends page: {0}")]
    Fetch(String),

    #[error("Failed to parse trends page: {0}")]
    HtmlParse(String),

    #[error("No trends found on the trends page; the page structure may have changed")]
    NoTrendsFound,

    #[error("Link file not found: {}", .0.display())]
    LinkStoreMissing(PathBuf),

    #[error("Link file contains no links: {}", .0.display())]
    NoLinksAvailable(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Content generation failed: {0}")]
    Generation(String),

    #[error("Image download failed: {0}")]
    ImageDownload(String),

    #[error("Post is {length} characters, over the {limit} character limit")]
    PostTooLong { length: usize, limit: usize },

    #[error("Publishing failed: {0}")]
    Publish(String),
}

impl PipelineError {
    /// Short, stable name used in structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Configuration(_) => "configuration",
            PipelineError::Fetch(_) => "fetch",
            PipelineError::HtmlParse(_) => "html_parse",
            PipelineError::NoTrendsFound => "no_trends_found",
            PipelineError::LinkStoreMissing(_) => "link_store_missing",
            PipelineError::NoLinksAvailable(_) => "no_links_available",
            PipelineError::Io(_) => "io",
            PipelineError::Generation(_) => "generation",
            PipelineError::ImageDownload(_) => "image_download",
            PipelineError::PostTooLong { .. } => "post_too_long",
            PipelineError::Publish(_) => "publish",
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            PipelineError::Configuration(_) => 2,
            PipelineError::Fetch(_) => 3,
            PipelineError::NoTrendsFound => 4,
            PipelineError::LinkStoreMissing(_)
            | PipelineError::NoLinksAvailable(_)
            | PipelineError::Io(_) => 5,
            PipelineError::Generation(_) => 6,
            PipelineError::PostTooLong { .. } => 7,
            PipelineError::Publish(_) => 8,
            PipelineError::ImageDownload(_) => 9,
            PipelineError::HtmlParse(_) => 10,
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
