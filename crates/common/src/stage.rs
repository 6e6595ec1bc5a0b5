use async_trait::async_trait;
use rand::seq::SliceRandom;
use std::path::PathBuf;

use crate::error::{PipelineError, PipelineResult};

#[async_trait]
pub trait TrendSource: Send + Sync {
    /// Ranked trend labels, best first. Never empty on success.
    async fn fetch_trends(&self) -> PipelineResult<Vec<String>>;
    fn name(&self) -> &'static str;
}

/// A source of candidate links to append to a post.
pub trait LinkSource: Send + Sync {
    fn links(&self) -> PipelineResult<Vec<String>>;

    /// Where the links come from, for log and error messages.
    fn origin(&self) -> PathBuf;

    /// Draws one link uniformly at random. No memory of earlier draws.
    fn pick_link(&self) -> PipelineResult<String> {
        let links = self.links()?;
        links
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or_else(|| PipelineError::NoLinksAvailable(self.origin()))
    }
}

#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Promotional text about `trend`, trimmed and non-empty.
    async fn generate(&self, trend: &str) -> PipelineResult<String>;
    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostReceipt {
    pub post_id: String,
    pub media_id: Option<String>,
}

#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publishes `text`, attaching the image behind `image_url` when it can
    /// be fetched. A failed image fetch falls back to a text-only post.
    async fn publish(&self, text: &str, image_url: Option<&str>) -> PipelineResult<PostReceipt>;
    fn name(&self) -> &'static str;
}

/// In-memory link source, handy when links come from somewhere other than a file.
pub struct StaticLinks {
    links: Vec<String>,
}

impl StaticLinks {
    pub fn new<I, S>(links: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            links: links.into_iter().map(Into::into).collect(),
        }
    }
}

impl LinkSource for StaticLinks {
    fn links(&self) -> PipelineResult<Vec<String>> {
        Ok(self.links.clone())
    }

    fn origin(&self) -> PathBuf {
        PathBuf::from("<memory>")
    }
}
