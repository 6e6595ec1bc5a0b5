use tracing::warn;

use crate::config::{OverflowPolicy, PostLimits};
use crate::error::{PipelineError, PipelineResult};

const IMAGE_SEARCH_URL: &str = "https://tse1.mm.bing.net/th?q=";
const SEPARATOR: &str = "\n\n";
const ELLIPSIS: char = '…';

/// Characters the platform charges for any link, whatever its real length.
pub const LINK_WEIGHT: usize = 23;

pub fn hashtag(trend: &str) -> String {
    let tag: String = trend.chars().filter(|c| !c.is_whitespace()).collect();
    format!("#{}", tag)
}

pub fn image_url(trend: &str) -> String {
    format!("{}{}", IMAGE_SEARCH_URL, urlencoding::encode(trend))
}

pub fn compose(text: &str, link: &str, trend: &str) -> String {
    ComposedPost::new(text, link, trend).body()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedPost {
    text: String,
    link: String,
    hashtag: String,
}

impl ComposedPost {
    pub fn new(text: &str, link: &str, trend: &str) -> Self {
        Self {
            text: text.to_string(),
            link: link.to_string(),
            hashtag: hashtag(trend),
        }
    }

    pub fn body(&self) -> String {
        [self.text.as_str(), self.link.as_str(), self.hashtag.as_str()].join(SEPARATOR)
    }

    pub fn hashtag(&self) -> &str {
        &self.hashtag
    }

    /// Length as the platform counts it: characters, with the link at a flat weight.
    pub fn weighted_len(&self) -> usize {
        self.text.chars().count() + self.fixed_len()
    }

    fn fixed_len(&self) -> usize {
        SEPARATOR.len() * 2 + LINK_WEIGHT + self.hashtag.chars().count()
    }

    /// Applies the length limit. Only the generated text is ever shortened;
    /// the link and hashtag are kept whole.
    pub fn fit_to(self, limits: &PostLimits) -> PipelineResult<Self> {
        let length = self.weighted_len();
        if length <= limits.max_chars {
            return Ok(self);
        }

        let too_long = PipelineError::PostTooLong {
            length,
            limit: limits.max_chars,
        };
        if limits.overflow == OverflowPolicy::Reject {
            return Err(too_long);
        }

        // one char of text plus the ellipsis, at minimum
        let budget = limits.max_chars.saturating_sub(self.fixed_len());
        if budget < 2 {
            return Err(too_long);
        }

        let mut text: String = self.text.chars().take(budget - 1).collect();
        text.truncate(text.trim_end().len());
        text.push(ELLIPSIS);

        warn!(
            "Post was {} characters; truncated generated text to fit {}",
            length, limits.max_chars
        );
        Ok(Self { text, ..self })
    }
}
