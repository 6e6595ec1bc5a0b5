use async_trait::async_trait;
use common::{build_http_client, Config, PipelineError, PipelineResult, TrendSource};
use scraper::{Html, Selector};
use tracing::{info, warn};

const TREND_SELECTOR: &str = "ol.trend-card__list li a";
pub const MAX_TRENDS: usize = 4;

pub struct TrendsScraper {
    http_client: reqwest::Client,
    url: String,
}

impl TrendsScraper {
    pub fn new(config: &Config) -> PipelineResult<Self> {
        let http_client = build_http_client(config.http_timeout)
            .map_err(|e| PipelineError::Fetch(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            url: config.trends_url.clone(),
        })
    }

    pub fn with_url(mut self, url: &str) -> Self {
        self.url = url.to_string();
        self
    }

    async fn fetch_page(&self) -> PipelineResult<String> {
        info!("Fetching trends from: {}", self.url);

        let response = self
            .http_client
            .get(&self.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| PipelineError::Fetch(format!("{}: {}", self.url, e)))?;

        response
            .text()
            .await
            .map_err(|e| PipelineError::Fetch(format!("Failed to read response: {}", e)))
    }
}

/// Extracts up to [`MAX_TRENDS`] trend labels in document order.
pub fn parse_trends(html: &str) -> PipelineResult<Vec<String>> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(TREND_SELECTOR)
        .map_err(|e| PipelineError::HtmlParse(format!("Invalid trend selector: {}", e)))?;

    let trends = document
        .select(&selector)
        .map(|a| clean_label(&a.text().collect::<String>()))
        .filter(|label| !label.is_empty())
        .take(MAX_TRENDS)
        .collect();

    Ok(trends)
}

fn clean_label(raw: &str) -> String {
    raw.trim().trim_start_matches('#').trim().to_string()
}

#[async_trait]
impl TrendSource for TrendsScraper {
    async fn fetch_trends(&self) -> PipelineResult<Vec<String>> {
        let html = self.fetch_page().await?;
        let trends = parse_trends(&html)?;

        if trends.is_empty() {
            warn!("No trends found at {}; the page structure may have changed", self.url);
            return Err(PipelineError::NoTrendsFound);
        }

        info!("Found {} trends", trends.len());
        Ok(trends)
    }

    fn name(&self) -> &'static str {
        "trends24"
    }
}
