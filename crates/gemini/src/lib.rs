pub mod models;

use async_trait::async_trait;
use common::{build_http_client, Config, ContentGenerator, PipelineError, PipelineResult};
use models::{GenerateContentRequest, GenerateContentResponse};
use reqwest::Client;
use tracing::{info, warn};

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const POST_LANGUAGE: &str = "English";

pub fn build_prompt(trend: &str) -> String {
    format!(
        "You are a social media expert creating a post for X.com. \
         Write a short and engaging post in {} about this topic: '{}'. \
         The post should have a strong Call to Action to encourage clicks on a link that will be added later. \
         Do NOT add any links or hashtags in your response. Just provide the main text.",
        POST_LANGUAGE, trend
    )
}

pub struct GeminiGenerator {
    http_client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiGenerator {
    pub fn new(config: &Config) -> PipelineResult<Self> {
        let http_client = build_http_client(config.http_timeout).map_err(|e| {
            PipelineError::Generation(format!("Failed to build HTTP client: {}", e))
        })?;

        Ok(Self {
            http_client,
            api_key: config.generation.api_key.clone(),
            model: config.generation.model.clone(),
            base_url: GEMINI_API_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    async fn generate_content(&self, prompt: String) -> PipelineResult<GenerateContentResponse> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = GenerateContentRequest::from_prompt(prompt);

        let res = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::Generation(format!("Request failed: {}", e)))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(PipelineError::Generation(format!(
                "Gemini API error ({}): {}",
                status, text
            )));
        }

        res.json()
            .await
            .map_err(|e| PipelineError::Generation(format!("Malformed response: {}", e)))
    }
}

#[async_trait]
impl ContentGenerator for GeminiGenerator {
    async fn generate(&self, trend: &str) -> PipelineResult<String> {
        info!("Generating post text with {} for: {}", self.model, trend);

        let response = self.generate_content(build_prompt(trend)).await.map_err(|e| {
            warn!("{}", e);
            e
        })?;

        let text = response.into_text()?;
        info!("Gemini generated {} characters", text.chars().count());
        Ok(text)
    }

    fn name(&self) -> &'static str {
        "Gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn test_prompt_embeds_trend_and_forbids_links() {
        let prompt = build_prompt("Black Friday");
        assert!(prompt.contains("about this topic: 'Black Friday'."));
        assert!(prompt.contains("in English"));
        assert!(prompt.contains("Do NOT add any links or hashtags"));
        assert_eq!(prompt, build_prompt("Black Friday"));
    }

    /// Answers every request with one canned response and records the raw requests.
    async fn spawn_stub(status: u16, body: &'static str) -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let log = requests.clone();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 4096];
                loop {
                    let n = socket.read(&mut chunk).await.unwrap_or(0);
                    if n == 0 {
                        break;
                    }
                    buf.extend_from_slice(&chunk[..n]);
                    let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
                        continue;
                    };
                    let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                    let length = head
                        .lines()
                        .find_map(|l| l.strip_prefix("content-length:"))
                        .and_then(|v| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if buf.len() >= end + 4 + length {
                        break;
                    }
                }
                log.lock().unwrap().push(String::from_utf8_lossy(&buf).into_owned());

                let response = format!(
                    "HTTP/1.1 {} Stub\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (base, requests)
    }

    fn test_config() -> Config {
        let vars = [
            ("GEMINI_API_KEY", "gemini-key"),
            ("X_API_KEY", "k"),
            ("X_API_SECRET", "s"),
            ("X_ACCESS_TOKEN", "t"),
            ("X_ACCESS_TOKEN_SECRET", "ts"),
            ("X_BEARER_TOKEN", "b"),
            ("HTTP_TIMEOUT_SECS", "5"),
        ];
        Config::from_lookup(|k| {
            vars.iter().find(|(key, _)| *key == k).map(|(_, v)| v.to_string())
        })
        .unwrap()
    }

    const CANDIDATE: &str = r#"{"candidates":[{"content":{"parts":[{"text":"  Black Friday deals are here. Tap the link!\n"}],"role":"model"},"finishReason":"STOP"}]}"#;

    #[tokio::test]
    async fn test_generates_text_from_candidate() {
        let (base, requests) = spawn_stub(200, CANDIDATE).await;
        let generator = GeminiGenerator::new(&test_config())
            .unwrap()
            .with_base_url(&format!("{}/v1beta", base));

        let text = generator.generate("Black Friday").await.unwrap();
        assert_eq!(text, "Black Friday deals are here. Tap the link!");

        let requests = requests.lock().unwrap();
        let request = &requests[0];
        assert!(request.starts_with(
            "POST /v1beta/models/gemini-1.5-flash-latest:generateContent HTTP/1.1"
        ));
        assert!(request.to_lowercase().contains("x-goog-api-key: gemini-key"));
        assert!(request.contains(r#"{"contents":[{"parts":[{"text":"You are a social media expert"#));
        assert!(request.contains("about this topic: 'Black Friday'."));
    }

    #[tokio::test]
    async fn test_error_status_is_generation_error() {
        let (base, _requests) = spawn_stub(
            429,
            r#"{"error":{"code":429,"message":"Resource has been exhausted","status":"RESOURCE_EXHAUSTED"}}"#,
        )
        .await;
        let generator = GeminiGenerator::new(&test_config())
            .unwrap()
            .with_base_url(&format!("{}/v1beta", base));

        match generator.generate("Black Friday").await {
            Err(PipelineError::Generation(message)) => {
                assert!(message.contains("429"));
                assert!(message.contains("Resource has been exhausted"));
            }
            other => panic!("expected Generation, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_generation_error() {
        let (base, _requests) = spawn_stub(200, "<html>not json</html>").await;
        let generator = GeminiGenerator::new(&test_config())
            .unwrap()
            .with_base_url(&format!("{}/v1beta", base));

        assert!(matches!(
            generator.generate("Black Friday").await,
            Err(PipelineError::Generation(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_generation_error() {
        let generator = GeminiGenerator::new(&test_config())
            .unwrap()
            .with_base_url("http://127.0.0.1:1/v1beta/");
        assert!(matches!(
            generator.generate("Black Friday").await,
            Err(PipelineError::Generation(_))
        ));
    }
}
