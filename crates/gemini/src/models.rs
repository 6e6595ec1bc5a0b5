use common::{PipelineError, PipelineResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
}

impl GenerateContentRequest {
    pub fn from_prompt(prompt: String) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<Content>,
    #[serde(rename = "finishReason")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiError {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    pub candidates: Option<Vec<Candidate>>,
    pub error: Option<ApiError>,
}

impl GenerateContentResponse {
    /// Joined text of the first candidate, trimmed. Empty text is a failure.
    pub fn into_text(self) -> PipelineResult<String> {
        if let Some(error) = self.error {
            return Err(PipelineError::Generation(format!(
                "Gemini API error: {}",
                error.message
            )));
        }

        let candidate = self
            .candidates
            .and_then(|c| c.into_iter().next())
            .ok_or_else(|| PipelineError::Generation("No candidates returned".to_string()))?;

        let text = candidate
            .content
            .map(|c| c.parts.into_iter().map(|p| p.text).collect::<String>())
            .unwrap_or_default();
        let text = text.trim();

        if text.is_empty() {
            return Err(PipelineError::Generation(format!(
                "Empty text returned (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            )));
        }

        Ok(text.to_string())
    }
}
