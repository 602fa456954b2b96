//! HTTP client for the story-generation backend.

use serde_json::json;
use story::{GenerationRequest, ViralStory};
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
const GENERATE_PATH: &str = "/api/generate-story";

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("story generation failed: {0}")]
    HttpStatus(String),
    #[error("could not reach the story backend: {0}")]
    Transport(String),
    #[error("the backend returned a malformed response")]
    MalformedResponse,
}

/// Seam between the session and whatever produces stories. The HTTP client
/// is the production implementation; tests script their own.
pub trait StoryBackend: Send + Sync {
    fn generate(&self, request: &GenerationRequest) -> Result<ViralStory, GenerateError>;
}

pub struct HttpStoryClient {
    agent: ureq::Agent,
    base_url: String,
}

impl HttpStoryClient {
    /// No explicit timeouts: generation is a single long-latency call and
    /// relies on transport defaults.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().build(),
            base_url: base_url.into(),
        }
    }

    pub fn from_env() -> Self {
        let base = std::env::var("STORY_STUDIO_BACKEND_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(base)
    }

    fn endpoint(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), GENERATE_PATH)
    }
}

impl StoryBackend for HttpStoryClient {
    fn generate(&self, request: &GenerationRequest) -> Result<ViralStory, GenerateError> {
        let payload = json!({
            "topic": request.topic,
            "platform": request.platform,
        });
        tracing::info!(
            target: "generate",
            "requesting story: platform={}, topic chars={}",
            request.platform,
            request.topic.chars().count()
        );
        let response = match self
            .agent
            .post(&self.endpoint())
            .set("Content-Type", "application/json")
            .set("Accept", "application/json")
            .send_string(&payload.to_string())
        {
            Ok(resp) => resp,
            Err(ureq::Error::Status(code, resp)) => {
                return Err(GenerateError::HttpStatus(format!(
                    "{code} {}",
                    resp.status_text()
                )));
            }
            Err(err) => return Err(GenerateError::Transport(err.to_string())),
        };
        let body = response
            .into_string()
            .map_err(|err| GenerateError::Transport(err.to_string()))?;
        let story: ViralStory = serde_json::from_str(&body).map_err(|err| {
            tracing::warn!(target: "generate", "undecodable story response: {err}");
            GenerateError::MalformedResponse
        })?;
        story.validate().map_err(|reason| {
            tracing::warn!(target: "generate", "invalid story response: {reason}");
            GenerateError::MalformedResponse
        })?;
        tracing::info!(
            target: "generate",
            "story received: {} scene(s), clickbait score {}",
            story.scenes.len(),
            story.clickbait_score
        );
        Ok(story)
    }
}
