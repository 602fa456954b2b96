//! Shared story schema for the viral-story backend.
//!
//! Field names follow the backend's wire format (snake_case JSON), so these
//! types serialize/deserialize against `/api/generate-story` without any
//! renaming beyond the platform labels.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Target platform for a generated story. Serialized as the exact label the
/// backend expects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Platform {
    #[serde(rename = "TikTok")]
    TikTok,
    #[serde(rename = "YouTube Shorts")]
    YoutubeShorts,
    #[serde(rename = "Instagram Reels")]
    InstagramReels,
}

impl Platform {
    pub const ALL: [Platform; 3] = [
        Platform::TikTok,
        Platform::YoutubeShorts,
        Platform::InstagramReels,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Platform::TikTok => "TikTok",
            Platform::YoutubeShorts => "YouTube Shorts",
            Platform::InstagramReels => "Instagram Reels",
        }
    }
}

impl Default for Platform {
    fn default() -> Self {
        Platform::TikTok
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("topic is empty")]
    EmptyTopic,
}

/// Immutable payload of one generation call.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerationRequest {
    pub topic: String,
    pub platform: Platform,
}

impl GenerationRequest {
    /// Trims the topic; whitespace-only input never reaches the network.
    pub fn new(topic: &str, platform: Platform) -> Result<Self, ValidationError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(ValidationError::EmptyTopic);
        }
        Ok(Self {
            topic: topic.to_string(),
            platform,
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct VisualPrompt {
    pub description: String,
    pub camera_angle: String,
    pub mood: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Scene {
    pub id: u32,
    pub text_content: String,
    /// Fixed at generation time; local edits only ever touch `text_content`.
    pub visual_prompts: VisualPrompt,
    pub estimated_duration: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ViralStory {
    pub title: String,
    pub topic: String,
    pub target_audience: String,
    pub scenes: Vec<Scene>,
    pub clickbait_score: u8,
    pub thinking_trace: String,
}

impl ViralStory {
    /// Shape checks beyond what serde enforces. A story that fails here is
    /// treated as a malformed backend response.
    pub fn validate(&self) -> Result<(), String> {
        if self.clickbait_score > 100 {
            return Err(format!(
                "clickbait_score {} out of range 0..=100",
                self.clickbait_score
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for scene in &self.scenes {
            if !seen.insert(scene.id) {
                return Err(format!("duplicate scene id {}", scene.id));
            }
        }
        Ok(())
    }

    /// Replaces one scene's voiceover text, matched structurally by id so the
    /// update stays correct if scenes are ever reordered upstream. Returns
    /// false when no scene has the given id.
    pub fn set_scene_text(&mut self, scene_id: u32, text: impl Into<String>) -> bool {
        match self.scenes.iter_mut().find(|s| s.id == scene_id) {
            Some(scene) => {
                scene.text_content = text.into();
                true
            }
            None => false,
        }
    }
}
