//! SGLang request/response types (OpenAI-compatible chat completions).

use serde::{Deserialize, Serialize};
use vinfer_models::InferenceSettings;

/// Chat completion request carrying a prompt and a video URL.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    /// Model identifier (the server's `--model-path`)
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl ChatRequest {
    /// Single user turn: prompt text followed by the video.
    pub fn video(
        model: impl Into<String>,
        prompt: impl Into<String>,
        video_url: impl Into<String>,
        settings: &InferenceSettings,
    ) -> Self {
        Self {
            model: model.into(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: vec![
                    ContentPart::Text {
                        text: prompt.into(),
                    },
                    ContentPart::VideoUrl {
                        video_url: MediaUrl {
                            url: video_url.into(),
                        },
                    },
                ],
            }],
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: Vec<ContentPart>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    VideoUrl { video_url: MediaUrl },
}

#[derive(Debug, Clone, Serialize)]
pub struct MediaUrl {
    pub url: String,
}

/// Chat completion response; only the fields we read.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatResponse {
    /// Text of the first choice, if any.
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
    }
}
