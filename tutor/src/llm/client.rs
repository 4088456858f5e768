//! Inference request/response types and the client trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Message;

/// Error type for inference calls.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Request blocked by the model: {0}")]
    Blocked(String),

    #[error("Model returned no usable output")]
    EmptyOutput,

    #[error("Malformed model output: {0}")]
    Malformed(String),

    #[error("No API key configured (set GEMINI_API_KEY or run `tutor config set-api-key`)")]
    MissingApiKey,

    #[error("Request timed out")]
    Timeout,
}

/// Output modality requested from the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Modality {
    Text,
    Image,
    Audio,
}

/// A single request to the inference endpoint.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    /// Model identifier (e.g. `googleai/gemini-2.0-flash`).
    pub model: String,
    /// System instruction guiding the reply.
    pub system_instruction: Option<String>,
    /// Role-tagged turns, oldest first. The last one is the new user turn.
    pub contents: Vec<Message>,
    /// Requested output modalities (empty means provider default).
    pub modalities: Vec<Modality>,
    /// Prebuilt voice for audio output.
    pub voice: Option<String>,
    /// Ask the model to answer with a JSON document.
    pub json_output: bool,
}

impl GenerateRequest {
    /// A request with a single user turn.
    pub fn prompt(model: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_instruction: None,
            contents: vec![Message::user(text)],
            modalities: Vec::new(),
            voice: None,
            json_output: false,
        }
    }

    #[must_use]
    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    #[must_use]
    pub fn with_modalities(mut self, modalities: &[Modality]) -> Self {
        self.modalities = modalities.to_vec();
        self
    }

    #[must_use]
    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    #[must_use]
    pub const fn json(mut self) -> Self {
        self.json_output = true;
        self
    }

    /// Text of the final (newest) turn.
    #[cfg(test)]
    pub fn last_text(&self) -> Option<&str> {
        self.contents.last().map(|m| m.content.as_str())
    }
}

/// Binary payload returned inline by the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineMedia {
    /// MIME type, e.g. `image/png` or `audio/L16;codec=pcm;rate=24000`.
    pub mime_type: String,
    /// Base64-encoded payload.
    pub data: String,
}

/// Result of a generate call.
#[derive(Debug, Clone, Default)]
pub struct GenerateResponse {
    /// Concatenated text parts, if any.
    pub text: Option<String>,
    /// Inline media parts, in order.
    pub media: Vec<InlineMedia>,
    /// Provider finish reason.
    pub finish_reason: Option<String>,
}

impl GenerateResponse {
    /// A text-only response.
    #[cfg(test)]
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// A media-only response.
    #[cfg(test)]
    pub fn from_media(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            media: vec![InlineMedia {
                mime_type: mime_type.into(),
                data: data.into(),
            }],
            ..Self::default()
        }
    }

    /// The reply text, trimmed. Empty or missing text is an error.
    pub fn into_text(self) -> Result<String, LlmError> {
        match self.text {
            Some(text) if !text.trim().is_empty() => Ok(text.trim().to_string()),
            _ => Err(LlmError::EmptyOutput),
        }
    }

    /// First media part whose MIME type starts with `prefix` (e.g. `"image/"`).
    pub fn first_media(&self, prefix: &str) -> Option<&InlineMedia> {
        self.media.iter().find(|m| m.mime_type.starts_with(prefix))
    }
}

/// A hosted text/image/audio generation endpoint.
///
/// Calls are request/response; there is no streaming.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, LlmError>;
}
