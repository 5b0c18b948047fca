//! OpenAI request/response payloads used by the provider clients.

use crate::stream::Fragment;
use serde::{Deserialize, Serialize};

/// Request body for streamed chat completions.
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
}

/// Chat message object.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// One `chat.completion.chunk` from a streamed completion.
///
/// Every field is optional so that metadata-only chunks and in-band error
/// payloads decode without failing.
#[derive(Debug, Default, Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    pub error: Option<ApiErrorBody>,
}

impl ChatCompletionChunk {
    /// Why the first choice stopped, on the final chunk of a completion.
    pub fn finish_reason(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.finish_reason.as_deref())
    }

    /// Narrow this chunk to the text of its first choice.
    pub fn into_fragment(self) -> Fragment {
        Fragment::from(
            self.choices
                .into_iter()
                .next()
                .and_then(|choice| choice.delta.content),
        )
    }
}

/// Single choice item in a streamed chunk.
#[derive(Debug, Default, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: ChunkDelta,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChunkDelta {
    pub content: Option<String>,
}

/// Error object OpenAI returns in place of a normal payload.
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: Option<String>,
}

/// Request body for image generation.
#[derive(Debug, Serialize)]
pub struct ImageGenerationRequest {
    pub model: String,
    pub prompt: String,
    pub n: u32,
    pub size: String,
}

/// Top-level image generation response.
#[derive(Debug, Deserialize)]
pub struct ImageGenerationResponse {
    pub data: Vec<ImageData>,
}

/// One generated image item (URL or base64).
#[derive(Debug, Deserialize)]
pub struct ImageData {
    pub url: Option<String>,
    pub b64_json: Option<String>,
}
