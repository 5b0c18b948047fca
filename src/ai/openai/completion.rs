use super::client::OpenAiHttpClient;
use super::stream::fragments_from_sse;
use super::types::{ChatCompletionRequest, ChatMessage};
use crate::ai::{CompletionService, FragmentStream};
use crate::Result;
use async_trait::async_trait;

pub struct OpenAiCompletionClient {
    http: OpenAiHttpClient,
}

impl OpenAiCompletionClient {
    pub fn new(http: OpenAiHttpClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl CompletionService for OpenAiCompletionClient {
    async fn stream_completion(&self, model: &str, prompt: &str) -> Result<FragmentStream> {
        let request = ChatCompletionRequest {
            model: model.to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            stream: true,
        };

        tracing::debug!("Opening streamed chat completion with model {}", model);
        // No overall timeout: the body stays open for as long as tokens flow.
        let response = self
            .http
            .send("/v1/chat/completions", &request, None)
            .await?;

        Ok(fragments_from_sse(response.bytes_stream()))
    }
}
