use super::client::OpenAiHttpClient;
use super::types::{ImageGenerationRequest, ImageGenerationResponse};
use crate::ai::ImageGenerationService;
use crate::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;

pub struct OpenAiImageClient {
    http: OpenAiHttpClient,
    model: String,
    size: String,
}

impl OpenAiImageClient {
    pub fn new(http: OpenAiHttpClient, model: String, size: String) -> Self {
        Self { http, model, size }
    }
}

#[async_trait]
impl ImageGenerationService for OpenAiImageClient {
    async fn generate_image(&self, prompt: &str) -> Result<String> {
        let request = ImageGenerationRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            n: 1,
            size: self.size.clone(),
        };

        let response: ImageGenerationResponse = self
            .http
            .post("/v1/images/generations", &request, Duration::from_secs(60))
            .await?;

        let image_data = response
            .data
            .into_iter()
            .next()
            .ok_or_else(|| Error::AiProvider("No image data in OpenAI response".to_string()))?;

        if let Some(url) = image_data.url {
            Ok(url)
        } else if let Some(b64_json) = image_data.b64_json {
            Ok(format!("data:image/png;base64,{}", b64_json))
        } else {
            Err(Error::AiProvider(
                "No image data (neither URL nor base64) in response".to_string(),
            ))
        }
    }
}
