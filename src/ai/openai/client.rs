use crate::{Error, Result};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Longest silence tolerated on an open connection, including between chunks
/// of a streamed completion.
pub const READ_TIMEOUT: Duration = Duration::from_secs(60);

/// Shared OpenAI REST client used by the completion and image modules.
#[derive(Clone)]
pub struct OpenAiHttpClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiHttpClient {
    /// Fails when `api_key` is blank or the underlying HTTP client cannot be
    /// built.
    pub fn new(api_key: String) -> Result<Self> {
        Self::with_read_timeout(api_key, READ_TIMEOUT)
    }

    pub fn with_read_timeout(api_key: String, read_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .read_timeout(read_timeout)
            .build()?;
        Self::new_with_client(api_key, client)
    }

    pub fn new_with_client(api_key: String, client: Client) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(Error::Config("OpenAI API key is empty".to_string()));
        }

        Ok(Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// POST `request` and return the response once its status is known to be
    /// successful. The body is left unread.
    pub async fn send<Req: Serialize>(
        &self,
        path: &str,
        request: &Req,
        timeout: Option<Duration>,
    ) -> Result<Response> {
        let url = format!("{}{}", self.base_url, path);
        let mut builder = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(request);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::error!("Failed to send request to OpenAI: {}", e);
            e
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            tracing::error!("OpenAI API error (status {}): {}", status, error_text);
            return Err(Error::AiProvider(format!(
                "OpenAI API error (status {}): {}",
                status, error_text
            )));
        }

        Ok(response)
    }

    pub async fn post<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        path: &str,
        request: &Req,
        timeout: Duration,
    ) -> Result<Resp> {
        let response = self.send(path, request, Some(timeout)).await?;

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse OpenAI response: {}\nBody: {}", e, body);
            Error::AiProvider(format!("Failed to parse OpenAI response: {}", e))
        })
    }
}
