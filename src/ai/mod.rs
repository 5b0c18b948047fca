//! AI service integration for quiz text and image generation
//!
//! The traits here are the seam between the HTTP layer and the upstream
//! providers; handlers only ever see a [`FragmentStream`] or an image URL.

pub mod mock;
pub mod openai;

pub use mock::{MockCompletionClient, MockImageGenerationClient};
pub use openai::{OpenAiCompletionClient, OpenAiHttpClient, OpenAiImageClient};

use crate::stream::Fragment;
use crate::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Ordered text fragments of one streamed completion. A failed item ends the
/// completion.
pub type FragmentStream = BoxStream<'static, Result<Fragment>>;

#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Start a streamed completion of `prompt`. Errors returned here happen
    /// before any fragment is produced.
    async fn stream_completion(&self, model: &str, prompt: &str) -> Result<FragmentStream>;
}

#[async_trait]
pub trait ImageGenerationService: Send + Sync {
    /// Generate one image and return where it can be fetched.
    async fn generate_image(&self, prompt: &str) -> Result<String>;
}
