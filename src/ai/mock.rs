use super::{CompletionService, FragmentStream, ImageGenerationService};
use crate::stream::Fragment;
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
enum ScriptedCompletion {
    Fragments {
        fragments: Vec<Option<String>>,
        trailing_error: Option<String>,
    },
    Fail(String),
}

/// Completion service that replays scripted fragment sequences, cycling
/// through them on successive calls.
pub struct MockCompletionClient {
    responses: Arc<Mutex<Vec<ScriptedCompletion>>>,
    call_count: Arc<Mutex<usize>>,
    last_request: Arc<Mutex<Option<(String, String)>>>,
}

impl MockCompletionClient {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
            last_request: Arc::new(Mutex::new(None)),
        }
    }

    /// Respond with these fragments; `None` entries are metadata-only chunks.
    pub fn with_fragments<I, F>(self, fragments: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<Fragment>,
    {
        self.push(ScriptedCompletion::Fragments {
            fragments: to_texts(fragments),
            trailing_error: None,
        })
    }

    /// Respond with these fragments, then fail mid-stream.
    pub fn with_fragments_then_error<I, F>(self, fragments: I, message: &str) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<Fragment>,
    {
        self.push(ScriptedCompletion::Fragments {
            fragments: to_texts(fragments),
            trailing_error: Some(message.to_string()),
        })
    }

    /// Fail before any fragment is produced.
    pub fn with_error(self, message: &str) -> Self {
        self.push(ScriptedCompletion::Fail(message.to_string()))
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    /// The `(model, prompt)` of the most recent call.
    pub fn last_request(&self) -> Option<(String, String)> {
        self.last_request.lock().unwrap().clone()
    }

    fn push(self, response: ScriptedCompletion) -> Self {
        self.responses.lock().unwrap().push(response);
        self
    }
}

fn to_texts<I, F>(fragments: I) -> Vec<Option<String>>
where
    I: IntoIterator<Item = F>,
    F: Into<Fragment>,
{
    fragments
        .into_iter()
        .map(|fragment| {
            let fragment: Fragment = fragment.into();
            fragment.text().map(str::to_string)
        })
        .collect()
}

impl Default for MockCompletionClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionService for MockCompletionClient {
    async fn stream_completion(&self, model: &str, prompt: &str) -> Result<FragmentStream> {
        let mut count = self.call_count.lock().unwrap();
        *count += 1;
        *self.last_request.lock().unwrap() = Some((model.to_string(), prompt.to_string()));

        let responses = self.responses.lock().unwrap();
        let scripted = if responses.is_empty() {
            // Default: a single question delivered in two pieces.
            ScriptedCompletion::Fragments {
                fragments: vec![
                    Some("{\"question_id\": 1, \"question\": ".to_string()),
                    Some("\"Mock question?\"}\n".to_string()),
                ],
                trailing_error: None,
            }
        } else {
            responses[(*count - 1) % responses.len()].clone()
        };

        match scripted {
            ScriptedCompletion::Fail(message) => Err(Error::AiProvider(message)),
            ScriptedCompletion::Fragments {
                fragments,
                trailing_error,
            } => {
                let mut items: Vec<Result<Fragment>> =
                    fragments.into_iter().map(|f| Ok(Fragment::from(f))).collect();
                if let Some(message) = trailing_error {
                    items.push(Err(Error::AiProvider(message)));
                }
                Ok(Box::pin(futures::stream::iter(items)))
            }
        }
    }
}

/// Image service returning canned URLs or errors.
pub struct MockImageGenerationClient {
    responses: Arc<Mutex<Vec<std::result::Result<String, String>>>>,
    call_count: Arc<Mutex<usize>>,
}

impl MockImageGenerationClient {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_image_url(self, url: &str) -> Self {
        self.responses.lock().unwrap().push(Ok(url.to_string()));
        self
    }

    pub fn with_error(self, message: &str) -> Self {
        self.responses.lock().unwrap().push(Err(message.to_string()));
        self
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

impl Default for MockImageGenerationClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageGenerationService for MockImageGenerationClient {
    async fn generate_image(&self, prompt: &str) -> Result<String> {
        let mut count = self.call_count.lock().unwrap();
        *count += 1;

        let responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Ok(format!(
                "https://images.test/{}.png",
                prompt.replace(char::is_whitespace, "-").to_lowercase()
            ));
        }

        responses[(*count - 1) % responses.len()]
            .clone()
            .map_err(Error::AiProvider)
    }
}
