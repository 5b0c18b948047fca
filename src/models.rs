//! Data models and structures
//!
//! Defines configuration, the query/response bodies of the HTTP surface, and
//! the validation that turns raw query parameters into quiz requests.

use crate::stream::FramingPolicy;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Models a quiz may be generated with.
pub const SUPPORTED_MODELS: &[&str] = &[
    "gpt-3.5-turbo",
    "gpt-4-turbo-preview",
    "gpt-4o",
    "gpt-4o-mini",
];

pub const DEFAULT_QUIZ_MODEL: &str = "gpt-4-turbo-preview";
pub const DEFAULT_IMAGE_MODEL: &str = "dall-e-2";
pub const DEFAULT_IMAGE_SIZE: &str = "256x256";
pub const DEFAULT_N_QUESTIONS: u32 = 10;
pub const MAX_N_QUESTIONS: u32 = 50;

pub fn is_supported_model(model: &str) -> bool {
    SUPPORTED_MODELS.contains(&model)
}

/// Raw `/GenerateQuiz` query string. Everything is optional here so that
/// missing or malformed parameters can be reported as JSON errors.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuizQuery {
    pub topic: Option<String>,
    pub difficulty: Option<String>,
    pub n_questions: Option<String>,
    pub model: Option<String>,
}

/// A validated quiz request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizRequest {
    pub topic: String,
    pub difficulty: String,
    pub n_questions: u32,
    pub model: String,
}

impl QuizQuery {
    pub fn validate(self, default_model: &str) -> Result<QuizRequest> {
        let topic = non_blank(self.topic);
        let difficulty = non_blank(self.difficulty);
        let (Some(topic), Some(difficulty)) = (topic, difficulty) else {
            return Err(Error::InvalidRequest(
                "Please provide a topic and difficulty in the query string to generate a quiz."
                    .to_string(),
            ));
        };

        let n_questions = match non_blank(self.n_questions) {
            None => DEFAULT_N_QUESTIONS,
            Some(raw) => raw.parse::<u32>().map_err(|_| {
                Error::InvalidRequest(format!("n_questions must be an integer, got '{}'", raw))
            })?,
        };
        if !(1..=MAX_N_QUESTIONS).contains(&n_questions) {
            return Err(Error::InvalidRequest(format!(
                "n_questions must be between 1 and {}",
                MAX_N_QUESTIONS
            )));
        }

        let model = match non_blank(self.model) {
            None => default_model.to_string(),
            Some(model) if is_supported_model(&model) => model,
            Some(model) => {
                return Err(Error::InvalidRequest(format!(
                    "Unsupported model '{}'. Supported models: {}",
                    model,
                    SUPPORTED_MODELS.join(", ")
                )))
            }
        };

        Ok(QuizRequest {
            topic,
            difficulty,
            n_questions,
            model,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageQuery {
    pub prompt: Option<String>,
}

impl ImageQuery {
    pub fn validate(self) -> Result<String> {
        non_blank(self.prompt).ok_or_else(|| {
            Error::InvalidRequest("Please provide a prompt in the query string.".to_string())
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageResponse {
    pub image_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelsResponse {
    pub models: Vec<String>,
}

impl ModelsResponse {
    pub fn supported() -> Self {
        Self {
            models: SUPPORTED_MODELS.iter().map(|m| m.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// Configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub default_model: String,
    pub image_model: String,
    pub image_size: String,
    pub framing: FramingPolicy,
    pub bind_addr: SocketAddr,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let openai_api_key = var("OPENAI_API_KEY")
            .ok_or_else(|| Error::Config("OPENAI_API_KEY is not set".to_string()))?;

        let default_model =
            var("QUIZ_DEFAULT_MODEL").unwrap_or_else(|| DEFAULT_QUIZ_MODEL.to_string());
        if !is_supported_model(&default_model) {
            return Err(Error::Config(format!(
                "QUIZ_DEFAULT_MODEL '{}' is not a supported model",
                default_model
            )));
        }

        let framing = match var("QUIZ_FRAMING") {
            Some(raw) => raw.parse().map_err(Error::Config)?,
            None => FramingPolicy::default(),
        };

        let bind_addr = var("BIND_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8000".to_string())
            .parse()
            .map_err(|e| Error::Config(format!("Invalid BIND_ADDR: {}", e)))?;

        Ok(Self {
            openai_api_key,
            openai_base_url: var("OPENAI_BASE_URL")
                .unwrap_or_else(|| "https://api.openai.com".to_string()),
            default_model,
            image_model: var("IMAGE_MODEL").unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string()),
            image_size: var("IMAGE_SIZE").unwrap_or_else(|| DEFAULT_IMAGE_SIZE.to_string()),
            framing,
            bind_addr,
        })
    }
}
