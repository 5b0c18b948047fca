//! HTTP surface: quiz streaming, image generation and the model allow-list.

use crate::ai::{
    CompletionService, ImageGenerationService, OpenAiCompletionClient, OpenAiHttpClient,
    OpenAiImageClient,
};
use crate::models::{
    Config, ErrorResponse, ImageQuery, ImageResponse, ModelsResponse, QuizQuery,
};
use crate::stream::{FramingPolicy, SseEvent, StreamParser};
use crate::{prompts, Error, Result};
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use futures::{future, Stream, StreamExt};
use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};
use uuid::Uuid;

const IMAGE_FAILED: &str = "Error - Image generation failed.";

type EventResult = std::result::Result<Event, Infallible>;

/// Shared handler state. Service clients are built once and shared by
/// reference across requests; each quiz request gets its own parser.
#[derive(Clone)]
pub struct AppState {
    completion: Arc<dyn CompletionService>,
    image_gen: Arc<dyn ImageGenerationService>,
    default_model: String,
    framing: FramingPolicy,
}

/// Injectable service bundle used to construct [`AppState`] in tests/harnesses.
pub struct AppServices {
    pub completion: Arc<dyn CompletionService>,
    pub image_gen: Arc<dyn ImageGenerationService>,
}

impl AppState {
    pub fn with_services(
        services: AppServices,
        default_model: impl Into<String>,
        framing: FramingPolicy,
    ) -> Self {
        Self {
            completion: services.completion,
            image_gen: services.image_gen,
            default_model: default_model.into(),
            framing,
        }
    }

    /// Build OpenAI-backed state from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let http = OpenAiHttpClient::new(config.openai_api_key.clone())?
            .with_base_url(&config.openai_base_url);

        info!(
            "Quiz provider: OpenAI (default model: {}, framing: {})",
            config.default_model, config.framing
        );
        info!(
            "Image provider: OpenAI (model: {}, size: {})",
            config.image_model, config.image_size
        );

        Ok(Self::with_services(
            AppServices {
                completion: Arc::new(OpenAiCompletionClient::new(http.clone())),
                image_gen: Arc::new(OpenAiImageClient::new(
                    http,
                    config.image_model.clone(),
                    config.image_size.clone(),
                )),
            },
            config.default_model.clone(),
            config.framing,
        ))
    }
}

/// JSON error response with an explicit status.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidRequest(message) => Self::new(StatusCode::BAD_REQUEST, message),
            other => Self::new(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

pub fn router(state: AppState) -> Router {
    // Permissive CORS so a locally served frontend can call the API.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/GenerateQuiz", get(generate_quiz))
        .route("/GenerateImage", get(generate_image))
        .route("/SupportedModels", get(supported_models))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve the API on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

async fn generate_quiz(
    State(state): State<AppState>,
    query: std::result::Result<Query<QuizQuery>, QueryRejection>,
) -> std::result::Result<Sse<impl Stream<Item = EventResult>>, ApiError> {
    let Query(query) = query?;
    let request = query.validate(&state.default_model).map_err(|e| {
        error!("Rejected quiz request: {}", e);
        e
    })?;

    let request_id = Uuid::new_v4();
    info!(
        %request_id,
        topic = %request.topic,
        difficulty = %request.difficulty,
        n_questions = request.n_questions,
        model = %request.model,
        "Generating quiz"
    );

    let prompt = prompts::quiz_prompt(&request.topic, &request.difficulty, request.n_questions);
    debug!(%request_id, "Prompt for completion service: {}", prompt);

    let fragments = state
        .completion
        .stream_completion(&request.model, &prompt)
        .await
        .map_err(|e| {
            error!(%request_id, "Failed to start completion stream: {}", e);
            e
        })?;

    Ok(Sse::new(quiz_events(
        StreamParser::with_policy(state.framing).into_stream(fragments),
        request_id,
    )))
}

/// Map parser output onto SSE frames. An upstream failure is logged and ends
/// the body cleanly so that every event produced before it is still written.
fn quiz_events<S>(parsed: S, request_id: Uuid) -> impl Stream<Item = EventResult>
where
    S: Stream<Item = Result<SseEvent>>,
{
    parsed
        .take_while(move |item| {
            if let Err(e) = item {
                error!(%request_id, "Completion stream failed, closing response: {}", e);
            }
            future::ready(item.is_ok())
        })
        .filter_map(|item| future::ready(item.ok()))
        .map(|event| Ok(Event::default().data(event.into_data())))
}

async fn generate_image(
    State(state): State<AppState>,
    query: std::result::Result<Query<ImageQuery>, QueryRejection>,
) -> std::result::Result<Json<ImageResponse>, ApiError> {
    let Query(query) = query?;
    let prompt = query.validate()?;

    info!("Received image prompt: {}", prompt);
    match state.image_gen.generate_image(&prompt).await {
        Ok(image_url) => {
            info!("Generated image for prompt '{}': {}", prompt, image_url);
            Ok(Json(ImageResponse { image_url }))
        }
        Err(e) => {
            error!("Image generation failed for prompt '{}': {}", prompt, e);
            Err(ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, IMAGE_FAILED))
        }
    }
}

async fn supported_models() -> Json<ModelsResponse> {
    Json(ModelsResponse::supported())
}
