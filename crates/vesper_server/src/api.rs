//! Internal HTTP trigger surface.
//!
//! Every route except `/health` requires the shared secret in the
//! `X-Internal-Secret` header.

use crate::Services;
use axum::{
    Json, Router,
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;
use vesper_core::TranslationPayload;
use vesper_database::Store;
use vesper_pipeline::{ContentPipeline, OutboxSignal, translation_targets};

/// Header carrying the shared secret.
pub const INTERNAL_SECRET_HEADER: &str = "x-internal-secret";

/// Router state.
#[derive(Clone)]
pub struct AppState {
    /// Pipeline runs are started on
    pub pipeline: Arc<ContentPipeline>,
    /// Wakes the outbox worker
    pub signal: OutboxSignal,
    secret: Arc<str>,
}

impl AppState {
    /// State for `services`, accepting requests that carry `secret`.
    pub fn new(services: &Services, secret: impl Into<String>) -> Self {
        Self {
            pipeline: Arc::clone(&services.pipeline),
            signal: services.signal(),
            secret: Arc::from(secret.into()),
        }
    }

    fn store(&self) -> &Arc<dyn Store> {
        self.pipeline.store()
    }
}

/// Body of `POST /run-schedule`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunScheduleRequest {
    /// Schedule to run
    pub schedule_id: Uuid,
}

/// Successful `POST /run-schedule` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunScheduleResponse {
    /// Human-readable outcome
    pub message: String,
    /// Created record, absent on a no-op run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_id: Option<Uuid>,
}

/// Body of `POST /translate-content`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateContentRequest {
    /// Existing content record
    pub content_id: Uuid,
    /// Title to translate
    pub title: String,
    /// Summary to translate
    #[serde(default)]
    pub summary: Option<String>,
    /// Body to translate
    pub content: String,
    /// Target languages; defaults to the schedule's targets
    #[serde(default)]
    pub languages: Option<Vec<String>>,
}

struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Creates the API router.
pub fn create_router(state: AppState) -> Router {
    let internal = Router::new()
        .route("/run-schedule", post(run_schedule))
        .route("/translate-content", post(translate_content))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_secret,
        ));

    Router::new()
        .route("/health", get(health_check))
        .merge(internal)
        .with_state(state)
}

async fn require_secret(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    let presented = headers
        .get(INTERNAL_SECRET_HEADER)
        .and_then(|value| value.to_str().ok());
    let authorized = presented.is_some_and(|presented| secrets_match(presented, &state.secret));
    if !authorized {
        warn!(path = %request.uri().path(), "Rejected request without valid secret");
        return ApiError::new(StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
    }
    next.run(request).await
}

/// Compares secrets without short-circuiting on the first differing byte.
fn secrets_match(presented: &str, expected: &str) -> bool {
    if presented.len() != expected.len() {
        return false;
    }
    presented
        .bytes()
        .zip(expected.bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

/// Health check endpoint.
#[instrument(skip_all)]
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Runs one schedule to completion.
#[instrument(skip_all, fields(schedule_id = %body.schedule_id))]
async fn run_schedule(
    State(state): State<AppState>,
    Json(body): Json<RunScheduleRequest>,
) -> Result<Json<RunScheduleResponse>, ApiError> {
    match state.pipeline.run(body.schedule_id).await {
        Ok(outcome) => Ok(Json(RunScheduleResponse {
            message: outcome.message(),
            content_id: outcome.content_id(),
        })),
        Err(e) => {
            error!(error = %e, "Run failed");
            Err(ApiError::internal(e.kind.to_string()))
        }
    }
}

/// Queues translations of an existing record and returns without waiting.
#[instrument(skip_all, fields(content_id = %body.content_id))]
async fn translate_content(
    State(state): State<AppState>,
    Json(body): Json<TranslateContentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store();
    let content = store
        .get_content(body.content_id)
        .await
        .map_err(|e| ApiError::internal(e.kind.to_string()))?
        .ok_or_else(|| {
            ApiError::new(
                StatusCode::NOT_FOUND,
                format!("Content '{}' not found", body.content_id),
            )
        })?;

    let requested = match body.languages {
        Some(languages) => languages,
        None => match content.schedule_id {
            Some(schedule_id) => store
                .get_schedule(schedule_id)
                .await
                .map_err(|e| ApiError::internal(e.kind.to_string()))?
                .map(|schedule| translation_targets(&schedule))
                .unwrap_or_default(),
            None => Vec::new(),
        },
    };
    let mut languages: Vec<String> = Vec::new();
    for language in requested {
        let language = language.trim().to_string();
        if !language.is_empty()
            && language != content.source_language
            && !languages.contains(&language)
        {
            languages.push(language);
        }
    }

    if languages.is_empty() {
        debug!("No target languages");
        return Ok((
            StatusCode::OK,
            Json(json!({ "message": "No target languages" })),
        ));
    }

    let payload = TranslationPayload {
        title: body.title,
        summary: body.summary,
        content: body.content,
    };
    let task = store
        .enqueue_translation(content.id, languages, Some(payload))
        .await
        .map_err(|e| ApiError::internal(e.kind.to_string()))?;
    state.signal.notify();

    info!(task_id = %task.id, languages = ?task.languages, "Translation queued");
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "taskId": task.id, "languages": task.languages })),
    ))
}
