//! Notification endpoint and read API.
//!
//! Object-storage "finalized" notifications are delivered to `POST /events`
//! one object at a time; each is dispatched independently.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/events` | Deliver one object-created notification |
//! | `GET`  | `/lessons/{level}/{lesson}/{pattern}` | Lesson record and exercise |
//! | `GET`  | `/lessons/{level}/{lesson}/{pattern}/dictation` | Exercise only |
//! | `POST` | `/lessons/{level}/{lesson}/{pattern}/dictation` | Rebuild the exercise now |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "lesson not found: Level1/Lesson1/A" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `unprocessable` (422,
//! malformed upstream content), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info_span, Instrument};
use uuid::Uuid;

use lesson_sync_core::models::{DictationExercise, LessonKey};

use crate::config::Config;
use crate::context::PipelineContext;
use crate::dispatch::{dispatch, DispatchReport};
use crate::get::{get_lesson, LessonView};
use crate::synthesize::{synthesize, SynthesisOutcome};
use crate::transcript::MalformedTranscript;

/// Starts the HTTP server on `[server].bind`. Runs until the process ends.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let ctx = PipelineContext::from_config(config).await?;

    let app = router(ctx);

    println!("lsync listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// All routes over `ctx`. Exposed so tests can serve it on an ephemeral port.
pub fn router(ctx: PipelineContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/events", post(handle_event))
        .route("/lessons/{level}/{lesson}/{pattern}", get(handle_get_lesson))
        .route(
            "/lessons/{level}/{lesson}/{pattern}/dictation",
            get(handle_get_dictation).post(handle_synthesize),
        )
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(ctx)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

/// Malformed upstream content is the caller's problem (422); anything else
/// is ours (500).
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        if let Some(malformed) = err.downcast_ref::<MalformedTranscript>() {
            return AppError {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                code: "unprocessable".to_string(),
                message: malformed.to_string(),
            };
        }
        error!(error = %format!("{:#}", err), "request failed");
        AppError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "internal".to_string(),
            message: format!("{:#}", err),
        }
    }
}

fn lesson_key(level: String, lesson: String, pattern: String) -> Result<LessonKey, AppError> {
    if [&level, &lesson, &pattern].iter().any(|s| s.trim().is_empty()) {
        return Err(bad_request("level, lesson and pattern must not be empty"));
    }
    Ok(LessonKey::new(level, lesson, pattern))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /events ============

/// Object-finalized notification payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventRequest {
    /// Logical object path.
    name: String,
    #[serde(default)]
    bucket: Option<String>,
    #[serde(default)]
    content_type: Option<String>,
}

async fn handle_event(
    State(ctx): State<PipelineContext>,
    Json(req): Json<EventRequest>,
) -> Result<Json<DispatchReport>, AppError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(bad_request("name must not be empty"));
    }

    let span = info_span!(
        "event",
        invocation = %Uuid::new_v4(),
        path = %name,
        bucket = req.bucket.as_deref().unwrap_or("-"),
        content_type = req.content_type.as_deref().unwrap_or("-"),
    );
    let report = dispatch(&ctx, name, true).instrument(span).await?;
    Ok(Json(report))
}

// ============ /lessons/{level}/{lesson}/{pattern} ============

async fn handle_get_lesson(
    State(ctx): State<PipelineContext>,
    Path((level, lesson, pattern)): Path<(String, String, String)>,
) -> Result<Json<LessonView>, AppError> {
    let key = lesson_key(level, lesson, pattern)?;
    get_lesson(ctx.store.as_ref(), &key)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(format!("lesson not found: {}", key)))
}

async fn handle_get_dictation(
    State(ctx): State<PipelineContext>,
    Path((level, lesson, pattern)): Path<(String, String, String)>,
) -> Result<Json<DictationExercise>, AppError> {
    let key = lesson_key(level, lesson, pattern)?;
    ctx.store
        .get_exercise(&key)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(format!("no dictation for: {}", key)))
}

async fn handle_synthesize(
    State(ctx): State<PipelineContext>,
    Path((level, lesson, pattern)): Path<(String, String, String)>,
) -> Result<Json<SynthesisOutcome>, AppError> {
    let key = lesson_key(level, lesson, pattern)?;
    let span = info_span!("synthesize", invocation = %Uuid::new_v4(), key = %key);
    let outcome = synthesize(&ctx, &key).instrument(span).await?;
    Ok(Json(outcome))
}
