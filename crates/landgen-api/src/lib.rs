//! # landgen-api
//!
//! HTTP surface of the landgen job queue: enqueue jobs, trigger a dispatch
//! cycle, and inspect the queue and its attempt log.

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::error;
use uuid::Uuid;

use landgen_core::{defaults, AuditRepository, JobRepository};
use landgen_jobs::Dispatcher;

pub mod handlers;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub jobs: Arc<dyn JobRepository>,
    pub audit: Arc<dyn AuditRepository>,
    pub dispatcher: Arc<Dispatcher>,
    /// Bearer token required by `POST /api/v1/dispatch` when set.
    pub dispatch_secret: Option<String>,
    /// Attempt limit for enqueue requests that do not carry one.
    pub default_max_attempts: i32,
}

impl AppState {
    pub fn new(
        jobs: Arc<dyn JobRepository>,
        audit: Arc<dyn AuditRepository>,
        dispatcher: Arc<Dispatcher>,
    ) -> Self {
        Self {
            jobs,
            audit,
            dispatcher,
            dispatch_secret: None,
            default_max_attempts: defaults::JOB_MAX_ATTEMPTS,
        }
    }

    pub fn with_dispatch_secret(mut self, secret: Option<String>) -> Self {
        self.dispatch_secret = secret.filter(|s| !s.trim().is_empty());
        self
    }

    pub fn with_default_max_attempts(mut self, max_attempts: i32) -> Self {
        self.default_max_attempts = max_attempts.max(1);
        self
    }
}

/// Generates time-ordered UUIDv7 request correlation IDs.
#[derive(Clone, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

/// Build the application router with tracing and request-id layers.
pub fn router(state: AppState) -> Router {
    use handlers::{dispatch, jobs};

    Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/jobs", post(jobs::create_jobs).get(jobs::list_jobs))
        .route("/api/v1/jobs/stats", get(jobs::queue_stats))
        .route("/api/v1/jobs/:id", get(jobs::get_job))
        .route("/api/v1/jobs/:id/attempts", get(jobs::list_attempts))
        .route("/api/v1/dispatch", post(dispatch::run_dispatch))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Errors returned by handlers, rendered as `{"error": message}`.
#[derive(Debug)]
pub enum ApiError {
    Internal(landgen_core::Error),
    Unauthorized(String),
    NotFound(String),
    BadRequest(String),
}

impl From<landgen_core::Error> for ApiError {
    fn from(err: landgen_core::Error) -> Self {
        match err {
            landgen_core::Error::NotFound(msg) => ApiError::NotFound(msg),
            landgen_core::Error::Validation(msg) => ApiError::BadRequest(msg),
            other => ApiError::Internal(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Internal(err) => {
                error!(error = %err, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
