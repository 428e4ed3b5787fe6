//! Dispatch trigger, normally hit by a scheduler once a minute.

use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::IntoResponse,
    Json,
};
use serde_json::json;

use landgen_jobs::DispatchOutcome;

use crate::{ApiError, AppState};

/// Check `Authorization: Bearer <secret>` when a dispatch secret is configured.
fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(secret) = state.dispatch_secret.as_deref() else {
        return Ok(());
    };

    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);

    match token {
        Some(token) if token == secret => Ok(()),
        _ => Err(ApiError::Unauthorized("Unauthorized".to_string())),
    }
}

/// `POST /api/v1/dispatch`: run one dispatch cycle and report it.
pub async fn run_dispatch(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, &headers)?;

    let body = match state.dispatcher.run_cycle().await? {
        DispatchOutcome::Skipped { processing, .. } => json!({
            "success": true,
            "skipped": true,
            "processing": processing,
        }),
        DispatchOutcome::Completed(summary) => {
            let mut body = serde_json::to_value(&summary)
                .map_err(|e| ApiError::Internal(e.into()))?;
            body["success"] = json!(true);
            body
        }
    };
    Ok(Json(body))
}
