//! Draft handlers: run the pipeline for a folder path or a request token,
//! and issue those tokens.

use crate::DraftStatus;
use crate::api::AppState;
use crate::error::ApiError;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// POST /drafts - Run a draft for a remote folder
///
/// Body: `{ "path": "/PROPERTY SHOOTS/Edited/52 Thrale Road" }`
///
/// Answers 200 with the [`DraftResult`](crate::DraftResult) whenever the
/// folder could be listed, including when analysis or upload failed; the
/// `status` field tells those cases apart.
pub async fn create_draft(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> Response {
    let path = match required_field(&payload, "path") {
        Ok(path) => path,
        Err(e) => return e.into_response(),
    };

    tracing::info!(remote_path = %path, "draft requested");
    run_draft(&state, path).await
}

/// POST /tokens - Issue a request token for a remote folder
///
/// Body: `{ "path": "/PROPERTY SHOOTS/Edited/52 Thrale Road" }`. Answers 201
/// with the [`IssuedToken`](crate::IssuedToken).
pub async fn issue_token(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> Response {
    let path = match required_field(&payload, "path") {
        Ok(path) => path,
        Err(e) => return e.into_response(),
    };

    match state.resolver.issue(path).await {
        Ok(issued) => (StatusCode::CREATED, Json(issued)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /drafts/token - Run a draft for the folder registered to a token
///
/// Body: `{ "token": "..." }`. An unknown, expired, or used token answers
/// 404. The token is spent once a draft has been written for it.
pub async fn create_draft_from_token(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> Response {
    let token = match required_field(&payload, "token") {
        Ok(token) => token,
        Err(e) => return e.into_response(),
    };

    let path = match state.resolver.resolve(token).await {
        Ok(path) => path,
        Err(e) => {
            tracing::warn!(error = %e, "draft requested for unknown token");
            return e.into_response();
        }
    };

    tracing::info!(remote_path = %path, "draft requested by token");
    match state.orchestrator.run(&path).await {
        Ok(result) => {
            let draft_written = matches!(
                result.status,
                DraftStatus::Completed | DraftStatus::AnalysisFailed
            );
            if draft_written {
                if let Err(e) = state.resolver.mark_used(token).await {
                    tracing::warn!(error = %e, "failed to mark request token used");
                }
            }
            (StatusCode::OK, Json(result)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

async fn run_draft(state: &AppState, path: &str) -> Response {
    match state.orchestrator.run(path).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => e.into_response(),
    }
}

fn required_field<'a>(payload: &'a serde_json::Value, field: &str) -> Result<&'a str, ApiError> {
    match payload.get(field).and_then(|v| v.as_str()).map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value),
        Some(_) => Err(ApiError::validation(format!("{field} must not be empty"))),
        None => Err(ApiError::validation(format!(
            "Missing required field: {field}"
        ))),
    }
}
