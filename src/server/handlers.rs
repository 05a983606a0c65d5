//! API endpoint handlers.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::warn;

use super::AppState;
use crate::config::ParamOverrides;

/// Health check endpoint for container orchestration.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "foliacheck",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

/// Run the pipeline over the uploaded PDF.
///
/// The request body is the raw document; query parameters override the
/// server's default pipeline parameters.
pub async fn check_foliation(
    State(state): State<AppState>,
    Query(overrides): Query<ParamOverrides>,
    body: Bytes,
) -> Response {
    if body.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "request body must contain a PDF document",
        );
    }

    let params = state.defaults.merged(&overrides);
    let pipeline = state.pipeline.clone();
    let result = tokio::task::spawn_blocking(move || pipeline.run(&body, &params)).await;

    match result {
        Ok(Ok(report)) => Json(report).into_response(),
        Ok(Err(e)) => {
            warn!("Foliation request failed: {}", e);
            let status = if e.is_client_error() {
                StatusCode::UNPROCESSABLE_ENTITY
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            error_response(status, &e.to_string())
        }
        Err(e) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!("pipeline task failed: {}", e),
        ),
    }
}
