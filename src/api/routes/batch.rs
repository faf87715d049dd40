//! Batch orchestrator handlers.

use super::{StartBatchRequest, StartBatchResponse, StopBatchResponse};
use crate::api::AppState;
use crate::error::ApiError;
use crate::types::BatchStart;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use std::time::Duration;

/// POST /batch - Start a batch run
#[utoipa::path(
    post,
    path = "/batch",
    tag = "batch",
    request_body = StartBatchRequest,
    responses(
        (status = 202, description = "Batch started", body = StartBatchResponse),
        (status = 200, description = "A batch is already running; nothing changed", body = StartBatchResponse),
        (status = 400, description = "Empty query or missing API key", body = crate::error::ApiError),
        (status = 503, description = "Shutting down", body = crate::error::ApiError)
    )
)]
pub async fn start_batch(
    State(state): State<AppState>,
    Json(request): Json<StartBatchRequest>,
) -> impl IntoResponse {
    if request.query.trim().is_empty() {
        return ApiError::validation("query must not be empty").into_response();
    }

    let mut config = state
        .config
        .batch_defaults(request.query, request.start_page.unwrap_or(1));
    if let Some(secs) = request.per_item_delay {
        config.per_item_delay = Duration::from_secs(secs);
    }
    if let Some(auto_advance) = request.auto_advance_pages {
        config.auto_advance_pages = auto_advance;
    }

    match state.downloader.start_batch(config).await {
        Ok(BatchStart::Started) => (
            StatusCode::ACCEPTED,
            Json(StartBatchResponse {
                status: BatchStart::Started,
            }),
        )
            .into_response(),
        Ok(BatchStart::AlreadyRunning) => (
            StatusCode::OK,
            Json(StartBatchResponse {
                status: BatchStart::AlreadyRunning,
            }),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// DELETE /batch - Ask the running batch to stop
#[utoipa::path(
    delete,
    path = "/batch",
    tag = "batch",
    responses(
        (status = 202, description = "Stop requested; watch /events for batch_done", body = StopBatchResponse),
        (status = 200, description = "No batch was running", body = StopBatchResponse)
    )
)]
pub async fn stop_batch(State(state): State<AppState>) -> impl IntoResponse {
    let stopping = state.downloader.stop_batch().await;
    let status = if stopping {
        StatusCode::ACCEPTED
    } else {
        StatusCode::OK
    };
    (status, Json(StopBatchResponse { stopping }))
}

/// GET /batch - Batch status
#[utoipa::path(
    get,
    path = "/batch",
    tag = "batch",
    responses(
        (status = 200, description = "Current batch state", body = crate::types::BatchStatus)
    )
)]
pub async fn batch_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.downloader.batch_status().await)
}
