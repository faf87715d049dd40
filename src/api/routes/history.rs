//! History ledger handlers.

use super::{HistoryCountResponse, ImportHistoryResponse};
use crate::api::AppState;
use crate::types::ItemId;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

/// GET /history - Number of downloaded ids
#[utoipa::path(
    get,
    path = "/history",
    tag = "history",
    responses(
        (status = 200, description = "Ledger size", body = HistoryCountResponse)
    )
)]
pub async fn history_count(State(state): State<AppState>) -> impl IntoResponse {
    Json(HistoryCountResponse {
        count: state.downloader.downloaded_count(),
    })
}

/// GET /history/export - Ledger as a JSON array of ids
#[utoipa::path(
    get,
    path = "/history/export",
    tag = "history",
    responses(
        (status = 200, description = "All recorded ids, sorted", body = Vec<String>)
    )
)]
pub async fn export_history(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.downloader.history().snapshot())
}

/// POST /history/import - Merge ids into the ledger
#[utoipa::path(
    post,
    path = "/history/import",
    tag = "history",
    request_body(content = Vec<String>, description = "JSON array of ids (strings or integers)"),
    responses(
        (status = 200, description = "Ids merged", body = ImportHistoryResponse),
        (status = 500, description = "Ledger could not be persisted", body = crate::error::ApiError)
    )
)]
pub async fn import_history(
    State(state): State<AppState>,
    Json(ids): Json<Vec<ItemId>>,
) -> impl IntoResponse {
    let history = state.downloader.history();
    match history.merge(ids.into_iter().map(|id| id.0)).await {
        Ok(added) => (
            StatusCode::OK,
            Json(ImportHistoryResponse {
                added,
                count: history.count(),
            }),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// DELETE /history - Clear history
#[utoipa::path(
    delete,
    path = "/history",
    tag = "history",
    responses(
        (status = 200, description = "Ledger cleared", body = HistoryCountResponse),
        (status = 500, description = "Ledger could not be persisted", body = crate::error::ApiError)
    )
)]
pub async fn clear_history(State(state): State<AppState>) -> impl IntoResponse {
    match state.downloader.history().clear().await {
        Ok(()) => (StatusCode::OK, Json(HistoryCountResponse { count: 0 })).into_response(),
        Err(e) => e.into_response(),
    }
}
