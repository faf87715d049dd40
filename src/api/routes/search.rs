//! Search handlers.

use super::SearchQuery;
use crate::api::AppState;
use crate::error::{ApiError, Error};
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};

/// GET /search - Search the catalog
#[utoipa::path(
    get,
    path = "/search",
    tag = "search",
    params(SearchQuery),
    responses(
        (status = 200, description = "One page of results", body = crate::types::SearchResults),
        (status = 400, description = "Empty query or missing API key", body = crate::error::ApiError),
        (status = 502, description = "Catalog API failure", body = crate::error::ApiError)
    )
)]
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> impl IntoResponse {
    if query.q.trim().is_empty() {
        return ApiError::validation("query must not be empty").into_response();
    }

    match state
        .downloader
        .search(&query.q, query.page.unwrap_or(1))
        .await
    {
        Ok(results) => (StatusCode::OK, Json(results)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /results - Current results with ledger status
#[utoipa::path(
    get,
    path = "/results",
    tag = "search",
    responses(
        (status = 200, description = "Current results", body = crate::types::SearchResults),
        (status = 404, description = "Nothing searched yet", body = crate::error::ApiError)
    )
)]
pub async fn current_results(State(state): State<AppState>) -> impl IntoResponse {
    match state.downloader.current_results().await {
        Some(results) => (StatusCode::OK, Json(results)).into_response(),
        None => Error::NotFound("no search results yet".to_string()).into_response(),
    }
}
