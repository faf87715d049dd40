//! Single-item download handler.

use super::{DownloadRequest, DownloadResponse};
use crate::api::AppState;
use crate::error::ApiError;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use std::path::{Component, Path, PathBuf};

/// POST /downloads - Download one item of the current results
///
/// Unlike batch downloads, every failure is returned to the caller. Files
/// are always written inside the configured download directory.
#[utoipa::path(
    post,
    path = "/downloads",
    tag = "downloads",
    request_body = DownloadRequest,
    responses(
        (status = 201, description = "Item downloaded", body = DownloadResponse),
        (status = 400, description = "File name is not a bare name", body = crate::error::ApiError),
        (status = 404, description = "Item is not in the current results", body = crate::error::ApiError),
        (status = 409, description = "Item is already being downloaded", body = crate::error::ApiError),
        (status = 422, description = "Item has no downloadable variant", body = crate::error::ApiError),
        (status = 502, description = "Asset host failure", body = crate::error::ApiError),
        (status = 500, description = "File could not be written", body = crate::error::ApiError)
    )
)]
pub async fn download_item(
    State(state): State<AppState>,
    Json(request): Json<DownloadRequest>,
) -> impl IntoResponse {
    let destination = match request.file_name.as_deref() {
        None => None,
        Some(name) => match resolve_file_name(&state.config.download.download_dir, name) {
            Some(path) => Some(path),
            None => {
                return ApiError::validation(
                    "file_name must be a plain file name without directories",
                )
                .into_response();
            }
        },
    };

    match state
        .downloader
        .download_result(&request.id, destination)
        .await
    {
        Ok(path) => (
            StatusCode::CREATED,
            Json(DownloadResponse {
                id: request.id,
                path,
            }),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Join `name` onto `dir` when it is a single normal path component
fn resolve_file_name(dir: &Path, name: &str) -> Option<PathBuf> {
    if name.contains(['/', '\\']) {
        return None;
    }
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(part)), None) => Some(dir.join(part)),
        _ => None,
    }
}
