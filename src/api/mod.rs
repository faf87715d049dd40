//! REST API server module
//!
//! Provides an OpenAPI 3.1 compliant REST API for searching the catalog,
//! driving batch downloads, and managing the download history.

use crate::{Config, PixabayDownloader, Result};
use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Search
/// - `GET /search?q=&page=` - Search the catalog, making the page current
/// - `GET /results` - Current results with ledger status
///
/// ## Batch
/// - `POST /batch` - Start a batch run
/// - `GET /batch` - Batch status
/// - `DELETE /batch` - Request the running batch to stop
///
/// ## Downloads
/// - `POST /downloads` - Download one item of the current results
///
/// ## History
/// - `GET /history` - Number of downloaded ids
/// - `DELETE /history` - Clear history
/// - `GET /history/export` - Ledger as a JSON array
/// - `POST /history/import` - Merge a JSON array of ids
///
/// ## Configuration
/// - `GET /config` - Get current config (API key redacted)
///
/// ## System
/// - `GET /health` - Health check
/// - `GET /openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive Swagger UI documentation (if enabled)
/// - `GET /events` - Server-sent events stream
/// - `POST /shutdown` - Graceful shutdown
pub fn create_router(downloader: Arc<PixabayDownloader>, config: Arc<Config>) -> Router {
    create_router_with_state(AppState::new(downloader, config))
}

/// Create the API router around an existing [`AppState`]
pub fn create_router_with_state(state: AppState) -> Router {
    let config = state.config.clone();

    let router = Router::new()
        // Search
        .route("/search", get(routes::search))
        .route("/results", get(routes::current_results))
        // Batch
        .route(
            "/batch",
            get(routes::batch_status)
                .post(routes::start_batch)
                .delete(routes::stop_batch),
        )
        // Downloads
        .route("/downloads", post(routes::download_item))
        // History
        .route(
            "/history",
            get(routes::history_count).delete(routes::clear_history),
        )
        .route("/history/export", get(routes::export_history))
        .route("/history/import", post(routes::import_history))
        // Configuration
        .route("/config", get(routes::get_config))
        // System
        .route("/health", get(routes::health_check))
        .route("/openapi.json", get(routes::openapi_spec))
        .route("/events", get(routes::event_stream))
        .route("/shutdown", post(routes::shutdown));

    // SwaggerUi serves its own copy of the OpenAPI document under a distinct URL
    let router = if config.server.api.swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
    } else {
        router
    };

    let router = router.with_state(state);

    if config.server.api.cors_enabled {
        let cors = build_cors_layer(&config.server.api.cors_origins);
        router.layer(cors)
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// `"*"` (or an empty list) allows any origin; otherwise only the listed
/// origins are allowed. All methods and headers are allowed.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address.
///
/// Runs until the server fails or `POST /shutdown` completes the downloader's
/// shutdown sequence.
///
/// # Example
///
/// ```no_run
/// use pixabay_dl::{Config, PixabayDownloader};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::load("config.json"));
/// let downloader = Arc::new(PixabayDownloader::new((*config).clone()).await?);
///
/// // Start API server (blocks until shutdown)
/// pixabay_dl::api::start_api_server(downloader, config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(
    downloader: Arc<PixabayDownloader>,
    config: Arc<Config>,
) -> Result<()> {
    let bind_address = config.server.api.bind_address;

    tracing::info!(address = %bind_address, "Starting API server");

    let state = AppState::new(downloader, config);
    let stopped = state.shutdown_token.clone();
    let app = create_router_with_state(state);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(address = %bind_address, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { stopped.cancelled().await })
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
