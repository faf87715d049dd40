//! OpenAPI documentation and schema generation
//!
//! This module defines the OpenAPI specification for the pixabay-dl REST API
//! using utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the pixabay-dl REST API
///
/// The spec can be accessed via:
/// - `/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "pixabay-dl REST API",
        version = "0.1.0",
        description = "REST API for searching the Pixabay video catalog and running deduplicated batch downloads",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:6790", description = "Local development server")
    ),
    paths(
        // Search
        crate::api::routes::search,
        crate::api::routes::current_results,

        // Batch
        crate::api::routes::start_batch,
        crate::api::routes::stop_batch,
        crate::api::routes::batch_status,

        // Downloads
        crate::api::routes::download_item,

        // History
        crate::api::routes::history_count,
        crate::api::routes::export_history,
        crate::api::routes::import_history,
        crate::api::routes::clear_history,

        // Configuration
        crate::api::routes::get_config,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
        crate::api::routes::shutdown,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::ItemId,
        crate::types::Variant,
        crate::types::CatalogItem,
        crate::types::Page,
        crate::types::ItemView,
        crate::types::SearchResults,
        crate::types::BatchConfig,
        crate::types::BatchState,
        crate::types::BatchStart,
        crate::types::BatchStatus,
        crate::types::StopReason,
        crate::types::Event,

        // Config types from config.rs
        crate::config::Config,
        crate::config::CatalogConfig,
        crate::config::DownloadConfig,
        crate::config::PersistenceConfig,
        crate::config::ServerIntegrationConfig,
        crate::config::ApiConfig,

        // API request/response types from routes
        crate::api::routes::SearchQuery,
        crate::api::routes::StartBatchRequest,
        crate::api::routes::StartBatchResponse,
        crate::api::routes::StopBatchResponse,
        crate::api::routes::DownloadRequest,
        crate::api::routes::DownloadResponse,
        crate::api::routes::HistoryCountResponse,
        crate::api::routes::ImportHistoryResponse,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "search", description = "Catalog search - Query pages of video results"),
        (name = "batch", description = "Batch downloads - Start, stop and monitor the batch orchestrator"),
        (name = "downloads", description = "Single downloads - Download one item of the current results"),
        (name = "history", description = "Download history - Count, export, import and clear downloaded ids"),
        (name = "config", description = "Configuration - Inspect the running configuration"),
        (name = "system", description = "System endpoints - Health checks, OpenAPI spec, events, shutdown"),
    )
)]
pub struct ApiDoc;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_spec_has_paths_for_every_route_group() {
        let spec = ApiDoc::openapi();

        for path in ["/search", "/batch", "/downloads", "/history", "/events"] {
            assert!(
                spec.paths.paths.contains_key(path),
                "OpenAPI spec should document {path}"
            );
        }
    }

    #[test]
    fn test_openapi_spec_has_tags() {
        let spec = ApiDoc::openapi();

        let tags = spec.tags.unwrap();
        let tag_names: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();
        for tag in ["search", "batch", "downloads", "history", "config", "system"] {
            assert!(tag_names.contains(&tag), "Should have '{tag}' tag");
        }
    }

    #[test]
    fn test_openapi_spec_info() {
        let spec = ApiDoc::openapi();

        assert_eq!(spec.info.title, "pixabay-dl REST API");
        assert_eq!(spec.info.version, "0.1.0");
        assert!(spec.info.description.is_some());
    }

    #[test]
    fn test_openapi_json_serialization() {
        let spec = ApiDoc::openapi();

        let json = serde_json::to_value(&spec).expect("Should serialize to JSON");
        let version = json.get("openapi").and_then(|v| v.as_str());
        assert!(
            version.unwrap().starts_with("3."),
            "Should use OpenAPI 3.x version"
        );
        assert!(json["components"]["schemas"].get("Event").is_some());
    }
}
