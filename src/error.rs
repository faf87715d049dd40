//! Error types for pixabay-dl
//!
//! This module provides error handling for the library, including:
//! - A single domain error type covering configuration, transport, and persistence failures
//! - HTTP status code mapping for the REST API
//! - Structured error responses with machine-readable error codes

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for pixabay-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for pixabay-dl
///
/// Each variant carries enough context to be reported to a user without
/// further lookups (the offending key, item id, or HTTP status).
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "api_key")
        key: Option<String>,
    },

    /// Transport-level HTTP failure (connect, timeout, body read)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The remote API answered with a non-success status
    #[error("catalog API returned {status}: {message}")]
    Api {
        /// HTTP status code returned by the remote service
        status: u16,
        /// Response body or reason phrase
        message: String,
    },

    /// A remote asset answered with a non-success status
    #[error("asset request for {url} returned {status}")]
    AssetStatus {
        /// The asset URL that was requested
        url: String,
        /// HTTP status code returned by the asset host
        status: u16,
    },

    /// The item has no downloadable variant
    #[error("no downloadable variant for item {id}")]
    NoVariant {
        /// The item that cannot be downloaded
        id: String,
    },

    /// The item is already being transferred by another download
    #[error("item {id} is already being downloaded")]
    InProgress {
        /// The item being transferred
        id: String,
    },

    /// Writing a downloaded asset to its destination failed
    #[error("failed to write {path}: {source}")]
    Write {
        /// Destination path that could not be written
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Requested resource (e.g. an item id not in the current results) not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Shutdown in progress - not accepting new work
    #[error("shutdown in progress: not accepting new work")]
    ShuttingDown,

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for a configuration error tied to a specific key
    pub fn config(message: impl Into<String>, key: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }
}

/// API error response format
///
/// Returned by API endpoints when an error occurs.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "no_variant",
///     "message": "no downloadable variant for item 123",
///     "details": { "item_id": "123" }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "config_error")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create a "validation error" error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("validation_error", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - missing API key or invalid settings
            Error::Config { .. } => 400,

            // 404 Not Found
            Error::NotFound(_) => 404,

            // 422 Unprocessable Entity - item exists but cannot be downloaded
            Error::NoVariant { .. } => 422,

            // 409 Conflict - same item already in flight
            Error::InProgress { .. } => 409,

            // 500 Internal Server Error
            Error::Io(_) => 500,
            Error::Write { .. } => 500,
            Error::Serialization(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Other(_) => 500,

            // 502 Bad Gateway - upstream failures
            Error::Network(_) => 502,
            Error::Api { .. } => 502,
            Error::AssetStatus { .. } => 502,

            // 503 Service Unavailable
            Error::ShuttingDown => 503,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Network(_) => "network_error",
            Error::Api { .. } => "catalog_api_error",
            Error::AssetStatus { .. } => "asset_error",
            Error::NoVariant { .. } => "no_variant",
            Error::InProgress { .. } => "in_progress",
            Error::Write { .. } => "write_error",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::NotFound(_) => "not_found",
            Error::ShuttingDown => "shutting_down",
            Error::ApiServerError(_) => "api_server_error",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({
                "key": key,
            })),
            Error::Api { status, .. } => Some(serde_json::json!({
                "upstream_status": status,
            })),
            Error::AssetStatus { url, status } => Some(serde_json::json!({
                "url": url,
                "upstream_status": status,
            })),
            Error::NoVariant { id } | Error::InProgress { id } => Some(serde_json::json!({
                "item_id": id,
            })),
            Error::Write { path, .. } => Some(serde_json::json!({
                "path": path,
            })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
