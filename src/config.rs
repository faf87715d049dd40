//! Configuration types for pixabay-dl
//!
//! The persisted form is a JSON object. Only `api_key` is required in practice;
//! every other field falls back to a default so a bare `{"api_key": "..."}` file
//! loads cleanly.

use crate::error::{Error, Result};
use crate::types::BatchConfig;
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::Path, path::PathBuf, time::Duration};
use utoipa::ToSchema;

/// Default location of the persisted configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Catalog API settings (endpoint, page size, filtering)
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CatalogConfig {
    /// Video search endpoint (default: "https://pixabay.com/api/videos/")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Items requested per page (default: 50)
    ///
    /// Also drives the page-has-more heuristic: a page with exactly this many
    /// items may have a successor, anything shorter is the last one.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Ask the API to filter unsafe content (default: true)
    #[serde(default = "default_true")]
    pub safe_search: bool,

    /// Video type filter: "all", "film" or "animation" (default: "all")
    #[serde(default = "default_video_type")]
    pub video_type: String,

    /// Timeout for a single page request (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub request_timeout: Duration,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            page_size: default_page_size(),
            safe_search: true,
            video_type: default_video_type(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// Download behavior configuration (destination, pacing, variant choice)
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DownloadConfig {
    /// Directory batch downloads are written to (default: "downloads")
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Prefix of generated filenames, `{prefix}-{id}.mp4` (default: "pixabay")
    #[serde(default = "default_filename_prefix")]
    pub filename_prefix: String,

    /// Pause between two consecutive batch items (default: 3 seconds)
    #[serde(default = "default_per_item_delay", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub per_item_delay: Duration,

    /// Continue with the next result page once a page is done (default: true)
    #[serde(default = "default_true")]
    pub auto_advance_pages: bool,

    /// Pause before fetching the next page during auto-advance (default: 2 seconds)
    #[serde(default = "default_page_settle_delay", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub page_settle_delay: Duration,

    /// Variant labels tried in order when picking a download URL
    #[serde(default = "default_variant_priority")]
    pub variant_priority: Vec<String>,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            filename_prefix: default_filename_prefix(),
            per_item_delay: default_per_item_delay(),
            auto_advance_pages: true,
            page_settle_delay: default_page_settle_delay(),
            variant_priority: default_variant_priority(),
        }
    }
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PersistenceConfig {
    /// Download history ledger path (default: "pixabay_history.json")
    #[serde(default = "default_history_path")]
    pub history_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            history_path: default_history_path(),
        }
    }
}

/// API and external server integration configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ServerIntegrationConfig {
    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:6790)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser front-ends (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Serve Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
        }
    }
}

/// Main configuration for PixabayDownloader
///
/// Fields are organized into logical sub-configs:
/// - [`catalog`](CatalogConfig) - remote search API
/// - [`download`](DownloadConfig) - destination, pacing, variant priority
/// - [`persistence`](PersistenceConfig) - ledger location
/// - [`server`](ServerIntegrationConfig) - REST API
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Pixabay API key (required for search and batch downloads)
    #[serde(default)]
    pub api_key: String,

    /// Catalog API settings
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Download behavior settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// Data storage settings
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// REST API settings
    #[serde(default)]
    pub server: ServerIntegrationConfig,
}

impl Config {
    /// Load configuration from a JSON file
    ///
    /// A missing or unreadable file, or one that does not parse, yields
    /// `Config::default()`. Broken configuration never prevents startup.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file, using defaults");
                return Self::default();
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read config, using defaults");
                return Self::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Malformed config, using defaults");
                Self::default()
            }
        }
    }

    /// Persist configuration as JSON, replacing the file atomically
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        crate::utils::write_json_atomic(path.as_ref(), self).await
    }

    /// Return the API key, or a configuration error when it is blank
    pub fn require_api_key(&self) -> Result<&str> {
        let key = self.api_key.trim();
        if key.is_empty() {
            return Err(Error::config(
                "Pixabay API key is not configured",
                "api_key",
            ));
        }
        Ok(key)
    }

    /// Build a batch snapshot from the download settings
    pub fn batch_defaults(&self, query: impl Into<String>, start_page: u32) -> BatchConfig {
        BatchConfig {
            query: query.into(),
            start_page: start_page.max(1),
            per_item_delay: self.download.per_item_delay,
            auto_advance_pages: self.download.auto_advance_pages,
        }
    }

    /// Copy of this configuration with the API key masked, for display
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if !config.api_key.is_empty() {
            config.api_key = "********".to_string();
        }
        config
    }
}

// Default value functions
fn default_base_url() -> String {
    "https://pixabay.com/api/videos/".to_string()
}

fn default_page_size() -> u32 {
    50
}

fn default_video_type() -> String {
    "all".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_filename_prefix() -> String {
    "pixabay".to_string()
}

fn default_per_item_delay() -> Duration {
    Duration::from_secs(3)
}

fn default_page_settle_delay() -> Duration {
    Duration::from_secs(2)
}

fn default_variant_priority() -> Vec<String> {
    vec![
        "large".into(),
        "medium".into(),
        "small".into(),
        "tiny".into(),
    ]
}

fn default_history_path() -> PathBuf {
    PathBuf::from("pixabay_history.json")
}

fn default_true() -> bool {
    true
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 6790))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".into()]
}

// Duration serialization helper (whole seconds)
pub(crate) mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn bare_api_key_file_fills_every_default() {
        let config: Config = serde_json::from_str(r#"{"api_key": "abc123"}"#).unwrap();

        assert_eq!(config.api_key, "abc123");
        assert_eq!(config.catalog.page_size, 50);
        assert!(config.catalog.safe_search);
        assert_eq!(config.download.per_item_delay, Duration::from_secs(3));
        assert_eq!(config.download.page_settle_delay, Duration::from_secs(2));
        assert!(config.download.auto_advance_pages);
        assert_eq!(
            config.download.variant_priority,
            vec!["large", "medium", "small", "tiny"]
        );
        assert_eq!(
            config.persistence.history_path,
            PathBuf::from("pixabay_history.json")
        );
    }

    #[test]
    fn load_missing_file_yields_default() {
        let dir = tempdir().unwrap();
        let config = Config::load(dir.path().join("absent.json"));
        assert!(config.api_key.is_empty());
    }

    #[test]
    fn load_malformed_file_yields_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ this is not json").unwrap();

        let config = Config::load(&path);
        assert!(
            config.api_key.is_empty(),
            "corrupt config must be treated as absent"
        );
    }

    #[tokio::test]
    async fn save_then_load_preserves_api_key_and_settings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::default();
        config.api_key = "secret".to_string();
        config.download.per_item_delay = Duration::from_secs(7);
        config.save(&path).await.unwrap();

        let loaded = Config::load(&path);
        assert_eq!(loaded.api_key, "secret");
        assert_eq!(loaded.download.per_item_delay, Duration::from_secs(7));
    }

    #[test]
    fn require_api_key_rejects_blank_key() {
        let mut config = Config::default();
        config.api_key = "   ".to_string();

        match config.require_api_key() {
            Err(Error::Config { key, .. }) => assert_eq!(key.as_deref(), Some("api_key")),
            other => panic!("expected config error, got {other:?}"),
        }

        config.api_key = "k".to_string();
        assert_eq!(config.require_api_key().unwrap(), "k");
    }

    #[test]
    fn batch_defaults_copies_download_settings_and_clamps_page() {
        let mut config = Config::default();
        config.download.per_item_delay = Duration::from_secs(1);
        config.download.auto_advance_pages = false;

        let batch = config.batch_defaults("ocean", 0);
        assert_eq!(batch.query, "ocean");
        assert_eq!(batch.start_page, 1);
        assert_eq!(batch.per_item_delay, Duration::from_secs(1));
        assert!(!batch.auto_advance_pages);
    }

    #[test]
    fn redacted_masks_key_only_when_set() {
        let mut config = Config::default();
        assert_eq!(config.redacted().api_key, "");

        config.api_key = "secret".to_string();
        let redacted = config.redacted();
        assert_eq!(redacted.api_key, "********");
        assert_eq!(config.api_key, "secret", "source config must be untouched");
    }

    #[test]
    fn duration_serde_serializes_as_seconds() {
        let json = serde_json::to_value(DownloadConfig::default()).unwrap();
        assert_eq!(json["per_item_delay"], 3);
        assert_eq!(json["page_settle_delay"], 2);
    }
}
