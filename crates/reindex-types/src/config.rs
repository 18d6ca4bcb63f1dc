//! Configuration loading for the reindex pipeline.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at `<config dir>/reindex/config.toml`.

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::ConfigError;

/// Request timing and connection limits for the index service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestSettings {
    /// Upper bound on a single request attempt (ms)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Total attempts per request, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry (ms); doubles per retry
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Maximum concurrent connections to the index service
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_max_attempts() -> u32 {
    5
}

fn default_backoff_base_ms() -> u64 {
    1000
}

fn default_max_connections() -> usize {
    10
}

impl Default for RequestSettings {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            max_connections: default_max_connections(),
        }
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Index service base URL
    #[serde(default = "default_index_url")]
    pub index_url: String,

    /// Index service API key (loaded from env var, not stored in config file)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Path to the RocksDB source store
    #[serde(default = "default_source_path")]
    pub source_path: String,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Documents per extraction batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Documents per page on paged reads
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Document field holding the source timestamp
    #[serde(default = "default_timestamp_field")]
    pub timestamp_field: String,

    /// Source collections, reindexed in this order
    #[serde(default = "default_collections")]
    pub collections: Vec<String>,

    /// Suffix appended to a collection name to form its staging index
    #[serde(default = "default_staging_suffix")]
    pub staging_suffix: String,

    /// Settings payload per collection, sent when creating its staging index
    #[serde(default)]
    pub index_settings: HashMap<String, serde_json::Value>,

    /// Request timing
    #[serde(default)]
    pub request: RequestSettings,
}

fn default_index_url() -> String {
    "http://localhost:7700".to_string()
}

fn default_source_path() -> String {
    ProjectDirs::from("", "", "reindex")
        .map(|p| p.data_local_dir().join("source"))
        .unwrap_or_else(|| PathBuf::from("./source"))
        .to_string_lossy()
        .to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_batch_size() -> usize {
    500
}

fn default_page_size() -> usize {
    1000
}

fn default_timestamp_field() -> String {
    "createdAt".to_string()
}

fn default_collections() -> Vec<String> {
    vec!["conversations".to_string(), "messages".to_string()]
}

fn default_staging_suffix() -> String {
    "_temp".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            index_url: default_index_url(),
            api_key: None,
            source_path: default_source_path(),
            log_level: default_log_level(),
            batch_size: default_batch_size(),
            page_size: default_page_size(),
            timestamp_field: default_timestamp_field(),
            collections: default_collections(),
            staging_suffix: default_staging_suffix(),
            index_settings: HashMap::new(),
            request: RequestSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (<config dir>/reindex/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (REINDEX_*)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, ConfigError> {
        let config_dir = ProjectDirs::from("", "", "reindex")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("index_url", default_index_url())?
            .set_default("source_path", default_source_path())?
            .set_default("log_level", default_log_level())?
            .set_default("batch_size", default_batch_size() as i64)?
            .set_default("page_size", default_page_size() as i64)?
            .set_default("timestamp_field", default_timestamp_field())?
            .set_default("collections", default_collections())?
            .set_default("staging_suffix", default_staging_suffix())?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Format: REINDEX_INDEX_URL, REINDEX_API_KEY, REINDEX_REQUEST__TIMEOUT_MS, ...
        builder = builder.add_source(
            Environment::with_prefix("REINDEX")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("collections")
                .try_parsing(true),
        );

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, reason: &str| {
            Err(ConfigError::InvalidSetting {
                key: key.to_string(),
                reason: reason.to_string(),
            })
        };

        if !(self.index_url.starts_with("http://") || self.index_url.starts_with("https://")) {
            return invalid("index_url", "must start with http:// or https://");
        }
        if self.batch_size == 0 {
            return invalid("batch_size", "must be > 0");
        }
        if self.page_size == 0 {
            return invalid("page_size", "must be > 0");
        }
        if self.collections.is_empty() {
            return invalid("collections", "at least one collection is required");
        }
        if self.collections.iter().any(|c| c.trim().is_empty()) {
            return invalid("collections", "collection names must not be empty");
        }
        if self.staging_suffix.is_empty() {
            return invalid("staging_suffix", "must not be empty");
        }
        if self.request.timeout_ms == 0 {
            return invalid("request.timeout_ms", "must be > 0");
        }
        if self.request.max_attempts == 0 {
            return invalid("request.max_attempts", "must be > 0");
        }
        if self.request.max_connections == 0 {
            return invalid("request.max_connections", "must be > 0");
        }
        Ok(())
    }

    /// Staging index settings for a collection (empty object when unset).
    pub fn index_settings_for(&self, collection: &str) -> serde_json::Value {
        self.index_settings
            .get(collection)
            .cloned()
            .unwrap_or_else(|| serde_json::json!({}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.index_url, "http://localhost:7700");
        assert_eq!(settings.batch_size, 500);
        assert_eq!(settings.page_size, 1000);
        assert_eq!(settings.collections, vec!["conversations", "messages"]);
        assert_eq!(settings.request.timeout_ms, 5000);
        assert_eq!(settings.request.max_attempts, 5);
        assert_eq!(settings.request.backoff_base_ms, 1000);
        assert_eq!(settings.request.max_connections, 10);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_index_settings_default_to_empty_object() {
        let mut settings = Settings::default();
        assert_eq!(settings.index_settings_for("messages"), serde_json::json!({}));

        settings.index_settings.insert(
            "messages".to_string(),
            serde_json::json!({"primaryKey": "id"}),
        );
        assert_eq!(
            settings.index_settings_for("messages"),
            serde_json::json!({"primaryKey": "id"})
        );
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut settings = Settings::default();
        settings.batch_size = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.index_url = "localhost:7700".to_string();
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.collections.clear();
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.request.max_attempts = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_load_from_explicit_file() {
        let dir = std::env::temp_dir().join(format!("reindex-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("settings.toml");
        std::fs::write(
            &path,
            "index_url = \"http://search:7700\"\nbatch_size = 250\ncollections = [\"messages\"]\n\n[request]\ntimeout_ms = 2000\n",
        )
        .unwrap();

        let settings = Settings::load(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(settings.index_url, "http://search:7700");
        assert_eq!(settings.batch_size, 250);
        assert_eq!(settings.collections, vec!["messages"]);
        assert_eq!(settings.request.timeout_ms, 2000);
        assert_eq!(settings.request.max_attempts, 5);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
