//! Elasticsearch connection settings (`[elasticsearch]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElasticConfig {
    /// Base URL of the cluster
    #[serde(default = "default_url")]
    pub url: String,

    /// Basic auth user
    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Encoded API key, sent as `Authorization: ApiKey <key>`. Takes
    /// precedence over basic auth.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// JSON file with `settings` and `mappings` for new main indices.
    /// Unset copies them from the current main index.
    #[serde(default)]
    pub main_index_template: Option<PathBuf>,

    /// Index tracking search migrations; unset means no migrations are tracked
    #[serde(default)]
    pub migrations_index: Option<String>,
}

fn default_url() -> String {
    "http://localhost:9200".to_string()
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

impl Default for ElasticConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            username: None,
            password: None,
            api_key: None,
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            main_index_template: None,
            migrations_index: None,
        }
    }
}

impl ElasticConfig {
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
