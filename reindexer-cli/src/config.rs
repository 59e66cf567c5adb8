//! Operator configuration file
//!
//! ```toml
//! [elasticsearch]
//! url = "https://es.internal:9200"
//! username = "elastic"
//! password = "changeme"
//!
//! [reindex]
//! max_slices_running = 60
//!
//! [indices]
//! main = "gitlab-production"
//! standalone = ["gitlab-production-issues"]
//!
//! [state]
//! dir = "/var/lib/reindexer"
//!
//! [observability]
//! log_format = "json"
//! metrics_addr = "0.0.0.0:9464"
//! ```

use anyhow::{bail, Context, Result};
use reindexer::{IndexCatalog, ReindexConfig};
use reindexer_elastic::ElasticConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub elasticsearch: ElasticConfig,

    #[serde(default)]
    pub reindex: ReindexConfig,

    #[serde(default)]
    pub indices: IndexCatalog,

    #[serde(default)]
    pub state: StateConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Where tasks and the indexing toggle are persisted
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StateConfig {
    #[serde(default = "default_state_dir")]
    pub dir: PathBuf,
}

fn default_state_dir() -> PathBuf {
    PathBuf::from("reindexer-state")
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            dir: default_state_dir(),
        }
    }
}

impl StateConfig {
    pub fn tasks_dir(&self) -> PathBuf {
        self.dir.join("tasks")
    }

    pub fn indexing_file(&self) -> PathBuf {
        self.dir.join("indexing.json")
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log output format: "pretty" or "json"
    /// Override with LOG_FORMAT env var
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter string
    /// Override with RUST_LOG env var
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Serve Prometheus metrics on this address while the CLI runs
    #[serde(default)]
    pub metrics_addr: Option<String>,
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: default_log_format(),
            log_level: default_log_level(),
            metrics_addr: None,
        }
    }
}

impl ObservabilityConfig {
    pub fn metrics_addr(&self) -> Result<Option<SocketAddr>> {
        self.metrics_addr
            .as_deref()
            .map(|addr| {
                addr.parse()
                    .with_context(|| format!("Invalid observability.metrics_addr '{}'", addr))
            })
            .transpose()
    }
}

impl Config {
    /// Load the config file; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        } else {
            Config::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.reindex.validate()?;

        if self.indices.all().is_empty() {
            bail!("No indices configured: set indices.main and/or indices.standalone");
        }

        match self.observability.log_format.as_str() {
            "pretty" | "json" => {}
            other => bail!("Unknown observability.log_format '{}'", other),
        }
        self.observability.metrics_addr()?;

        Ok(())
    }
}
