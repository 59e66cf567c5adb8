//! Reindexing configuration
//!
//! Parsed from the `[reindex]` section of the operator's TOML file.
//!
//! ```toml
//! [reindex]
//! max_retry_limit = 20
//! max_slices_running = 60
//! slice_multiplier = 2
//! tick_interval_secs = 60
//! scroll = "2h"
//! delete_original_index_after = "14d"
//! storage_safety_factor = 2.0
//! slice_timeout = "6h"
//!
//! [reindex.index_overrides.projects]
//! number_of_shards = 12
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Orchestrator tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReindexConfig {
    /// How many times a single slice may be re-issued after a failure
    #[serde(default = "default_max_retry_limit")]
    pub max_retry_limit: u32,

    /// Default task-wide bound on in-flight slices
    #[serde(default = "default_max_slices_running")]
    pub max_slices_running: usize,

    /// Default slices per source shard
    #[serde(default = "default_slice_multiplier")]
    pub slice_multiplier: u32,

    /// Delay the scheduler waits between two ticks
    #[serde(default = "default_tick_interval")]
    pub tick_interval_secs: u64,

    /// Scroll keep-alive passed to every reindex operation
    #[serde(default = "default_scroll")]
    pub scroll: String,

    /// Grace window before original indices are deleted (e.g. "14d")
    #[serde(default = "default_delete_original_index_after")]
    pub delete_original_index_after: String,

    /// Free storage required, as a multiple of the summed size of migrated indices
    #[serde(default = "default_storage_safety_factor")]
    pub storage_safety_factor: f64,

    /// Give up on a slice that has been running longer than this (e.g. "6h").
    /// Unset means slices may run indefinitely.
    #[serde(default)]
    pub slice_timeout: Option<String>,

    /// Per-alias settings for the destination index
    #[serde(default)]
    pub index_overrides: HashMap<String, IndexOverride>,
}

fn default_max_retry_limit() -> u32 {
    20
}

fn default_max_slices_running() -> usize {
    60
}

fn default_slice_multiplier() -> u32 {
    2
}

fn default_tick_interval() -> u64 {
    60
}

fn default_scroll() -> String {
    "2h".to_string()
}

fn default_delete_original_index_after() -> String {
    "14d".to_string()
}

fn default_storage_safety_factor() -> f64 {
    2.0
}

impl Default for ReindexConfig {
    fn default() -> Self {
        Self {
            max_retry_limit: default_max_retry_limit(),
            max_slices_running: default_max_slices_running(),
            slice_multiplier: default_slice_multiplier(),
            tick_interval_secs: default_tick_interval(),
            scroll: default_scroll(),
            delete_original_index_after: default_delete_original_index_after(),
            storage_safety_factor: default_storage_safety_factor(),
            slice_timeout: None,
            index_overrides: HashMap::new(),
        }
    }
}

/// Destination index settings for one alias
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexOverride {
    /// Shard count of the new index; unset keeps the engine default
    #[serde(default)]
    pub number_of_shards: Option<u32>,
}

impl ReindexConfig {
    /// Delay between ticks
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    /// Grace window before original indices may be deleted
    pub fn delete_original_index_after(&self) -> Result<chrono::Duration> {
        let grace = parse_duration(&self.delete_original_index_after).ok_or_else(|| {
            Error::Config(format!(
                "invalid delete_original_index_after '{}'",
                self.delete_original_index_after
            ))
        })?;
        chrono::Duration::from_std(grace).map_err(|e| Error::Config(e.to_string()))
    }

    /// Staleness bound for one slice, if configured
    pub fn slice_timeout(&self) -> Result<Option<Duration>> {
        match &self.slice_timeout {
            None => Ok(None),
            Some(s) => parse_duration(s)
                .map(Some)
                .ok_or_else(|| Error::Config(format!("invalid slice_timeout '{}'", s))),
        }
    }

    /// Shard override for the destination of `alias`
    pub fn number_of_shards_for(&self, alias: &str) -> Option<u32> {
        self.index_overrides
            .get(alias)
            .and_then(|o| o.number_of_shards)
    }

    /// Check values that would otherwise stall or break a task
    pub fn validate(&self) -> Result<()> {
        if self.max_slices_running == 0 {
            return Err(Error::Config("max_slices_running must be at least 1".into()));
        }
        if self.slice_multiplier == 0 {
            return Err(Error::Config("slice_multiplier must be at least 1".into()));
        }
        if !(self.storage_safety_factor >= 1.0) {
            return Err(Error::Config(format!(
                "storage_safety_factor must be >= 1.0, got {}",
                self.storage_safety_factor
            )));
        }
        if self.scroll.trim().is_empty() {
            return Err(Error::Config("scroll must not be empty".into()));
        }
        if self
            .index_overrides
            .values()
            .any(|o| o.number_of_shards == Some(0))
        {
            return Err(Error::Config("number_of_shards override must be at least 1".into()));
        }
        self.delete_original_index_after()?;
        self.slice_timeout()?;
        Ok(())
    }
}

/// Parse a duration string like "14d", "2h", "30m", "45s" to Duration
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim().to_lowercase();

    if s.is_empty() {
        return None;
    }

    let (num_str, multiplier) = if let Some(n) = s.strip_suffix('w') {
        (n, 604800u64)
    } else if let Some(n) = s.strip_suffix('d') {
        (n, 86400u64)
    } else if let Some(n) = s.strip_suffix('h') {
        (n, 3600u64)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 60u64)
    } else if let Some(n) = s.strip_suffix('s') {
        (n, 1u64)
    } else {
        // Assume seconds if no unit
        (s.as_str(), 1u64)
    };

    num_str
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite() && *n >= 0.0)
        .map(|n| Duration::from_secs((n * multiplier as f64) as u64))
}
