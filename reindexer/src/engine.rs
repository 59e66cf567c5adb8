//! Search engine client interface
//!
//! Everything the orchestrator does to the cluster goes through
//! [`SearchEngine`]. Handles returned by [`SearchEngine::reindex`] are opaque
//! strings the engine can be polled with later.

use crate::settings::IndexSettings;
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Issue a copy of one slice of `source_index` into `dest_index`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReindexRequest {
    pub source_index: String,
    pub dest_index: String,
    /// 0-based slice id
    pub slice: u32,
    /// Total number of slices
    pub max_slice: u32,
    /// Scroll keep-alive, e.g. "2h"
    pub scroll: String,
}

/// Summary reported by a finished reindex operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReindexResponse {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub created: u64,
    #[serde(default)]
    pub updated: u64,
    #[serde(default)]
    pub deleted: u64,
    /// Document-level failures
    #[serde(default)]
    pub failures: Vec<Value>,
}

impl ReindexResponse {
    pub fn processed(&self) -> u64 {
        self.created + self.updated + self.deleted
    }

    pub fn totals_match(&self) -> bool {
        self.total == self.processed()
    }
}

/// Status of a remote reindex operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub completed: bool,
    #[serde(default)]
    pub response: Option<ReindexResponse>,
    /// Error payload, rendered as text
    #[serde(default)]
    pub error: Option<String>,
}

/// One step of an atomic alias mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AliasAction {
    Remove {
        index: String,
        alias: String,
    },
    Add {
        index: String,
        alias: String,
        is_write_index: bool,
    },
}

impl AliasAction {
    pub fn alias(&self) -> &str {
        match self {
            AliasAction::Remove { alias, .. } | AliasAction::Add { alias, .. } => alias,
        }
    }
}

/// Settings a destination index is created with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateIndexOptions {
    /// Unset keeps the engine default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_shards: Option<u32>,
    pub number_of_replicas: u32,
    pub refresh_interval: String,
}

impl Default for CreateIndexOptions {
    /// Write-optimised: no replicas, refresh disabled
    fn default() -> Self {
        Self {
            number_of_shards: None,
            number_of_replicas: 0,
            refresh_interval: "-1".to_string(),
        }
    }
}

/// An alias that needs a fresh destination index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexTarget {
    pub alias: String,
    #[serde(default)]
    pub options: CreateIndexOptions,
}

/// Client operations against the search cluster
#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// On-disk size of whatever `index` (an index or alias) resolves to
    async fn index_size_bytes(&self, index: &str) -> Result<u64>;

    async fn cluster_free_size_bytes(&self) -> Result<u64>;

    async fn alias_exists(&self, name: &str) -> Result<bool>;

    /// Concrete indices behind `alias`, mapped to their write-index flag
    async fn target_index_names(&self, alias: &str) -> Result<HashMap<String, bool>>;

    async fn get_settings(&self, index: &str) -> Result<IndexSettings>;

    async fn update_settings(&self, index: &str, settings: Value) -> Result<()>;

    /// Create an empty destination for the main alias.
    /// Returns `{new_index_name: alias}`.
    async fn create_empty_index(&self, target: &IndexTarget) -> Result<HashMap<String, String>>;

    /// Create destinations for standalone aliases, copying their mappings.
    /// Returns `{new_index_name: alias}`.
    async fn create_standalone_indices(
        &self,
        targets: &[IndexTarget],
    ) -> Result<HashMap<String, String>>;

    /// Start an asynchronous reindex and return its handle
    async fn reindex(&self, request: &ReindexRequest) -> Result<String>;

    /// `None` when the engine does not know the handle
    async fn task_status(&self, handle: &str) -> Result<Option<TaskStatus>>;

    async fn cancel_task(&self, handle: &str) -> Result<()>;

    async fn refresh_index(&self, index: &str) -> Result<()>;

    async fn documents_count(&self, index: &str, refresh: bool) -> Result<u64>;

    /// Apply all actions in one atomic call
    async fn multi_switch_alias(&self, actions: &[AliasAction]) -> Result<()>;

    /// Returns false if the index did not exist
    async fn delete_index(&self, index: &str) -> Result<bool>;
}
