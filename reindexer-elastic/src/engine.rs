//! [`SearchEngine`] over the Elasticsearch REST API

use crate::client::ElasticClient;
use crate::config::ElasticConfig;
use crate::error::{ElasticError, Result};
use async_trait::async_trait;
use chrono::Utc;
use reindexer::{
    AliasAction, IndexSettings, IndexTarget, ReindexRequest, ReindexResponse, SearchEngine,
    TaskStatus,
};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Elasticsearch-backed engine client
#[derive(Debug, Clone)]
pub struct ElasticEngine {
    client: ElasticClient,
    main_index_template: Option<PathBuf>,
}

#[derive(Deserialize)]
struct ReindexStarted {
    task: String,
}

#[derive(Deserialize)]
struct TaskEnvelope {
    #[serde(default)]
    completed: bool,
    #[serde(default)]
    response: Option<ReindexResponse>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Deserialize)]
struct CountResponse {
    count: u64,
}

/// `settings` and `mappings` of a new index
#[derive(Debug, Default, Deserialize)]
struct IndexDefinition {
    #[serde(default)]
    settings: Value,
    #[serde(default)]
    mappings: Value,
}

impl ElasticEngine {
    pub fn new(config: &ElasticConfig) -> Result<Self> {
        Ok(Self {
            client: ElasticClient::new(config)?,
            main_index_template: config.main_index_template.clone(),
        })
    }

    pub fn client(&self) -> &ElasticClient {
        &self.client
    }

    /// Name for a new destination index of `alias`, unique per call
    pub fn new_index_name(alias: &str) -> String {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        format!(
            "{}-reindex-{}-{}",
            alias,
            Utc::now().format("%Y%m%d-%H%M%S"),
            &suffix[..8]
        )
    }

    async fn get_json(&self, segments: &[&str]) -> Result<Value> {
        let request = self.client.request(Method::GET, segments)?;
        self.client.send_json(request).await
    }

    /// Mappings and analysis settings of whatever `alias` points at
    async fn copy_definition(&self, alias: &str) -> Result<IndexDefinition> {
        let mappings = self.get_json(&[alias, "_mapping"]).await?;
        let mappings = first_value(&mappings)
            .and_then(|v| v.get("mappings"))
            .cloned()
            .unwrap_or_else(|| json!({}));

        let settings = self.get_json(&[alias, "_settings"]).await?;
        let analysis = first_value(&settings)
            .and_then(|v| v.pointer("/settings/index/analysis"))
            .cloned();

        let settings = match analysis {
            Some(analysis) => json!({ "index": { "analysis": analysis } }),
            None => json!({}),
        };

        Ok(IndexDefinition { settings, mappings })
    }

    async fn template_definition(&self, path: &Path) -> Result<IndexDefinition> {
        let content = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    async fn create_index(&self, target: &IndexTarget, definition: IndexDefinition) -> Result<String> {
        let name = Self::new_index_name(&target.alias);
        let body = creation_body(target, definition);

        let request = self
            .client
            .request(Method::PUT, &[name.as_str()])?
            .json(&body);
        self.client.send_json(request).await?;

        info!("Created index {} for alias '{}'", name, target.alias);
        Ok(name)
    }
}

/// Merge write-optimised creation options into an index definition
fn creation_body(target: &IndexTarget, definition: IndexDefinition) -> Value {
    let mut settings = match definition.settings {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    let index = settings
        .entry("index".to_string())
        .or_insert_with(|| json!({}));
    if !index.is_object() {
        *index = json!({});
    }
    if let Some(index) = index.as_object_mut() {
        if let Some(shards) = target.options.number_of_shards {
            index.insert("number_of_shards".to_string(), json!(shards));
        }
        index.insert(
            "number_of_replicas".to_string(),
            json!(target.options.number_of_replicas),
        );
        index.insert(
            "refresh_interval".to_string(),
            json!(target.options.refresh_interval),
        );
    }

    let mut body = json!({ "settings": settings });
    if !definition.mappings.is_null() {
        body["mappings"] = definition.mappings;
    }
    body
}

fn first_value(response: &Value) -> Option<&Value> {
    response.as_object().and_then(|m| m.values().next())
}

fn error_text(error: &Value) -> String {
    match error.get("reason").and_then(|r| r.as_str()) {
        Some(reason) => match error.get("type").and_then(|t| t.as_str()) {
            Some(kind) => format!("{}: {}", kind, reason),
            None => reason.to_string(),
        },
        None => error.to_string(),
    }
}

fn u64_at(value: &Value, pointer: &str) -> Result<u64> {
    value
        .pointer(pointer)
        .and_then(|v| v.as_u64())
        .ok_or_else(|| ElasticError::UnexpectedResponse(format!("missing {}", pointer)))
}

#[async_trait]
impl SearchEngine for ElasticEngine {
    async fn index_size_bytes(&self, index: &str) -> reindexer::Result<u64> {
        let stats = self.get_json(&[index, "_stats", "store"]).await?;
        Ok(u64_at(&stats, "/_all/total/store/size_in_bytes")?)
    }

    async fn cluster_free_size_bytes(&self) -> reindexer::Result<u64> {
        let stats = self.get_json(&["_cluster", "stats"]).await?;
        Ok(u64_at(&stats, "/nodes/fs/free_in_bytes")?)
    }

    async fn alias_exists(&self, name: &str) -> reindexer::Result<bool> {
        let request = self.client.request(Method::HEAD, &["_alias", name])?;
        Ok(self.client.exists(request).await?)
    }

    async fn target_index_names(&self, alias: &str) -> reindexer::Result<HashMap<String, bool>> {
        let request = self.client.request(Method::GET, &["_alias", alias])?;
        let Some(response) = self.client.send_json_opt(request).await? else {
            return Ok(HashMap::new());
        };

        let indices = response.as_object().ok_or_else(|| {
            ElasticError::UnexpectedResponse("alias response is not an object".to_string())
        })?;

        Ok(indices
            .iter()
            .map(|(index, body)| {
                let is_write = body
                    .get("aliases")
                    .and_then(|aliases| aliases.get(alias))
                    .and_then(|a| a.get("is_write_index"))
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false);
                (index.clone(), is_write)
            })
            .collect())
    }

    async fn get_settings(&self, index: &str) -> reindexer::Result<IndexSettings> {
        let response = self.get_json(&[index, "_settings"]).await?;
        let settings = first_value(&response)
            .and_then(|v| v.pointer("/settings/index"))
            .cloned()
            .ok_or_else(|| {
                ElasticError::UnexpectedResponse(format!("no settings reported for {}", index))
            })?;
        Ok(IndexSettings::new(settings))
    }

    async fn update_settings(&self, index: &str, settings: Value) -> reindexer::Result<()> {
        let request = self
            .client
            .request(Method::PUT, &[index, "_settings"])?
            .json(&settings);
        self.client.send_json(request).await?;
        Ok(())
    }

    async fn create_empty_index(
        &self,
        target: &IndexTarget,
    ) -> reindexer::Result<HashMap<String, String>> {
        let definition = match self.main_index_template {
            Some(ref path) => self.template_definition(path).await?,
            None => self.copy_definition(&target.alias).await?,
        };
        let name = self.create_index(target, definition).await?;
        Ok(HashMap::from([(name, target.alias.clone())]))
    }

    async fn create_standalone_indices(
        &self,
        targets: &[IndexTarget],
    ) -> reindexer::Result<HashMap<String, String>> {
        let mut created = HashMap::with_capacity(targets.len());
        for target in targets {
            let definition = self.copy_definition(&target.alias).await?;
            let name = self.create_index(target, definition).await?;
            created.insert(name, target.alias.clone());
        }
        Ok(created)
    }

    async fn reindex(&self, request: &ReindexRequest) -> reindexer::Result<String> {
        let mut source = json!({ "index": request.source_index });
        if request.max_slice > 1 {
            source["slice"] = json!({ "id": request.slice, "max": request.max_slice });
        }
        let body = json!({
            "source": source,
            "dest": { "index": request.dest_index },
        });

        let http = self
            .client
            .request(Method::POST, &["_reindex"])?
            .query(&[
                ("wait_for_completion", "false"),
                ("scroll", request.scroll.as_str()),
            ])
            .json(&body);
        let response = self.client.send_json(http).await?;
        let started: ReindexStarted =
            serde_json::from_value(response).map_err(ElasticError::from)?;

        debug!(
            "Reindex {} -> {} slice {}/{} started as {}",
            request.source_index, request.dest_index, request.slice, request.max_slice, started.task
        );
        Ok(started.task)
    }

    async fn task_status(&self, handle: &str) -> reindexer::Result<Option<TaskStatus>> {
        let request = self.client.request(Method::GET, &["_tasks", handle])?;
        let Some(response) = self.client.send_json_opt(request).await? else {
            return Ok(None);
        };

        let envelope: TaskEnvelope =
            serde_json::from_value(response).map_err(ElasticError::from)?;
        Ok(Some(TaskStatus {
            completed: envelope.completed,
            response: envelope.response,
            error: envelope.error.as_ref().map(error_text),
        }))
    }

    async fn cancel_task(&self, handle: &str) -> reindexer::Result<()> {
        let request = self
            .client
            .request(Method::POST, &["_tasks", handle, "_cancel"])?;
        self.client.send_json(request).await?;
        Ok(())
    }

    async fn refresh_index(&self, index: &str) -> reindexer::Result<()> {
        let request = self.client.request(Method::POST, &[index, "_refresh"])?;
        self.client.send_json(request).await?;
        Ok(())
    }

    async fn documents_count(&self, index: &str, refresh: bool) -> reindexer::Result<u64> {
        if refresh {
            self.refresh_index(index).await?;
        }
        let response = self.get_json(&[index, "_count"]).await?;
        let count: CountResponse = serde_json::from_value(response).map_err(ElasticError::from)?;
        Ok(count.count)
    }

    async fn multi_switch_alias(&self, actions: &[AliasAction]) -> reindexer::Result<()> {
        let request = self
            .client
            .request(Method::POST, &["_aliases"])?
            .json(&json!({ "actions": actions }));
        self.client.send_json(request).await?;
        Ok(())
    }

    async fn delete_index(&self, index: &str) -> reindexer::Result<bool> {
        let request = self.client.request(Method::DELETE, &[index])?;
        Ok(self.client.send_json_opt(request).await?.is_some())
    }
}
