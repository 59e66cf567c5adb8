//! Pending-migration lookup backed by a migrations index
//!
//! Each search migration is tracked as a document with a boolean `completed`
//! field; any document with `completed: false` counts as pending.

use crate::client::ElasticClient;
use crate::error::ElasticError;
use async_trait::async_trait;
use reindexer::MigrationRegistry;
use reqwest::Method;
use serde_json::json;

#[derive(Debug, Clone)]
pub struct ElasticMigrationRegistry {
    client: ElasticClient,
    index: String,
}

impl ElasticMigrationRegistry {
    pub fn new(client: ElasticClient, index: impl Into<String>) -> Self {
        Self {
            client,
            index: index.into(),
        }
    }
}

#[async_trait]
impl MigrationRegistry for ElasticMigrationRegistry {
    async fn pending_migrations(&self) -> reindexer::Result<bool> {
        let request = self
            .client
            .request(Method::POST, &[self.index.as_str(), "_count"])?
            .json(&json!({ "query": { "term": { "completed": false } } }));

        let Some(response) = self.client.send_json_opt(request).await? else {
            return Ok(false);
        };

        let pending = response
            .get("count")
            .and_then(|c| c.as_u64())
            .ok_or_else(|| ElasticError::UnexpectedResponse("count missing".to_string()))?;
        Ok(pending > 0)
    }
}
