//! Durable storage for reindexing tasks
//!
//! Each task is one JSON document holding its subtasks and slices.

use crate::task::ReindexingTask;
use crate::{Error, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::warn;

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn load(&self, id: &str) -> Result<Option<ReindexingTask>>;

    async fn save(&self, task: &ReindexingTask) -> Result<()>;

    /// All tasks, oldest first
    async fn list(&self) -> Result<Vec<ReindexingTask>>;

    /// The most recently created task that is not terminal
    async fn current(&self) -> Result<Option<ReindexingTask>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|t| !t.is_terminal())
            .max_by_key(|t| t.created_at))
    }

    /// The most recently created task, terminal or not
    async fn latest(&self) -> Result<Option<ReindexingTask>> {
        Ok(self.list().await?.into_iter().max_by_key(|t| t.created_at))
    }
}

/// One `{id}.json` file per task in a directory
#[derive(Debug, Clone)]
pub struct JsonFileTaskStore {
    dir: PathBuf,
}

impl JsonFileTaskStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> Result<PathBuf> {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(Error::Store(format!("invalid task id '{}'", id)));
        }
        Ok(self.dir.join(format!("{}.json", id)))
    }
}

#[async_trait]
impl TaskStore for JsonFileTaskStore {
    async fn load(&self, id: &str) -> Result<Option<ReindexingTask>> {
        let path = self.path_for(id)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, task: &ReindexingTask) -> Result<()> {
        let path = self.path_for(&task.id)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        let content = serde_json::to_string_pretty(task)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ReindexingTask>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut tasks = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            let content = tokio::fs::read_to_string(&path).await?;
            match serde_json::from_str::<ReindexingTask>(&content) {
                Ok(task) => tasks.push(task),
                Err(e) => warn!("Skipping unreadable task file {:?}: {}", path, e),
            }
        }

        tasks.sort_by_key(|t| t.created_at);
        Ok(tasks)
    }
}

/// Process-local store
#[derive(Debug, Default)]
pub struct MemoryTaskStore {
    tasks: RwLock<HashMap<String, ReindexingTask>>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn load(&self, id: &str) -> Result<Option<ReindexingTask>> {
        Ok(self.tasks.read().get(id).cloned())
    }

    async fn save(&self, task: &ReindexingTask) -> Result<()> {
        self.tasks.write().insert(task.id.clone(), task.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ReindexingTask>> {
        let mut tasks: Vec<_> = self.tasks.read().values().cloned().collect();
        tasks.sort_by_key(|t| t.created_at);
        Ok(tasks)
    }
}
