//! Process-level collaborators for the CLI: a file-backed indexing toggle
//! and two tick schedulers.

use async_trait::async_trait;
use reindexer::{Error, IndexingControl, TickScheduler};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};

/// Persisted state of the live-indexing toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexingState {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub paused: bool,
}

fn default_enabled() -> bool {
    true
}

impl Default for IndexingState {
    fn default() -> Self {
        Self {
            enabled: true,
            paused: false,
        }
    }
}

/// Indexing toggle stored as a small JSON file, shared between CLI
/// invocations and the application's indexing workers.
#[derive(Debug)]
pub struct FileIndexingControl {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileIndexingControl {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Current state; a missing file means enabled and not paused
    pub async fn state(&self) -> reindexer::Result<IndexingState> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(IndexingState::default()),
            Err(e) => Err(Error::IndexingControl(format!(
                "Failed to read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    pub async fn set_enabled(&self, enabled: bool) -> reindexer::Result<IndexingState> {
        self.update(|state| state.enabled = enabled).await
    }

    async fn set_paused(&self, paused: bool) -> reindexer::Result<IndexingState> {
        self.update(|state| state.paused = paused).await
    }

    async fn update(&self, apply: impl FnOnce(&mut IndexingState)) -> reindexer::Result<IndexingState> {
        let _guard = self.lock.lock().await;
        let mut state = self.state().await?;
        apply(&mut state);

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(&state)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        debug!("Indexing state {:?} written to {}", state, self.path.display());
        Ok(state)
    }
}

#[async_trait]
impl IndexingControl for FileIndexingControl {
    async fn is_enabled(&self) -> reindexer::Result<bool> {
        Ok(self.state().await?.enabled)
    }

    async fn is_paused(&self) -> reindexer::Result<bool> {
        Ok(self.state().await?.paused)
    }

    async fn pause(&self) -> reindexer::Result<()> {
        self.set_paused(true).await.map(|_| ())
    }

    async fn resume(&self) -> reindexer::Result<()> {
        self.set_paused(false).await.map(|_| ())
    }
}

/// Tick request handed from the service to the run loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTick {
    pub task_id: String,
    pub delay: Duration,
}

/// Forwards tick requests to an in-process run loop
#[derive(Debug, Clone)]
pub struct ChannelScheduler {
    tx: mpsc::UnboundedSender<ScheduledTick>,
}

impl ChannelScheduler {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ScheduledTick>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl TickScheduler for ChannelScheduler {
    async fn schedule_tick(&self, task_id: &str, delay: Duration) -> reindexer::Result<()> {
        self.tx
            .send(ScheduledTick {
                task_id: task_id.to_string(),
                delay,
            })
            .map_err(|_| Error::Scheduler("run loop has stopped".into()))
    }
}

/// For one-shot invocations driven by an external scheduler such as cron:
/// only reports when the next tick is due.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogScheduler;

#[async_trait]
impl TickScheduler for LogScheduler {
    async fn schedule_tick(&self, task_id: &str, delay: Duration) -> reindexer::Result<()> {
        info!(
            "Next tick for reindexing task {} is due in {}s",
            task_id,
            delay.as_secs()
        );
        Ok(())
    }
}
