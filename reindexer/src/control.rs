//! Collaborators around the orchestrator: the live-indexing toggle, the
//! migration registry, the tick scheduler and the clock.

use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Global switch for live indexing
#[async_trait]
pub trait IndexingControl: Send + Sync {
    /// Whether live indexing is enabled at all
    async fn is_enabled(&self) -> Result<bool>;

    async fn is_paused(&self) -> Result<bool>;

    async fn pause(&self) -> Result<()>;

    async fn resume(&self) -> Result<()>;
}

/// Outstanding schema or data migrations of the search index
#[async_trait]
pub trait MigrationRegistry: Send + Sync {
    async fn pending_migrations(&self) -> Result<bool>;
}

/// Re-invokes `tick` for a task after a delay
#[async_trait]
pub trait TickScheduler: Send + Sync {
    async fn schedule_tick(&self, task_id: &str, delay: Duration) -> Result<()>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// In-process toggle
#[derive(Debug)]
pub struct SharedIndexingControl {
    enabled: AtomicBool,
    paused: AtomicBool,
}

impl SharedIndexingControl {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            paused: AtomicBool::new(false),
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }
}

impl Default for SharedIndexingControl {
    fn default() -> Self {
        Self::new(true)
    }
}

#[async_trait]
impl IndexingControl for SharedIndexingControl {
    async fn is_enabled(&self) -> Result<bool> {
        Ok(self.enabled.load(Ordering::SeqCst))
    }

    async fn is_paused(&self) -> Result<bool> {
        Ok(self.paused.load(Ordering::SeqCst))
    }

    async fn pause(&self) -> Result<()> {
        self.paused.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn resume(&self) -> Result<()> {
        self.paused.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// Registry for deployments that track no migrations
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPendingMigrations;

#[async_trait]
impl MigrationRegistry for NoPendingMigrations {
    async fn pending_migrations(&self) -> Result<bool> {
        Ok(false)
    }
}
