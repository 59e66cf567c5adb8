//! Preflight checks for a task in `initial` state
//!
//! Checks run in a fixed order and stop at the first violation. Nothing on the
//! cluster is mutated here.

use crate::catalog::{IndexCatalog, ResolvedTarget};
use crate::control::{IndexingControl, MigrationRegistry};
use crate::engine::SearchEngine;
use crate::error::ReindexFailure;
use crate::task::ReindexingTask;
use tracing::debug;

pub struct Preflight<'a> {
    pub engine: &'a dyn SearchEngine,
    pub indexing: &'a dyn IndexingControl,
    pub migrations: &'a dyn MigrationRegistry,
    pub catalog: &'a IndexCatalog,
    pub storage_safety_factor: f64,
}

impl Preflight<'_> {
    /// Validate `task` and return its resolved targets
    pub async fn check(&self, task: &ReindexingTask) -> Result<Vec<ResolvedTarget>, ReindexFailure> {
        if !self.indexing.is_enabled().await? {
            return Err(ReindexFailure::IndexingDisabled);
        }

        let targets = self.catalog.resolve(&task.targets)?;
        if targets.is_empty() {
            return Err(ReindexFailure::NothingToReindex);
        }

        for target in &targets {
            if !self.engine.alias_exists(&target.alias).await? {
                return Err(ReindexFailure::AliasMissing(target.alias.clone()));
            }
        }

        if !task.options.skip_pending_migrations_check
            && self.migrations.pending_migrations().await?
        {
            return Err(ReindexFailure::UnappliedMigrations);
        }

        self.check_storage(&targets).await?;

        Ok(targets)
    }

    async fn check_storage(&self, targets: &[ResolvedTarget]) -> Result<(), ReindexFailure> {
        let mut total: u64 = 0;
        for target in targets {
            let size = self.engine.index_size_bytes(&target.alias).await?;
            total = total.saturating_add(size);
        }

        let required = required_storage(total, self.storage_safety_factor);
        let free = self.engine.cluster_free_size_bytes().await?;

        debug!(
            "Storage check: {} bytes indexed, {} required, {} free",
            total, required, free
        );

        if required > free {
            return Err(ReindexFailure::InsufficientStorage { required, free });
        }
        Ok(())
    }
}

/// Free space needed to hold `indexed_bytes` again with the safety margin
pub fn required_storage(indexed_bytes: u64, factor: f64) -> u64 {
    let required = (indexed_bytes as f64 * factor).ceil();
    if required >= u64::MAX as f64 {
        u64::MAX
    } else {
        required as u64
    }
}
