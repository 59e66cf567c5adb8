pub mod drop;
pub mod indexing;
pub mod run;
pub mod start;
pub mod status;
pub mod tick;

pub use drop::run_drop_old_indices;
pub use indexing::run_indexing;
pub use run::run_loop;
pub use start::run_start;
pub use status::run_status;
pub use tick::run_tick;

use crate::config::Config;
use crate::control::FileIndexingControl;
use anyhow::{Context, Result};
use reindexer::{
    JsonFileTaskStore, MigrationRegistry, NoPendingMigrations, ReindexingService, TaskStore,
    TickOutcome, TickScheduler,
};
use reindexer_elastic::{ElasticEngine, ElasticMigrationRegistry};
use std::sync::Arc;

/// Wire the service against the configured cluster and state directory
pub(crate) fn build_service(
    config: &Config,
    scheduler: Arc<dyn TickScheduler>,
) -> Result<ReindexingService> {
    let engine = ElasticEngine::new(&config.elasticsearch)
        .with_context(|| format!("Failed to set up client for {}", config.elasticsearch.url))?;

    let migrations: Arc<dyn MigrationRegistry> = match config.elasticsearch.migrations_index {
        Some(ref index) => Arc::new(ElasticMigrationRegistry::new(
            engine.client().clone(),
            index.clone(),
        )),
        None => Arc::new(NoPendingMigrations),
    };

    Ok(ReindexingService::new(
        Arc::new(engine),
        migrations,
        Arc::new(FileIndexingControl::new(config.state.indexing_file())),
        task_store(config),
        scheduler,
        config.indices.clone(),
        config.reindex.clone(),
    ))
}

pub(crate) fn task_store(config: &Config) -> Arc<dyn TaskStore> {
    Arc::new(JsonFileTaskStore::new(config.state.tasks_dir()))
}

/// The given id, or the task currently in progress
pub(crate) async fn resolve_task_id(store: &dyn TaskStore, id: Option<String>) -> Result<String> {
    if let Some(id) = id {
        return Ok(id);
    }
    match store.current().await? {
        Some(task) => Ok(task.id),
        None => anyhow::bail!("No reindexing task in progress; pass --id or run `start` first"),
    }
}

pub(crate) fn print_outcome(task_id: &str, outcome: &TickOutcome) {
    if outcome.transitioned() {
        println!("{}: {} -> {}", task_id, outcome.previous, outcome.state);
    } else {
        println!("{}: {}", task_id, outcome.state);
    }
}
