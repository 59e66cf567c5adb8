use super::{build_service, print_outcome, resolve_task_id};
use crate::config::Config;
use crate::control::LogScheduler;
use anyhow::{Context, Result};
use std::sync::Arc;

/// Advance a task by a single tick. Meant for cron-style invocation.
pub async fn run_tick(config: &Config, id: Option<String>) -> Result<()> {
    let service = build_service(config, Arc::new(LogScheduler))?;
    let id = resolve_task_id(service.store().as_ref(), id).await?;

    let outcome = service
        .tick_by_id(&id)
        .await
        .with_context(|| format!("Failed to tick reindexing task {}", id))?;
    print_outcome(&id, &outcome);

    if let Some(task) = service.store().load(&id).await? {
        if let Some(ref message) = task.error_message {
            println!("Error: {}", message);
        }
    }
    Ok(())
}
