use super::{build_service, print_outcome, resolve_task_id};
use crate::config::Config;
use crate::control::{ChannelScheduler, ScheduledTick};
use anyhow::{Context, Result};
use reindexer::ReindexingService;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Tick a task in-process until it is terminal or the operator interrupts
pub async fn run_loop(config: &Config, id: Option<String>) -> Result<()> {
    let (scheduler, rx) = ChannelScheduler::new();
    let service = build_service(config, Arc::new(scheduler))?;
    let id = resolve_task_id(service.store().as_ref(), id).await?;

    drive(&service, &id, rx).await
}

pub(crate) async fn drive(
    service: &ReindexingService,
    task_id: &str,
    mut rx: mpsc::UnboundedReceiver<ScheduledTick>,
) -> Result<()> {
    let mut delay = Duration::ZERO;

    loop {
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted; task {} keeps its persisted state", task_id);
                return Ok(());
            }
        }

        let outcome = service
            .tick_by_id(task_id)
            .await
            .with_context(|| format!("Failed to tick reindexing task {}", task_id))?;
        print_outcome(task_id, &outcome);

        if outcome.state.is_terminal() {
            if let Some(task) = service.store().load(task_id).await? {
                if let Some(ref message) = task.error_message {
                    println!("Error: {}", message);
                }
            }
            return Ok(());
        }

        delay = next_delay(&mut rx, task_id).unwrap_or_else(|| {
            warn!("No tick scheduled for task {}; using the configured interval", task_id);
            service.config().tick_interval()
        });
    }
}

/// Latest delay requested for `task_id`, discarding older requests
fn next_delay(rx: &mut mpsc::UnboundedReceiver<ScheduledTick>, task_id: &str) -> Option<Duration> {
    let mut delay = None;
    while let Ok(tick) = rx.try_recv() {
        if tick.task_id == task_id {
            delay = Some(tick.delay);
        }
    }
    delay
}
