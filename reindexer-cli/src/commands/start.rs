use super::{build_service, run::drive};
use crate::config::Config;
use crate::control::{ChannelScheduler, LogScheduler};
use anyhow::{Context, Result};
use reindexer::{NewTask, TaskOptions};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct StartArgs {
    pub targets: Vec<String>,
    pub max_slices_running: Option<usize>,
    pub slice_multiplier: Option<u32>,
    pub skip_pending_migrations_check: bool,
    /// Keep ticking in-process until the task finishes
    pub run: bool,
}

impl StartArgs {
    fn request(&self) -> NewTask {
        NewTask {
            targets: self.targets.clone(),
            max_slices_running: self.max_slices_running,
            slice_multiplier: self.slice_multiplier,
            options: TaskOptions {
                skip_pending_migrations_check: self.skip_pending_migrations_check,
            },
        }
    }
}

/// Create a reindexing task
pub async fn run_start(config: &Config, args: StartArgs) -> Result<()> {
    if !args.run {
        let service = build_service(config, Arc::new(LogScheduler))?;
        let task = service
            .start_task(args.request())
            .await
            .context("Failed to start reindexing task")?;
        println!("Started reindexing task {}", task.id);
        println!("Advance it with `reindexer tick --id {}` or `reindexer run`", task.id);
        return Ok(());
    }

    let (scheduler, rx) = ChannelScheduler::new();
    let service = build_service(config, Arc::new(scheduler))?;
    let task = service
        .start_task(args.request())
        .await
        .context("Failed to start reindexing task")?;
    println!("Started reindexing task {}", task.id);

    drive(&service, &task.id, rx).await
}
