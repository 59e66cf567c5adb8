//! Reindexing task state machine
//!
//! [`ReindexingService::tick`] is the single entry point the surrounding
//! scheduler calls. Each call does one bounded unit of work for the task's
//! current state, persists the task and, unless the task is terminal, asks
//! the [`TickScheduler`] to call back after the configured interval.

use crate::builder;
use crate::catalog::IndexCatalog;
use crate::config::ReindexConfig;
use crate::control::{Clock, IndexingControl, MigrationRegistry, SystemClock, TickScheduler};
use crate::cutover;
use crate::engine::SearchEngine;
use crate::error::ReindexFailure;
use crate::metrics;
use crate::poller::{self, RetryPolicy};
use crate::scheduler;
use crate::store::TaskStore;
use crate::task::{ReindexingTask, TaskOptions, TaskState};
use crate::validator::Preflight;
use crate::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Request to start a new reindexing task
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    /// Aliases to migrate; empty means the whole catalog
    pub targets: Vec<String>,
    /// Overrides the configured default
    pub max_slices_running: Option<usize>,
    /// Overrides the configured default
    pub slice_multiplier: Option<u32>,
    pub options: TaskOptions,
}

/// Result of one tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickOutcome {
    pub previous: TaskState,
    pub state: TaskState,
    /// Delay requested from the scheduler; `None` once terminal
    pub next_tick: Option<Duration>,
}

impl TickOutcome {
    pub fn transitioned(&self) -> bool {
        self.previous != self.state
    }
}

/// Drives reindexing tasks through their lifecycle
pub struct ReindexingService {
    engine: Arc<dyn SearchEngine>,
    migrations: Arc<dyn MigrationRegistry>,
    indexing: Arc<dyn IndexingControl>,
    store: Arc<dyn TaskStore>,
    scheduler: Arc<dyn TickScheduler>,
    clock: Arc<dyn Clock>,
    catalog: IndexCatalog,
    config: ReindexConfig,
}

impl ReindexingService {
    pub fn new(
        engine: Arc<dyn SearchEngine>,
        migrations: Arc<dyn MigrationRegistry>,
        indexing: Arc<dyn IndexingControl>,
        store: Arc<dyn TaskStore>,
        scheduler: Arc<dyn TickScheduler>,
        catalog: IndexCatalog,
        config: ReindexConfig,
    ) -> Self {
        Self {
            engine,
            migrations,
            indexing,
            store,
            scheduler,
            clock: Arc::new(SystemClock),
            catalog,
            config,
        }
    }

    /// Replace the wall clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &ReindexConfig {
        &self.config
    }

    pub fn catalog(&self) -> &IndexCatalog {
        &self.catalog
    }

    pub fn store(&self) -> &Arc<dyn TaskStore> {
        &self.store
    }

    // ========================================================================
    // Entry points
    // ========================================================================

    /// Create and persist a task, then schedule its first tick right away
    pub async fn start_task(&self, request: NewTask) -> Result<ReindexingTask> {
        if let Some(current) = self.store.current().await? {
            return Err(Error::TaskAlreadyRunning(current.id));
        }

        let task = ReindexingTask::new(
            request.targets,
            request
                .max_slices_running
                .unwrap_or(self.config.max_slices_running),
            request.slice_multiplier.unwrap_or(self.config.slice_multiplier),
            request.options,
            self.clock.now(),
        );

        self.store.save(&task).await?;
        self.scheduler.schedule_tick(&task.id, Duration::ZERO).await?;

        info!(
            "Created reindexing task {} (targets: {}, max_slices_running: {})",
            task.id,
            if task.targets.is_empty() {
                "all".to_string()
            } else {
                task.targets.join(",")
            },
            task.max_slices_running
        );
        Ok(task)
    }

    /// Load a task, tick it and return the outcome
    pub async fn tick_by_id(&self, id: &str) -> Result<TickOutcome> {
        let mut task = self
            .store
            .load(id)
            .await?
            .ok_or_else(|| Error::TaskNotFound(id.to_string()))?;
        Ok(self.tick(&mut task).await)
    }

    /// Advance `task` by one step.
    ///
    /// Terminal tasks are left untouched. Failures never escape: they move the
    /// task to `failure` with an error message.
    pub async fn tick(&self, task: &mut ReindexingTask) -> TickOutcome {
        let previous = task.state;
        if previous.is_terminal() {
            return TickOutcome {
                previous,
                state: previous,
                next_tick: None,
            };
        }

        metrics::record_tick(previous.as_str());

        let result = match previous {
            TaskState::Initial => self.tick_initial(task).await,
            TaskState::IndexingPaused => self.tick_indexing_paused(task).await,
            TaskState::Reindexing => self.tick_reindexing(task).await,
            TaskState::Success | TaskState::Failure | TaskState::OriginalIndexDeleted => Ok(()),
        };

        if let Err(failure) = result {
            self.abort(task, previous, failure).await;
        }

        task.updated_at = self.clock.now();
        self.persist(task).await;

        metrics::set_running_slices(task.running_slices());
        metrics::set_remaining_slices(task.total_slices() - task.completed_slices());

        if task.state != previous {
            metrics::record_transition(previous.as_str(), task.state.as_str());
            info!(
                "Reindexing task {}: {} -> {}",
                task.id, previous, task.state
            );
        }

        let next_tick = if task.is_terminal() {
            if task.state == TaskState::Success {
                metrics::record_task_finished(task.state.as_str(), "none");
            }
            None
        } else {
            let delay = self.config.tick_interval();
            if let Err(e) = self.scheduler.schedule_tick(&task.id, delay).await {
                error!("Failed to schedule next tick for task {}: {}", task.id, e);
                metrics::record_error(e.error_type());
            }
            Some(delay)
        };

        TickOutcome {
            previous,
            state: task.state,
            next_tick,
        }
    }

    /// Delete original indices of successful tasks whose grace window passed.
    /// Returns the deleted index names.
    pub async fn drop_old_indices(&self) -> Result<Vec<String>> {
        let now = self.clock.now();
        let mut deleted = Vec::new();

        for mut task in self.store.list().await? {
            let due = task.state == TaskState::Success
                && task.delete_original_index_at.is_some_and(|at| at <= now);
            if !due {
                continue;
            }

            for subtask in &task.subtasks {
                if self.engine.delete_index(&subtask.index_name_from).await? {
                    info!(
                        "Deleted original index {} of alias '{}'",
                        subtask.index_name_from, subtask.alias_name
                    );
                    deleted.push(subtask.index_name_from.clone());
                } else {
                    warn!(
                        "Original index {} of alias '{}' was already gone",
                        subtask.index_name_from, subtask.alias_name
                    );
                }
            }

            task.transition(TaskState::OriginalIndexDeleted, now);
            self.store.save(&task).await?;
            metrics::record_transition(
                TaskState::Success.as_str(),
                TaskState::OriginalIndexDeleted.as_str(),
            );
        }

        Ok(deleted)
    }

    // ========================================================================
    // State handlers
    // ========================================================================

    async fn tick_initial(&self, task: &mut ReindexingTask) -> std::result::Result<(), ReindexFailure> {
        let preflight = Preflight {
            engine: self.engine.as_ref(),
            indexing: self.indexing.as_ref(),
            migrations: self.migrations.as_ref(),
            catalog: &self.catalog,
            storage_safety_factor: self.config.storage_safety_factor,
        };
        let targets = preflight.check(task).await?;

        self.indexing.pause().await?;
        info!(
            "Preflight passed for {} aliases, live indexing paused",
            targets.len()
        );

        task.transition(TaskState::IndexingPaused, self.clock.now());
        Ok(())
    }

    async fn tick_indexing_paused(
        &self,
        task: &mut ReindexingTask,
    ) -> std::result::Result<(), ReindexFailure> {
        if task.subtasks.is_empty() {
            let targets = self.catalog.resolve(&task.targets)?;
            task.subtasks = builder::build_subtasks(
                self.engine.as_ref(),
                &self.config,
                &targets,
                task.slice_multiplier,
            )
            .await?;
            self.store.save(task).await?;
        }

        let now = self.clock.now();
        scheduler::launch_pending(self.engine.as_ref(), task, &self.config.scroll, now).await?;

        task.transition(TaskState::Reindexing, now);
        Ok(())
    }

    async fn tick_reindexing(
        &self,
        task: &mut ReindexingTask,
    ) -> std::result::Result<(), ReindexFailure> {
        let now = self.clock.now();
        let policy = RetryPolicy {
            max_retry_limit: self.config.max_retry_limit,
            slice_timeout: self.config.slice_timeout()?,
            scroll: self.config.scroll.clone(),
        };

        poller::poll_running(self.engine.as_ref(), task, &policy, now).await?;
        scheduler::launch_pending(self.engine.as_ref(), task, &self.config.scroll, now).await?;

        for subtask in task.subtasks.iter_mut() {
            if !subtask.is_cut_over() && subtask.all_slices_completed() {
                cutover::cut_over(self.engine.as_ref(), subtask, now).await?;
            }
        }

        if task.all_cut_over() {
            self.indexing.resume().await?;
            let grace = self.config.delete_original_index_after()?;
            task.delete_original_index_at = Some(now + grace);
            task.transition(TaskState::Success, now);
            info!(
                "Reindexing task {} finished, original indices are kept until {}",
                task.id,
                (now + grace).to_rfc3339()
            );
        } else {
            task.transition(TaskState::Reindexing, now);
        }
        Ok(())
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn abort(&self, task: &mut ReindexingTask, previous: TaskState, failure: ReindexFailure) {
        warn!(
            "Reindexing task {} aborted in {}: {}",
            task.id, previous, failure
        );
        metrics::record_task_finished(TaskState::Failure.as_str(), failure.kind());

        if previous != TaskState::Initial {
            if let Err(e) = self.indexing.resume().await {
                error!("Failed to resume live indexing after abort: {}", e);
                metrics::record_error(e.error_type());
            }
        }

        task.fail(failure.to_string(), self.clock.now());
    }

    async fn persist(&self, task: &ReindexingTask) {
        if let Err(e) = self.store.save(task).await {
            error!("Failed to persist reindexing task {}: {}", task.id, e);
            metrics::record_error(e.error_type());
        }
    }
}
