//! Progress polling and bounded retries for running slices
//!
//! A failed slice is re-issued into the slot it already holds, so retries
//! never push the task over its concurrency bound.

use crate::engine::{SearchEngine, TaskStatus};
use crate::error::ReindexFailure;
use crate::metrics;
use crate::scheduler::request_for;
use crate::task::ReindexingTask;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Classified status of one running slice
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SliceOutcome {
    Running,
    Completed,
    Failed(String),
    /// The engine no longer knows the handle
    Lost,
}

impl SliceOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            SliceOutcome::Running => "running",
            SliceOutcome::Completed => "completed",
            SliceOutcome::Failed(_) => "failed",
            SliceOutcome::Lost => "lost",
        }
    }
}

/// Classify a status report
pub fn classify(status: Option<&TaskStatus>) -> SliceOutcome {
    let Some(status) = status else {
        return SliceOutcome::Lost;
    };

    if !status.completed {
        return SliceOutcome::Running;
    }

    if let Some(ref error) = status.error {
        return SliceOutcome::Failed(error.clone());
    }

    let Some(ref response) = status.response else {
        return SliceOutcome::Failed("completed without a response".to_string());
    };

    if !response.failures.is_empty() {
        return SliceOutcome::Failed(format!(
            "{} document failures reported",
            response.failures.len()
        ));
    }

    if !response.totals_match() {
        return SliceOutcome::Failed(format!(
            "total {} does not match created {} + updated {} + deleted {}",
            response.total, response.created, response.updated, response.deleted
        ));
    }

    SliceOutcome::Completed
}

/// Counts for one polling pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollSummary {
    pub completed: usize,
    pub retried: usize,
    pub still_running: usize,
}

/// Retry and timeout policy
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retry_limit: u32,
    pub slice_timeout: Option<Duration>,
    pub scroll: String,
}

/// Poll every running slice of `task` and apply the outcome
pub async fn poll_running(
    engine: &dyn SearchEngine,
    task: &mut ReindexingTask,
    policy: &RetryPolicy,
    now: DateTime<Utc>,
) -> Result<PollSummary, ReindexFailure> {
    let mut summary = PollSummary::default();

    for subtask in task.subtasks.iter_mut() {
        for i in 0..subtask.slices.len() {
            if !subtask.slices[i].is_running() {
                continue;
            }
            let Some(handle) = subtask.slices[i].elastic_task.clone() else {
                continue;
            };

            let status = engine.task_status(&handle).await?;
            let mut outcome = classify(status.as_ref());

            if outcome == SliceOutcome::Running {
                if let Some(timeout) = policy.slice_timeout {
                    if is_stale(subtask.slices[i].launched_at, timeout, now) {
                        // The slot stays taken until the old operation is gone
                        match engine.cancel_task(&handle).await {
                            Ok(()) => {
                                outcome = SliceOutcome::Failed(format!(
                                    "still running after {}s",
                                    timeout.as_secs()
                                ));
                            }
                            Err(e) => {
                                warn!(
                                    "Failed to cancel stale reindex operation {}, retrying next tick: {}",
                                    handle, e
                                );
                            }
                        }
                    }
                }
            }

            metrics::record_slice_outcome(outcome.as_str());

            match outcome {
                SliceOutcome::Running => {
                    debug!("Slice {} of '{}' still running", handle, subtask.alias_name);
                    summary.still_running += 1;
                }
                SliceOutcome::Completed => {
                    debug!("Slice {} of '{}' completed", handle, subtask.alias_name);
                    subtask.slices[i].completed = true;
                    summary.completed += 1;
                }
                SliceOutcome::Lost => {
                    return Err(ReindexFailure::TaskStatusUnavailable { handle });
                }
                SliceOutcome::Failed(reason) => {
                    let slice = &subtask.slices[i];
                    if slice.retry_attempt >= policy.max_retry_limit {
                        return Err(ReindexFailure::RetryLimitReached { handle, reason });
                    }

                    let request = request_for(subtask, slice, &policy.scroll);
                    let new_handle = engine.reindex(&request).await?;

                    let slice = &mut subtask.slices[i];
                    slice.retry_attempt += 1;
                    warn!(
                        "Reindex operation {} for '{}' failed: {}. Retrying as {} (attempt {}/{})",
                        handle,
                        subtask.alias_name,
                        reason,
                        new_handle,
                        slice.retry_attempt,
                        policy.max_retry_limit
                    );
                    slice.launched(new_handle, now);
                    metrics::record_slice_retry(&subtask.alias_name);
                    summary.retried += 1;
                }
            }
        }
    }

    if summary.completed > 0 || summary.retried > 0 {
        info!(
            "Poll: {} slices completed, {} retried, {} still running",
            summary.completed, summary.retried, summary.still_running
        );
    }

    Ok(summary)
}

fn is_stale(launched_at: Option<DateTime<Utc>>, timeout: Duration, now: DateTime<Utc>) -> bool {
    let Some(launched_at) = launched_at else {
        return false;
    };
    match chrono::Duration::from_std(timeout) {
        Ok(timeout) => now - launched_at >= timeout,
        Err(_) => false,
    }
}
