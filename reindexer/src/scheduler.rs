//! Slice scheduling under the task-wide concurrency bound

use crate::engine::{ReindexRequest, SearchEngine};
use crate::metrics;
use crate::task::{ReindexingSlice, ReindexingSubtask, ReindexingTask};
use crate::Result;
use chrono::{DateTime, Utc};
use tracing::info;

/// Reindex request for one slice of a subtask
pub fn request_for(
    subtask: &ReindexingSubtask,
    slice: &ReindexingSlice,
    scroll: &str,
) -> ReindexRequest {
    ReindexRequest {
        source_index: subtask.index_name_from.clone(),
        dest_index: subtask.index_name_to.clone(),
        slice: slice.elastic_slice,
        max_slice: slice.elastic_max_slice,
        scroll: scroll.to_string(),
    }
}

/// Launch pending slices while capacity remains, in subtask order then slice
/// order. Returns how many were launched.
pub async fn launch_pending(
    engine: &dyn SearchEngine,
    task: &mut ReindexingTask,
    scroll: &str,
    now: DateTime<Utc>,
) -> Result<usize> {
    let mut capacity = task.capacity();
    let mut launched = 0;

    for subtask in task.subtasks.iter_mut() {
        if capacity == 0 {
            break;
        }

        for i in 0..subtask.slices.len() {
            if capacity == 0 {
                break;
            }
            if !subtask.slices[i].is_pending() {
                continue;
            }

            let request = request_for(subtask, &subtask.slices[i], scroll);
            let handle = engine.reindex(&request).await?;

            info!(
                "Launched slice {}/{} of '{}' as {}",
                request.slice, request.max_slice, subtask.alias_name, handle
            );
            metrics::record_slice_launched(&subtask.alias_name);

            subtask.slices[i].launched(handle, now);
            capacity -= 1;
            launched += 1;
        }
    }

    Ok(launched)
}
