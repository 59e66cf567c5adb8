//! Reindexing metrics
//!
//! Exposed through the `metrics` facade; the binary decides where they go.
//! - Ticks and state transitions
//! - Slice launches, retries and outcomes
//! - Cutovers and finished tasks

/// Record one tick in the given state
pub fn record_tick(state: &str) {
    metrics::counter!(
        "reindexer_ticks_total",
        "state" => state.to_string(),
    )
    .increment(1);
}

/// Record a state change
pub fn record_transition(from: &str, to: &str) {
    metrics::counter!(
        "reindexer_state_transitions_total",
        "from" => from.to_string(),
        "to" => to.to_string(),
    )
    .increment(1);
}

/// Record a slice handed to the engine
pub fn record_slice_launched(alias: &str) {
    metrics::counter!(
        "reindexer_slices_launched_total",
        "alias" => alias.to_string(),
    )
    .increment(1);
}

/// Record a slice re-issued after a failure
pub fn record_slice_retry(alias: &str) {
    metrics::counter!(
        "reindexer_slice_retries_total",
        "alias" => alias.to_string(),
    )
    .increment(1);
}

/// Record the classified outcome of a polled slice
pub fn record_slice_outcome(outcome: &str) {
    metrics::counter!(
        "reindexer_slice_outcomes_total",
        "outcome" => outcome.to_string(),
    )
    .increment(1);
}

/// Record a completed alias switch
pub fn record_cutover(alias: &str) {
    metrics::counter!(
        "reindexer_cutovers_total",
        "alias" => alias.to_string(),
    )
    .increment(1);
}

/// Record a task reaching a terminal state
pub fn record_task_finished(state: &str, reason: &str) {
    metrics::counter!(
        "reindexer_tasks_finished_total",
        "state" => state.to_string(),
        "reason" => reason.to_string(),
    )
    .increment(1);
}

/// Record a collaborator error that could not be attached to a task
pub fn record_error(error_type: &str) {
    metrics::counter!(
        "reindexer_errors_total",
        "error_type" => error_type.to_string(),
    )
    .increment(1);
}

/// Update the number of slices currently in flight
pub fn set_running_slices(count: usize) {
    metrics::gauge!("reindexer_running_slices").set(count as f64);
}

/// Update the number of slices not yet completed
pub fn set_remaining_slices(count: usize) {
    metrics::gauge!("reindexer_remaining_slices").set(count as f64);
}
