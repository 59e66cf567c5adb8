//! Persisted bookkeeping for reindexing campaigns
//!
//! A [`ReindexingTask`] owns one [`ReindexingSubtask`] per migrated alias,
//! and each subtask owns the [`ReindexingSlice`]s its reindex is split into.
//! The whole tree is stored as one document and mutated by every tick.
//!
//! ```text
//! initial → indexing_paused → reindexing → success → original_index_deleted
//!    ↓             ↓               ↓ ↺
//!  failure      failure         failure
//! ```

use crate::settings::SettingsSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a reindexing task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Created, preconditions not yet checked
    Initial,
    /// Preconditions passed and live indexing is paused
    IndexingPaused,
    /// Slices are being launched and polled
    Reindexing,
    /// Every alias was switched to its new index
    Success,
    /// Aborted; see the task's error message
    Failure,
    /// Original indices were deleted after the grace window
    OriginalIndexDeleted,
}

impl TaskState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Initial => "initial",
            TaskState::IndexingPaused => "indexing_paused",
            TaskState::Reindexing => "reindexing",
            TaskState::Success => "success",
            TaskState::Failure => "failure",
            TaskState::OriginalIndexDeleted => "original_index_deleted",
        }
    }

    /// Whether `tick` has nothing left to do
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Success | TaskState::Failure | TaskState::OriginalIndexDeleted
        )
    }

    /// Whether moving from `self` to `next` respects the forward-only lifecycle
    pub fn can_transition_to(&self, next: TaskState) -> bool {
        use TaskState::*;
        match (self, next) {
            (Initial, IndexingPaused) => true,
            (IndexingPaused, Reindexing) => true,
            (Reindexing, Reindexing) => true,
            (Reindexing, Success) => true,
            (Success, OriginalIndexDeleted) => true,
            (Initial | IndexingPaused | Reindexing, Failure) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "initial" => Ok(TaskState::Initial),
            "indexing_paused" => Ok(TaskState::IndexingPaused),
            "reindexing" => Ok(TaskState::Reindexing),
            "success" => Ok(TaskState::Success),
            "failure" => Ok(TaskState::Failure),
            "original_index_deleted" => Ok(TaskState::OriginalIndexDeleted),
            _ => Err(format!("Unknown task state: {}", s)),
        }
    }
}

/// Whether an alias fronts the shared multi-type index or a single-purpose one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    /// The shared main index, holding several document types
    Main,
    /// A standalone index holding one document type
    Standalone,
}

impl std::fmt::Display for IndexKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexKind::Main => write!(f, "main"),
            IndexKind::Standalone => write!(f, "standalone"),
        }
    }
}

/// Flags recognised on a task
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskOptions {
    /// Reindex even when other index migrations are outstanding
    #[serde(default)]
    pub skip_pending_migrations_check: bool,
}

/// One migration campaign
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReindexingTask {
    pub id: String,

    pub state: TaskState,

    /// Aliases to migrate; empty means every configured alias
    #[serde(default)]
    pub targets: Vec<String>,

    /// Task-wide bound on in-flight slices
    pub max_slices_running: usize,

    /// Slices planned per source shard
    pub slice_multiplier: u32,

    #[serde(default)]
    pub options: TaskOptions,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_original_index_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    #[serde(default)]
    pub subtasks: Vec<ReindexingSubtask>,
}

impl ReindexingTask {
    /// Create a task in `initial` state
    pub fn new(
        targets: Vec<String>,
        max_slices_running: usize,
        slice_multiplier: u32,
        options: TaskOptions,
        now: DateTime<Utc>,
    ) -> Self {
        let mut unique = Vec::with_capacity(targets.len());
        for target in targets {
            if !unique.contains(&target) {
                unique.push(target);
            }
        }

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            state: TaskState::Initial,
            targets: unique,
            max_slices_running: max_slices_running.max(1),
            slice_multiplier: slice_multiplier.max(1),
            options,
            error_message: None,
            delete_original_index_at: None,
            created_at: now,
            updated_at: now,
            subtasks: Vec::new(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Move to `next`, returning false (and changing nothing) when the
    /// lifecycle does not allow it
    pub fn transition(&mut self, next: TaskState, now: DateTime<Utc>) -> bool {
        if !self.state.can_transition_to(next) {
            return false;
        }
        self.state = next;
        self.updated_at = now;
        true
    }

    /// Move to `failure` and record why
    pub fn fail(&mut self, message: impl Into<String>, now: DateTime<Utc>) -> bool {
        if !self.transition(TaskState::Failure, now) {
            return false;
        }
        self.error_message = Some(message.into());
        true
    }

    pub fn slices(&self) -> impl Iterator<Item = &ReindexingSlice> {
        self.subtasks.iter().flat_map(|s| s.slices.iter())
    }

    /// Slices launched and not yet completed
    pub fn running_slices(&self) -> usize {
        self.slices().filter(|s| s.is_running()).count()
    }

    pub fn pending_slices(&self) -> usize {
        self.slices().filter(|s| s.is_pending()).count()
    }

    pub fn completed_slices(&self) -> usize {
        self.slices().filter(|s| s.completed).count()
    }

    pub fn total_slices(&self) -> usize {
        self.slices().count()
    }

    /// Free concurrency slots
    pub fn capacity(&self) -> usize {
        self.max_slices_running.saturating_sub(self.running_slices())
    }

    /// True once subtasks exist and every one of them was cut over
    pub fn all_cut_over(&self) -> bool {
        !self.subtasks.is_empty() && self.subtasks.iter().all(|s| s.is_cut_over())
    }
}

/// One alias's migration within a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReindexingSubtask {
    pub alias_name: String,

    pub index_name_from: String,

    pub index_name_to: String,

    pub kind: IndexKind,

    /// Documents in the source index when the subtask was created
    pub documents_count: u64,

    /// Documents in the destination index observed at cutover
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documents_count_target: Option<u64>,

    /// Serving settings of the source index
    #[serde(default)]
    pub settings: SettingsSnapshot,

    #[serde(default)]
    pub slices: Vec<ReindexingSlice>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cut_over_at: Option<DateTime<Utc>>,
}

impl ReindexingSubtask {
    pub fn is_cut_over(&self) -> bool {
        self.cut_over_at.is_some()
    }

    /// Every slice finished with matching totals
    pub fn all_slices_completed(&self) -> bool {
        self.slices.iter().all(|s| s.completed)
    }
}

/// Derived status of a slice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SliceStatus {
    Pending,
    Running,
    Completed,
}

/// One parallel unit of a subtask's reindex
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReindexingSlice {
    /// Total slices planned for the subtask
    pub elastic_max_slice: u32,

    /// 0-based position within `elastic_max_slice`
    pub elastic_slice: u32,

    /// Handle of the remote reindex operation; kept after completion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elastic_task: Option<String>,

    #[serde(default)]
    pub retry_attempt: u32,

    #[serde(default)]
    pub completed: bool,

    /// When the current handle was issued
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launched_at: Option<DateTime<Utc>>,
}

impl ReindexingSlice {
    pub fn new(elastic_slice: u32, elastic_max_slice: u32) -> Self {
        Self {
            elastic_max_slice,
            elastic_slice,
            elastic_task: None,
            retry_attempt: 0,
            completed: false,
            launched_at: None,
        }
    }

    pub fn status(&self) -> SliceStatus {
        if self.completed {
            SliceStatus::Completed
        } else if self.elastic_task.is_some() {
            SliceStatus::Running
        } else {
            SliceStatus::Pending
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status() == SliceStatus::Pending
    }

    pub fn is_running(&self) -> bool {
        self.status() == SliceStatus::Running
    }

    /// Record a freshly issued remote operation
    pub fn launched(&mut self, handle: String, now: DateTime<Utc>) {
        self.elastic_task = Some(handle);
        self.launched_at = Some(now);
    }
}
