//! Error types for the reindexing orchestrator
//!
//! [`Error`] covers collaborator and infrastructure failures (engine calls,
//! persistence, configuration). [`ReindexFailure`] describes why a task was
//! aborted; its `Display` output is what lands in the task's `error_message`.

use thiserror::Error;

/// Errors raised by collaborators of the orchestrator
#[derive(Error, Debug)]
pub enum Error {
    #[error("Search engine error: {0}")]
    Engine(String),

    #[error("Task store error: {0}")]
    Store(String),

    #[error("Scheduler error: {0}")]
    Scheduler(String),

    #[error("Indexing control error: {0}")]
    IndexingControl(String),

    #[error("Migration registry error: {0}")]
    Migrations(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Reindexing task not found: {0}")]
    TaskNotFound(String),

    #[error("Reindexing task {0} is still in progress")]
    TaskAlreadyRunning(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Get the error type as a string for metrics labeling
    pub fn error_type(&self) -> &'static str {
        match self {
            Error::Engine(_) => "engine",
            Error::Store(_) => "store",
            Error::Scheduler(_) => "scheduler",
            Error::IndexingControl(_) => "indexing_control",
            Error::Migrations(_) => "migrations",
            Error::Config(_) => "config",
            Error::TaskNotFound(_) => "task_not_found",
            Error::TaskAlreadyRunning(_) => "task_already_running",
            Error::Io(_) => "io",
            Error::Json(_) => "json",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Reason a reindexing task moved to `failure`
#[derive(Error, Debug)]
pub enum ReindexFailure {
    #[error("Search indexing is disabled. Please enable it before reindexing.")]
    IndexingDisabled,

    #[error("Unknown target index '{0}'. Only configured indices can be reindexed.")]
    UnknownTarget(String),

    #[error(
        "Index '{0}' must use aliases before it can be reindexed. \
         Please recreate the index from scratch before reindexing."
    )]
    AliasMissing(String),

    #[error("Nothing to reindex: no indices are configured.")]
    NothingToReindex,

    #[error(
        "You have unapplied migrations. Please wait until they are finished \
         or use the skip_pending_migrations_check option."
    )]
    UnappliedMigrations,

    #[error(
        "Insufficient storage: at least {required} bytes of free storage are needed \
         to perform reindexing, the cluster has {free} bytes available."
    )]
    InsufficientStorage { required: u64, free: u64 },

    #[error("Couldn't load task status for reindex operation {handle}.")]
    TaskStatusUnavailable { handle: String },

    #[error("Reindex operation {handle} failed: {reason}. Retry limit reached. Aborting reindexing.")]
    RetryLimitReached { handle: String, reason: String },

    #[error(
        "Documents count is different for alias '{alias}': count from new index is {new}, \
         count from original index is {original}. This likely means something went wrong \
         during reindexing."
    )]
    CountMismatch { alias: String, original: u64, new: u64 },

    #[error("Could not resolve a single write index behind alias '{alias}'.")]
    WriteTargetUnresolved { alias: String },

    #[error("Unexpected error: {0}")]
    Unexpected(#[from] Error),
}

impl ReindexFailure {
    /// Short label for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            ReindexFailure::IndexingDisabled => "indexing_disabled",
            ReindexFailure::UnknownTarget(_) => "unknown_target",
            ReindexFailure::AliasMissing(_) => "alias_missing",
            ReindexFailure::NothingToReindex => "nothing_to_reindex",
            ReindexFailure::UnappliedMigrations => "unapplied_migrations",
            ReindexFailure::InsufficientStorage { .. } => "insufficient_storage",
            ReindexFailure::TaskStatusUnavailable { .. } => "task_status_unavailable",
            ReindexFailure::RetryLimitReached { .. } => "retry_limit_reached",
            ReindexFailure::CountMismatch { .. } => "count_mismatch",
            ReindexFailure::WriteTargetUnresolved { .. } => "write_target_unresolved",
            ReindexFailure::Unexpected(_) => "unexpected",
        }
    }
}
