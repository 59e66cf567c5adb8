//! Reindexer - zero-downtime reindexing of search cluster indices
//!
//! Migrates one or many aliases to freshly created indices (to change
//! sharding or mappings) while reads keep hitting the alias, then swaps
//! every alias atomically once the copy is verified.
//!
//! # Architecture
//!
//! - **Service**: tick-driven state machine persisted across restarts
//! - **Validator**: preflight checks (indexing toggle, aliases, migrations, storage)
//! - **Builder / Planner**: destination indices, subtasks and slices
//! - **Scheduler / Poller**: bounded concurrency, status polling, bounded retries
//! - **Cutover**: count verification, settings restore, atomic alias swap
//! - **Store**: JSON-file and in-memory task persistence
//!
//! Everything outside the orchestrator (search engine, indexing toggle,
//! migration registry, tick scheduler, clock) is injected through traits.

pub mod builder;
pub mod catalog;
pub mod config;
pub mod control;
pub mod cutover;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod planner;
pub mod poller;
pub mod scheduler;
pub mod service;
pub mod settings;
pub mod store;
pub mod task;
pub mod validator;

pub use catalog::{IndexCatalog, ResolvedTarget};
pub use config::{parse_duration, IndexOverride, ReindexConfig};
pub use control::{
    Clock, IndexingControl, MigrationRegistry, NoPendingMigrations, SharedIndexingControl,
    SystemClock, TickScheduler,
};
pub use engine::{
    AliasAction, CreateIndexOptions, IndexTarget, ReindexRequest, ReindexResponse, SearchEngine,
    TaskStatus,
};
pub use error::{Error, ReindexFailure, Result};
pub use service::{NewTask, ReindexingService, TickOutcome};
pub use settings::{IndexSettings, SettingsSnapshot};
pub use store::{JsonFileTaskStore, MemoryTaskStore, TaskStore};
pub use task::{
    IndexKind, ReindexingSlice, ReindexingSubtask, ReindexingTask, SliceStatus, TaskOptions,
    TaskState,
};
