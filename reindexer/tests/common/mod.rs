//! Shared fakes for the reindexing integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use parking_lot::Mutex;
use reindexer::{
    AliasAction, Clock, Error, IndexCatalog, IndexSettings, IndexTarget, IndexingControl,
    MemoryTaskStore, MigrationRegistry, ReindexConfig, ReindexRequest, ReindexResponse,
    ReindexingService, ReindexingTask, Result, SearchEngine, TaskStatus, TaskStore, TickScheduler,
};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Fake search engine
// ============================================================================

/// How a reindex operation issued to the fake behaves when polled
#[derive(Debug, Clone, PartialEq)]
pub enum Script {
    /// Completes on the first poll with matching totals
    Complete,
    /// Reports "not completed" for `n` polls, then completes
    RunFor(u32),
    /// Never completes
    Hang,
    /// Completes with `created` short of `total`
    Mismatch { total: u64, created: u64 },
    /// Completes with an error payload
    Fail(String),
    /// The engine forgets the handle
    Lost,
}

#[derive(Debug, Clone)]
pub struct FakeIndex {
    pub shards: u32,
    pub docs: u64,
    pub size_bytes: u64,
    pub settings: Value,
    pub refreshes: u32,
}

#[derive(Debug, Clone)]
struct FakeOperation {
    request: ReindexRequest,
    script: Script,
    polls: u32,
    finished: bool,
    cancelled: bool,
}

#[derive(Debug, Default)]
struct FakeState {
    indices: HashMap<String, FakeIndex>,
    aliases: HashMap<String, HashMap<String, bool>>,
    free_bytes: u64,
    operations: HashMap<String, FakeOperation>,
    next_handle: u64,
    next_index: u64,
    scripts: VecDeque<Script>,
    default_script: Option<Script>,
    shortfall: HashMap<String, u64>,
    fail_calls: HashMap<String, String>,
    calls: Vec<String>,
    alias_calls: Vec<Vec<AliasAction>>,
    settings_updates: Vec<(String, Value)>,
    reindex_requests: Vec<ReindexRequest>,
    in_flight: usize,
    max_in_flight: usize,
}

#[derive(Debug, Default)]
pub struct FakeEngine {
    state: Mutex<FakeState>,
}

impl FakeEngine {
    pub fn new() -> Self {
        let engine = Self::default();
        engine.state.lock().free_bytes = u64::MAX / 4;
        engine
    }

    /// Register `index` behind `alias` as its only (unflagged) target
    pub fn add_index(&self, alias: &str, index: &str, shards: u32, docs: u64) {
        let mut state = self.state.lock();
        state.indices.insert(
            index.to_string(),
            FakeIndex {
                shards,
                docs,
                size_bytes: docs * 1_000,
                settings: json!({
                    "number_of_shards": shards.to_string(),
                    "number_of_replicas": "1",
                    "refresh_interval": "1s",
                    "translog": { "durability": "async" }
                }),
                refreshes: 0,
            },
        );
        state
            .aliases
            .entry(alias.to_string())
            .or_default()
            .insert(index.to_string(), false);
    }

    pub fn set_write_flag(&self, alias: &str, index: &str, is_write: bool) {
        let mut state = self.state.lock();
        if let Some(targets) = state.aliases.get_mut(alias) {
            targets.insert(index.to_string(), is_write);
        }
    }

    pub fn add_bare_index(&self, index: &str, shards: u32, docs: u64) {
        self.add_index("__bare__", index, shards, docs);
        self.state.lock().aliases.remove("__bare__");
    }

    pub fn set_free_bytes(&self, bytes: u64) {
        self.state.lock().free_bytes = bytes;
    }

    pub fn set_size_bytes(&self, index: &str, bytes: u64) {
        if let Some(index) = self.state.lock().indices.get_mut(index) {
            index.size_bytes = bytes;
        }
    }

    /// Scripts consumed by the next reindex calls, in order
    pub fn push_scripts(&self, scripts: impl IntoIterator<Item = Script>) {
        self.state.lock().scripts.extend(scripts);
    }

    /// Script used once the queue is empty
    pub fn set_default_script(&self, script: Script) {
        self.state.lock().default_script = Some(script);
    }

    /// Make `documents_count` of `index` report `n` documents fewer
    pub fn lose_documents(&self, index: &str, n: u64) {
        self.state.lock().shortfall.insert(index.to_string(), n);
    }

    /// Make every call to `method` fail with an engine error
    pub fn fail_method(&self, method: &str, message: &str) {
        self.state
            .lock()
            .fail_calls
            .insert(method.to_string(), message.to_string());
    }

    pub fn clear_failure(&self, method: &str) {
        self.state.lock().fail_calls.remove(method);
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.state.lock().calls.iter().filter(|c| *c == method).count()
    }

    pub fn alias_calls(&self) -> Vec<Vec<AliasAction>> {
        self.state.lock().alias_calls.clone()
    }

    pub fn settings_updates(&self) -> Vec<(String, Value)> {
        self.state.lock().settings_updates.clone()
    }

    pub fn reindex_requests(&self) -> Vec<ReindexRequest> {
        self.state.lock().reindex_requests.clone()
    }

    pub fn alias_targets(&self, alias: &str) -> HashMap<String, bool> {
        self.state.lock().aliases.get(alias).cloned().unwrap_or_default()
    }

    pub fn index_exists(&self, index: &str) -> bool {
        self.state.lock().indices.contains_key(index)
    }

    pub fn index(&self, index: &str) -> Option<FakeIndex> {
        self.state.lock().indices.get(index).cloned()
    }

    pub fn is_cancelled(&self, handle: &str) -> bool {
        self.state
            .lock()
            .operations
            .get(handle)
            .is_some_and(|op| op.cancelled)
    }

    /// Most operations ever unfinished at once
    pub fn max_in_flight(&self) -> usize {
        self.state.lock().max_in_flight
    }

    fn enter(&self, method: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push(method.to_string());
        match state.fail_calls.get(method) {
            Some(message) => Err(Error::Engine(message.clone())),
            None => Ok(()),
        }
    }

    fn create_index_for(state: &mut FakeState, target: &IndexTarget) -> String {
        state.next_index += 1;
        let name = format!("{}-reindex-{}", target.alias, state.next_index);
        let shards = target.options.number_of_shards.unwrap_or(1);
        state.indices.insert(
            name.clone(),
            FakeIndex {
                shards,
                docs: 0,
                size_bytes: 0,
                settings: json!({
                    "number_of_shards": shards.to_string(),
                    "number_of_replicas": target.options.number_of_replicas.to_string(),
                    "refresh_interval": target.options.refresh_interval,
                }),
                refreshes: 0,
            },
        );
        name
    }

    fn resolve<'a>(state: &'a FakeState, name: &str) -> Vec<&'a FakeIndex> {
        if let Some(targets) = state.aliases.get(name) {
            targets
                .keys()
                .filter_map(|index| state.indices.get(index))
                .collect()
        } else {
            state.indices.get(name).into_iter().collect()
        }
    }
}

/// Documents of slice `slice` out of `max` when `docs` are split evenly
fn slice_share(docs: u64, slice: u32, max: u32) -> u64 {
    let max = max.max(1) as u64;
    let slice = slice as u64;
    docs / max + u64::from(slice < docs % max)
}

#[async_trait]
impl SearchEngine for FakeEngine {
    async fn index_size_bytes(&self, index: &str) -> Result<u64> {
        self.enter("index_size_bytes")?;
        let state = self.state.lock();
        Ok(Self::resolve(&state, index)
            .iter()
            .map(|i| i.size_bytes)
            .sum())
    }

    async fn cluster_free_size_bytes(&self) -> Result<u64> {
        self.enter("cluster_free_size_bytes")?;
        Ok(self.state.lock().free_bytes)
    }

    async fn alias_exists(&self, name: &str) -> Result<bool> {
        self.enter("alias_exists")?;
        Ok(self.state.lock().aliases.contains_key(name))
    }

    async fn target_index_names(&self, alias: &str) -> Result<HashMap<String, bool>> {
        self.enter("target_index_names")?;
        Ok(self.alias_targets(alias))
    }

    async fn get_settings(&self, index: &str) -> Result<IndexSettings> {
        self.enter("get_settings")?;
        let state = self.state.lock();
        let index = state
            .indices
            .get(index)
            .ok_or_else(|| Error::Engine(format!("no such index [{}]", index)))?;
        Ok(IndexSettings::new(index.settings.clone()))
    }

    async fn update_settings(&self, index: &str, settings: Value) -> Result<()> {
        self.enter("update_settings")?;
        let mut state = self.state.lock();
        state
            .settings_updates
            .push((index.to_string(), settings.clone()));
        if let (Some(target), Some(update)) = (
            state.indices.get_mut(index),
            settings.get("index").and_then(|v| v.as_object()),
        ) {
            if let Some(existing) = target.settings.as_object_mut() {
                for (k, v) in update {
                    existing.insert(k.clone(), v.clone());
                }
            }
        }
        Ok(())
    }

    async fn create_empty_index(&self, target: &IndexTarget) -> Result<HashMap<String, String>> {
        self.enter("create_empty_index")?;
        let mut state = self.state.lock();
        let name = Self::create_index_for(&mut state, target);
        Ok(HashMap::from([(name, target.alias.clone())]))
    }

    async fn create_standalone_indices(
        &self,
        targets: &[IndexTarget],
    ) -> Result<HashMap<String, String>> {
        self.enter("create_standalone_indices")?;
        let mut state = self.state.lock();
        Ok(targets
            .iter()
            .map(|t| (Self::create_index_for(&mut state, t), t.alias.clone()))
            .collect())
    }

    async fn reindex(&self, request: &ReindexRequest) -> Result<String> {
        self.enter("reindex")?;
        let mut state = self.state.lock();
        state.next_handle += 1;
        let handle = format!("node-1:{}", state.next_handle);
        let script = state
            .scripts
            .pop_front()
            .or_else(|| state.default_script.clone())
            .unwrap_or(Script::Complete);

        state.reindex_requests.push(request.clone());
        state.operations.insert(
            handle.clone(),
            FakeOperation {
                request: request.clone(),
                script,
                polls: 0,
                finished: false,
                cancelled: false,
            },
        );
        state.in_flight += 1;
        state.max_in_flight = state.max_in_flight.max(state.in_flight);
        Ok(handle)
    }

    async fn task_status(&self, handle: &str) -> Result<Option<TaskStatus>> {
        self.enter("task_status")?;
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let Some(op) = state.operations.get_mut(handle) else {
            return Ok(None);
        };
        op.polls += 1;

        let status = match op.script.clone() {
            Script::Lost => return Ok(None),
            Script::Hang => TaskStatus::default(),
            Script::RunFor(n) if op.polls <= n => TaskStatus::default(),
            Script::Complete | Script::RunFor(_) => {
                let source_docs = state
                    .indices
                    .get(&op.request.source_index)
                    .map(|i| i.docs)
                    .unwrap_or(0);
                let share = slice_share(source_docs, op.request.slice, op.request.max_slice);
                TaskStatus {
                    completed: true,
                    response: Some(ReindexResponse {
                        total: share,
                        created: share,
                        ..Default::default()
                    }),
                    error: None,
                }
            }
            Script::Mismatch { total, created } => TaskStatus {
                completed: true,
                response: Some(ReindexResponse {
                    total,
                    created,
                    ..Default::default()
                }),
                error: None,
            },
            Script::Fail(message) => TaskStatus {
                completed: true,
                response: None,
                error: Some(message),
            },
        };

        if status.completed && !op.finished {
            op.finished = true;
            state.in_flight = state.in_flight.saturating_sub(1);

            let copied = status
                .response
                .as_ref()
                .filter(|r| status.error.is_none() && r.totals_match())
                .map(|r| r.created);
            if let (Some(copied), Some(dest)) =
                (copied, state.indices.get_mut(&op.request.dest_index))
            {
                dest.docs += copied;
            }
        }

        Ok(Some(status))
    }

    async fn cancel_task(&self, handle: &str) -> Result<()> {
        self.enter("cancel_task")?;
        let mut state = self.state.lock();
        let mut was_running = false;
        if let Some(op) = state.operations.get_mut(handle) {
            if !op.finished {
                op.finished = true;
                was_running = true;
            }
            op.cancelled = true;
        }
        if was_running {
            state.in_flight = state.in_flight.saturating_sub(1);
        }
        Ok(())
    }

    async fn refresh_index(&self, index: &str) -> Result<()> {
        self.enter("refresh_index")?;
        if let Some(index) = self.state.lock().indices.get_mut(index) {
            index.refreshes += 1;
        }
        Ok(())
    }

    async fn documents_count(&self, index: &str, _refresh: bool) -> Result<u64> {
        self.enter("documents_count")?;
        let state = self.state.lock();
        let docs: u64 = Self::resolve(&state, index).iter().map(|i| i.docs).sum();
        let shortfall = state.shortfall.get(index).copied().unwrap_or(0);
        Ok(docs.saturating_sub(shortfall))
    }

    async fn multi_switch_alias(&self, actions: &[AliasAction]) -> Result<()> {
        self.enter("multi_switch_alias")?;
        let mut state = self.state.lock();
        state.alias_calls.push(actions.to_vec());
        for action in actions {
            match action {
                AliasAction::Remove { index, alias } => {
                    if let Some(targets) = state.aliases.get_mut(alias) {
                        targets.remove(index);
                    }
                }
                AliasAction::Add {
                    index,
                    alias,
                    is_write_index,
                } => {
                    state
                        .aliases
                        .entry(alias.clone())
                        .or_default()
                        .insert(index.clone(), *is_write_index);
                }
            }
        }
        Ok(())
    }

    async fn delete_index(&self, index: &str) -> Result<bool> {
        self.enter("delete_index")?;
        let mut state = self.state.lock();
        let existed = state.indices.remove(index).is_some();
        for targets in state.aliases.values_mut() {
            targets.remove(index);
        }
        Ok(existed)
    }
}

// ============================================================================
// Other collaborators
// ============================================================================

#[derive(Debug)]
pub struct CountingIndexingControl {
    enabled: AtomicBool,
    paused: AtomicBool,
    pauses: AtomicUsize,
    resumes: AtomicUsize,
}

impl CountingIndexingControl {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            paused: AtomicBool::new(false),
            pauses: AtomicUsize::new(0),
            resumes: AtomicUsize::new(0),
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn pauses(&self) -> usize {
        self.pauses.load(Ordering::SeqCst)
    }

    pub fn resumes(&self) -> usize {
        self.resumes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IndexingControl for CountingIndexingControl {
    async fn is_enabled(&self) -> Result<bool> {
        Ok(self.enabled.load(Ordering::SeqCst))
    }

    async fn is_paused(&self) -> Result<bool> {
        Ok(self.paused())
    }

    async fn pause(&self) -> Result<()> {
        self.pauses.fetch_add(1, Ordering::SeqCst);
        self.paused.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn resume(&self) -> Result<()> {
        self.resumes.fetch_add(1, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct StaticMigrations {
    pending: AtomicBool,
}

impl StaticMigrations {
    pub fn set_pending(&self, pending: bool) {
        self.pending.store(pending, Ordering::SeqCst);
    }
}

#[async_trait]
impl MigrationRegistry for StaticMigrations {
    async fn pending_migrations(&self) -> Result<bool> {
        Ok(self.pending.load(Ordering::SeqCst))
    }
}

#[derive(Debug, Default)]
pub struct RecordingScheduler {
    ticks: Mutex<Vec<(String, Duration)>>,
}

impl RecordingScheduler {
    pub fn ticks(&self) -> Vec<(String, Duration)> {
        self.ticks.lock().clone()
    }
}

#[async_trait]
impl TickScheduler for RecordingScheduler {
    async fn schedule_tick(&self, task_id: &str, delay: Duration) -> Result<()> {
        self.ticks.lock().push((task_id.to_string(), delay));
        Ok(())
    }
}

#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()),
        }
    }

    pub fn advance(&self, by: ChronoDuration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// In-memory store that rejects one chosen save (1-based)
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryTaskStore,
    saves: AtomicUsize,
    fail_on: AtomicUsize,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the `n`-th save counted from the store's creation
    pub fn fail_save(&self, n: usize) {
        self.fail_on.store(n, Ordering::SeqCst);
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaskStore for FlakyStore {
    async fn load(&self, id: &str) -> Result<Option<ReindexingTask>> {
        self.inner.load(id).await
    }

    async fn save(&self, task: &ReindexingTask) -> Result<()> {
        let n = self.saves.fetch_add(1, Ordering::SeqCst) + 1;
        if n == self.fail_on.load(Ordering::SeqCst) {
            return Err(Error::Store("disk full".to_string()));
        }
        self.inner.save(task).await
    }

    async fn list(&self) -> Result<Vec<ReindexingTask>> {
        self.inner.list().await
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub engine: Arc<FakeEngine>,
    pub indexing: Arc<CountingIndexingControl>,
    pub migrations: Arc<StaticMigrations>,
    pub scheduler: Arc<RecordingScheduler>,
    pub clock: Arc<FixedClock>,
    pub store: Arc<dyn TaskStore>,
    pub service: ReindexingService,
}

impl Harness {
    pub fn new(catalog: IndexCatalog, config: ReindexConfig) -> Self {
        Self::with_store(catalog, config, Arc::new(MemoryTaskStore::new()))
    }

    pub fn with_store(
        catalog: IndexCatalog,
        config: ReindexConfig,
        store: Arc<dyn TaskStore>,
    ) -> Self {
        Self::with_engine(catalog, config, store, Arc::new(FakeEngine::new()))
    }

    pub fn with_engine(
        catalog: IndexCatalog,
        config: ReindexConfig,
        store: Arc<dyn TaskStore>,
        engine: Arc<FakeEngine>,
    ) -> Self {
        let indexing = Arc::new(CountingIndexingControl::new(true));
        let migrations = Arc::new(StaticMigrations::default());
        let scheduler = Arc::new(RecordingScheduler::default());
        let clock = Arc::new(FixedClock::new());

        let service = ReindexingService::new(
            engine.clone(),
            migrations.clone(),
            indexing.clone(),
            store.clone(),
            scheduler.clone(),
            catalog,
            config,
        )
        .with_clock(clock.clone());

        Self {
            engine,
            indexing,
            migrations,
            scheduler,
            clock,
            store,
            service,
        }
    }

    /// Tick until the task is terminal or `max_ticks` ran out
    pub async fn run_to_end(&self, task: &mut ReindexingTask, max_ticks: usize) {
        for _ in 0..max_ticks {
            if task.is_terminal() {
                return;
            }
            self.service.tick(task).await;
            self.clock.advance(ChronoDuration::seconds(60));
        }
    }
}

/// Catalog with a `main` alias and the given standalone aliases
pub fn catalog(standalone: &[&str]) -> IndexCatalog {
    IndexCatalog::new("main", standalone.iter().map(|s| s.to_string()).collect())
}
