//! Subtask construction for a task in `indexing_paused` state

use crate::catalog::ResolvedTarget;
use crate::config::ReindexConfig;
use crate::engine::{CreateIndexOptions, IndexTarget, SearchEngine};
use crate::error::{Error, ReindexFailure};
use crate::planner;
use crate::settings::SettingsSnapshot;
use crate::task::{IndexKind, ReindexingSubtask};
use std::collections::HashMap;
use tracing::info;

/// Index currently receiving writes for `alias`.
///
/// An alias with one target and no explicit flag writes to that target.
pub async fn write_target(
    engine: &dyn SearchEngine,
    alias: &str,
) -> Result<String, ReindexFailure> {
    let targets = engine.target_index_names(alias).await?;

    let only_target = targets.len() == 1;

    let mut candidates: Vec<String> = targets
        .into_iter()
        .filter(|(_, is_write)| *is_write || only_target)
        .map(|(index, _)| index)
        .collect();

    match candidates.pop() {
        Some(index) if candidates.is_empty() => Ok(index),
        _ => Err(ReindexFailure::WriteTargetUnresolved {
            alias: alias.to_string(),
        }),
    }
}

struct Source {
    alias: String,
    kind: IndexKind,
    index: String,
    shards: u32,
    documents_count: u64,
    settings: SettingsSnapshot,
}

/// Create destination indices and a subtask with planned slices for every
/// target, in target order.
pub async fn build_subtasks(
    engine: &dyn SearchEngine,
    config: &ReindexConfig,
    targets: &[ResolvedTarget],
    slice_multiplier: u32,
) -> Result<Vec<ReindexingSubtask>, ReindexFailure> {
    let mut sources = Vec::with_capacity(targets.len());
    for target in targets {
        let index = write_target(engine, &target.alias).await?;
        let settings = engine.get_settings(&index).await?;
        let shards = settings.number_of_shards().ok_or_else(|| {
            Error::Engine(format!("index '{}' reports no number_of_shards", index))
        })?;
        let documents_count = engine.documents_count(&index, false).await?;

        sources.push(Source {
            alias: target.alias.clone(),
            kind: target.kind,
            index,
            shards,
            documents_count,
            settings: SettingsSnapshot::capture(&settings),
        });
    }

    let destinations = create_destinations(engine, config, &sources).await?;

    let mut subtasks = Vec::with_capacity(sources.len());
    for source in sources {
        let index_name_to = destinations
            .get(&source.alias)
            .cloned()
            .ok_or_else(|| {
                Error::Engine(format!(
                    "no destination index was created for alias '{}'",
                    source.alias
                ))
            })?;

        let slices = planner::plan_slices(source.shards, slice_multiplier);

        info!(
            "Planned reindex of '{}': {} -> {} ({} shards, {} slices, {} documents)",
            source.alias,
            source.index,
            index_name_to,
            source.shards,
            slices.len(),
            source.documents_count
        );

        subtasks.push(ReindexingSubtask {
            alias_name: source.alias,
            index_name_from: source.index,
            index_name_to,
            kind: source.kind,
            documents_count: source.documents_count,
            documents_count_target: None,
            settings: source.settings,
            slices,
            cut_over_at: None,
        });
    }

    Ok(subtasks)
}

/// Returns `alias -> new index name`
async fn create_destinations(
    engine: &dyn SearchEngine,
    config: &ReindexConfig,
    sources: &[Source],
) -> Result<HashMap<String, String>, ReindexFailure> {
    let target_for = |alias: &str| IndexTarget {
        alias: alias.to_string(),
        options: CreateIndexOptions {
            number_of_shards: config.number_of_shards_for(alias),
            ..Default::default()
        },
    };

    let mut created: HashMap<String, String> = HashMap::new();

    for source in sources.iter().filter(|s| s.kind == IndexKind::Main) {
        created.extend(engine.create_empty_index(&target_for(&source.alias)).await?);
    }

    let standalone: Vec<IndexTarget> = sources
        .iter()
        .filter(|s| s.kind == IndexKind::Standalone)
        .map(|s| target_for(&s.alias))
        .collect();
    if !standalone.is_empty() {
        created.extend(engine.create_standalone_indices(&standalone).await?);
    }

    Ok(created
        .into_iter()
        .map(|(index, alias)| (alias, index))
        .collect())
}
