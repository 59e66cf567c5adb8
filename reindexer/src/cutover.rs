//! Alias cutover for a subtask whose slices all completed

use crate::engine::{AliasAction, SearchEngine};
use crate::error::ReindexFailure;
use crate::metrics;
use crate::task::ReindexingSubtask;
use chrono::{DateTime, Utc};
use tracing::info;

/// Verify counts, restore serving settings and switch the alias atomically.
///
/// A count mismatch fails without touching the alias.
pub async fn cut_over(
    engine: &dyn SearchEngine,
    subtask: &mut ReindexingSubtask,
    now: DateTime<Utc>,
) -> Result<(), ReindexFailure> {
    let from = subtask.index_name_from.clone();
    let to = subtask.index_name_to.clone();

    engine.refresh_index(&from).await?;
    engine.refresh_index(&to).await?;

    let original = engine.documents_count(&from, false).await?;
    let new = engine.documents_count(&to, false).await?;
    subtask.documents_count_target = Some(new);

    if original != new {
        return Err(ReindexFailure::CountMismatch {
            alias: subtask.alias_name.clone(),
            original,
            new,
        });
    }

    engine
        .update_settings(&to, subtask.settings.restore_body())
        .await?;

    let actions = [
        AliasAction::Remove {
            index: from.clone(),
            alias: subtask.alias_name.clone(),
        },
        AliasAction::Add {
            index: to.clone(),
            alias: subtask.alias_name.clone(),
            is_write_index: true,
        },
    ];
    engine.multi_switch_alias(&actions).await?;

    subtask.cut_over_at = Some(now);
    metrics::record_cutover(&subtask.alias_name);

    info!(
        "Switched alias '{}' from {} to {} ({} documents)",
        subtask.alias_name, from, to, new
    );
    Ok(())
}
