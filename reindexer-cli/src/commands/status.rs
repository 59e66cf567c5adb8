use super::task_store;
use crate::config::Config;
use anyhow::Result;
use reindexer::ReindexingTask;
use std::fmt::Write;

/// Show a task, or the latest one when no id is given
pub async fn run_status(config: &Config, id: Option<String>, json: bool) -> Result<()> {
    let store = task_store(config);

    let task = match id {
        Some(ref id) => store.load(id).await?,
        None => store.latest().await?,
    };
    let Some(task) = task else {
        match id {
            Some(id) => anyhow::bail!("Reindexing task not found: {}", id),
            None => {
                println!("No reindexing tasks");
                return Ok(());
            }
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&task)?);
    } else {
        print!("{}", render(&task));
    }
    Ok(())
}

fn render(task: &ReindexingTask) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Reindexing Task {}", task.id);
    let _ = writeln!(out, "================={}", "=".repeat(task.id.len()));
    let _ = writeln!(out, "State:        {}", task.state);
    let _ = writeln!(
        out,
        "Targets:      {}",
        if task.targets.is_empty() {
            "all".to_string()
        } else {
            task.targets.join(", ")
        }
    );
    let _ = writeln!(
        out,
        "Slices:       {}/{} completed, {} running (max {})",
        task.completed_slices(),
        task.total_slices(),
        task.running_slices(),
        task.max_slices_running
    );
    let _ = writeln!(out, "Created:      {}", task.created_at.to_rfc3339());
    let _ = writeln!(out, "Updated:      {}", task.updated_at.to_rfc3339());
    if let Some(at) = task.delete_original_index_at {
        let _ = writeln!(out, "Delete after: {}", at.to_rfc3339());
    }
    if let Some(ref message) = task.error_message {
        let _ = writeln!(out, "Error:        {}", message);
    }

    if !task.subtasks.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{:<30} {:<12} {:<10} {:<8} {:<12} {:<10}",
            "ALIAS", "KIND", "SLICES", "RETRIES", "DOCS", "CUT OVER"
        );
        let _ = writeln!(out, "{}", "-".repeat(86));
        for subtask in &task.subtasks {
            let completed = subtask.slices.iter().filter(|s| s.completed).count();
            let retries: u32 = subtask.slices.iter().map(|s| s.retry_attempt).sum();
            let docs = match subtask.documents_count_target {
                Some(target) => format!("{}/{}", target, subtask.documents_count),
                None => subtask.documents_count.to_string(),
            };
            let _ = writeln!(
                out,
                "{:<30} {:<12} {:<10} {:<8} {:<12} {:<10}",
                subtask.alias_name,
                subtask.kind.to_string(),
                format!("{}/{}", completed, subtask.slices.len()),
                retries,
                docs,
                if subtask.is_cut_over() { "yes" } else { "no" },
            );
            let _ = writeln!(
                out,
                "  {} -> {}",
                subtask.index_name_from, subtask.index_name_to
            );
        }
    }

    out
}
