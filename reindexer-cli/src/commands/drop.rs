use super::build_service;
use crate::config::Config;
use crate::control::LogScheduler;
use anyhow::{Context, Result};
use std::sync::Arc;

/// Delete original indices whose grace window has passed
pub async fn run_drop_old_indices(config: &Config) -> Result<()> {
    let service = build_service(config, Arc::new(LogScheduler))?;
    let deleted = service
        .drop_old_indices()
        .await
        .context("Failed to drop original indices")?;

    if deleted.is_empty() {
        println!("No original indices due for deletion");
    } else {
        println!("Deleted {} original indices:", deleted.len());
        for index in deleted {
            println!("  {}", index);
        }
    }
    Ok(())
}
