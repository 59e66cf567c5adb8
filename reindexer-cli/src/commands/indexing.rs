use crate::config::Config;
use crate::control::{FileIndexingControl, IndexingState};
use anyhow::Result;
use clap::Subcommand;
use reindexer::IndexingControl;

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexingCommand {
    /// Show the live-indexing toggle
    Status,
    /// Hold live indexing updates
    Pause,
    /// Release held live indexing updates
    Resume,
    /// Allow live indexing
    Enable,
    /// Turn live indexing off; reindexing refuses to start while disabled
    Disable,
}

/// Inspect or flip the file-backed indexing toggle
pub async fn run_indexing(config: &Config, command: IndexingCommand) -> Result<()> {
    let control = FileIndexingControl::new(config.state.indexing_file());
    let state = apply(&control, command).await?;

    println!("Indexing enabled: {}", state.enabled);
    println!("Indexing paused:  {}", state.paused);
    Ok(())
}

async fn apply(control: &FileIndexingControl, command: IndexingCommand) -> Result<IndexingState> {
    match command {
        IndexingCommand::Status => {}
        IndexingCommand::Pause => control.pause().await?,
        IndexingCommand::Resume => control.resume().await?,
        IndexingCommand::Enable => {
            control.set_enabled(true).await?;
        }
        IndexingCommand::Disable => {
            control.set_enabled(false).await?;
        }
    }
    Ok(control.state().await?)
}
