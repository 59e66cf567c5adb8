mod commands;
mod config;
mod control;
mod logging;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use commands::indexing::IndexingCommand;
use commands::start::StartArgs;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "reindexer")]
#[command(about = "Zero-downtime reindexing of search cluster aliases")]
#[command(version)]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, global = true, env = "REINDEXER_CONFIG", default_value = "reindexer.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a reindexing task
    Start {
        /// Aliases to reindex (comma-separated); defaults to every configured alias
        #[arg(short, long, value_delimiter = ',')]
        targets: Vec<String>,

        /// Upper bound on concurrently running slices
        #[arg(long)]
        max_slices_running: Option<usize>,

        /// Slices per source shard
        #[arg(long)]
        slice_multiplier: Option<u32>,

        /// Start even when search migrations are pending
        #[arg(long)]
        skip_pending_migrations_check: bool,

        /// Keep ticking in this process until the task finishes
        #[arg(long)]
        run: bool,
    },

    /// Advance a task by one tick
    Tick {
        /// Task id; defaults to the task in progress
        #[arg(long)]
        id: Option<String>,
    },

    /// Tick a task in this process until it finishes (Ctrl-C to detach)
    Run {
        /// Task id; defaults to the task in progress
        #[arg(long)]
        id: Option<String>,
    },

    /// Show a task's progress
    Status {
        /// Task id; defaults to the most recent task
        #[arg(long)]
        id: Option<String>,

        /// Print the raw task document
        #[arg(long)]
        json: bool,
    },

    /// Delete original indices whose grace window has passed
    DropOldIndices,

    /// Inspect or change the live-indexing toggle
    Indexing {
        #[command(subcommand)]
        command: IndexingCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::Config::load(&cli.config)
        .with_context(|| format!("Invalid config {}", cli.config.display()))?;

    logging::init(&config.observability);

    if let Some(addr) = config.observability.metrics_addr()? {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("Failed to start metrics exporter")?;
        tracing::info!("Serving metrics on http://{}/metrics", addr);
    }

    match cli.command {
        Commands::Start {
            targets,
            max_slices_running,
            slice_multiplier,
            skip_pending_migrations_check,
            run,
        } => {
            commands::run_start(
                &config,
                StartArgs {
                    targets,
                    max_slices_running,
                    slice_multiplier,
                    skip_pending_migrations_check,
                    run,
                },
            )
            .await?;
        }
        Commands::Tick { id } => commands::run_tick(&config, id).await?,
        Commands::Run { id } => commands::run_loop(&config, id).await?,
        Commands::Status { id, json } => commands::run_status(&config, id, json).await?,
        Commands::DropOldIndices => commands::run_drop_old_indices(&config).await?,
        Commands::Indexing { command } => commands::run_indexing(&config, command).await?,
    }

    Ok(())
}
