use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod config;
mod export;
mod ingest;
mod telemetry;

use config::CliConfig;

#[derive(Parser)]
#[command(name = "scrollbulk")]
#[command(about = "Export and ingest documents through the scroll and bulk APIs")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.json")]
    config: String,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write every document of an index as NDJSON
    Export {
        index: String,

        /// File holding the search body; match_all when omitted
        #[arg(short, long)]
        query: Option<PathBuf>,

        /// Output file; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Bulk-load an NDJSON file of documents into an index
    Ingest {
        index: String,

        /// One JSON document per line
        file: PathBuf,

        /// Documents per bulk request
        #[arg(short, long, default_value_t = ingest::DEFAULT_BATCH_SIZE)]
        batch_size: usize,

        /// Document field used as `_id`
        #[arg(long)]
        id_field: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, load_error) = match CliConfig::load(&cli.config) {
        Ok(config) => (config, None),
        Err(e) => (CliConfig::default(), Some(e)),
    };
    let config = config.apply_env();

    let _guard = telemetry::init_telemetry(config.log_dir.as_deref(), cli.verbose)?;
    if let Some(e) = load_error {
        tracing::warn!("Failed to load {}, using defaults: {}", cli.config, e);
    }

    tracing::info!("scrollbulk starting");
    tracing::info!("  Endpoint: {}", config.elastic.url);
    tracing::info!(
        "  Retry: statuses={:?}, max_retries={}",
        config.elastic.retry_on_status,
        config.elastic.max_retries
    );

    let client = scrollbulk_rs::connect(&config.elastic).context("Failed to build client")?;

    match cli.command {
        Commands::Export {
            index,
            query,
            output,
        } => {
            let query = match query {
                Some(path) => std::fs::read(&path)
                    .with_context(|| format!("Failed to read query file {}", path.display()))?,
                None => export::MATCH_ALL_QUERY.as_bytes().to_vec(),
            };
            let written = export::run(&client, &index, &query, output.as_deref()).await?;
            tracing::info!("✓ Exported {} documents from {}", written, index);
        }
        Commands::Ingest {
            index,
            file,
            batch_size,
            id_field,
        } => {
            let summary =
                ingest::run(&client, &index, &file, batch_size, id_field.as_deref()).await?;
            tracing::info!(
                "✓ Ingested {} documents into {} in {} batches ({} rejected)",
                summary.accepted,
                index,
                summary.batches,
                summary.rejected
            );
            if summary.rejected > 0 {
                anyhow::bail!("{} documents were rejected", summary.rejected);
            }
        }
    }

    Ok(())
}
