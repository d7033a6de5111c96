//! ContractIQ Ingestion CLI
//!
//! Runs extraction for one uploaded contract, or re-processes every
//! contract with a file, and prints a JSON summary on stdout.

use anyhow::Context;
use clap::{Parser, Subcommand};
use contractiq_common::{
    config::{AppConfig, ObservabilityConfig},
    db::{ContractStore, DbPool, MemoryStore, Repository},
    metrics, VERSION,
};
use contractiq_ingestion::ExtractionProcessor;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ingestion")]
#[command(about = "Extract contract details and parties from uploaded documents")]
#[command(version = VERSION)]
struct Cli {
    /// Configuration file to load instead of the layered config/ directory
    #[arg(long, global = true, env = "CONTRACTIQ_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract one contract document
    Process {
        #[arg(long)]
        contract_id: i32,
        #[arg(long)]
        user_id: i32,
        /// Document to read; defaults to the contract's stored file path
        #[arg(long)]
        file: Option<PathBuf>,
        /// Run against an in-memory store; nothing is written to the database.
        /// Requires --file.
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    /// Re-run extraction for every contract that has an uploaded file
    Reprocess,
}

fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    // Logs go to stderr so stdout stays a clean JSON summary
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if config.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn connect(config: &AppConfig) -> anyhow::Result<Repository> {
    info!("Connecting to database...");
    let pool = DbPool::new(&config.database)
        .await
        .context("database connection failed")?;
    let repo = Repository::new(pool);
    repo.ping().await.context("database ping failed")?;
    Ok(repo)
}

/// Document path for a contract: explicit, else the one stored with it
async fn resolve_file(
    repo: &Repository,
    contract_id: i32,
    file: Option<PathBuf>,
) -> anyhow::Result<PathBuf> {
    if let Some(file) = file {
        return Ok(file);
    }

    let contract = repo
        .find_contract_by_id(contract_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("contract {contract_id} not found"))?;

    contract
        .file_path
        .map(PathBuf::from)
        .ok_or_else(|| anyhow::anyhow!("contract {contract_id} has no uploaded file"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::from_file(&path.to_string_lossy()),
        None => AppConfig::load(),
    }
    .context("failed to load configuration")?;

    init_tracing(&config.observability);
    metrics::register_metrics();

    info!(
        service = %config.observability.service_name,
        "Starting ContractIQ ingestion v{}",
        VERSION
    );

    match cli.command {
        Commands::Process {
            contract_id,
            user_id,
            file,
            dry_run,
        } => {
            let (store, file): (Arc<dyn ContractStore>, PathBuf) = if dry_run {
                info!("Dry run, using in-memory store");
                let file = file.context("--dry-run needs --file")?;
                (Arc::new(MemoryStore::new()), file)
            } else {
                let repo = connect(&config).await?;
                let file = resolve_file(&repo, contract_id, file).await?;
                (Arc::new(repo), file)
            };

            let processor = ExtractionProcessor::from_config(store, &config.extraction)?;
            let outcome = processor
                .process_document(&file, contract_id, user_id)
                .await
                .with_context(|| format!("extraction failed for contract {contract_id}"))?;

            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Commands::Reprocess => {
            let store: Arc<dyn ContractStore> = Arc::new(connect(&config).await?);
            let processor = ExtractionProcessor::from_config(store, &config.extraction)?;
            let report = processor.reprocess_all().await?;

            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
