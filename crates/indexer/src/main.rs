//! LTO Indexer - block scanning and derived index queries
//!
//! This binary provides:
//! - The block scanner service (`run`, the default)
//! - Checkpoint management
//! - Read access to every derived index (anchors, history, roles, ...)

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use lto_indexer::checkpoint::Checkpoint;
use lto_indexer::config::{Config, LoggingConfig};
use lto_indexer::index::IndexService;
use lto_indexer::listener::{BlockScanner, NodeApi, NodeClient};
use lto_indexer::storage::{open_storage, Storage};
use lto_indexer::MS_PER_DAY;

#[derive(Parser)]
#[command(name = "lto-indexer")]
#[command(version, about = "Indexer for the LTO public chain", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "indexer.toml")]
    config: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the block scanner
    Run,

    /// Show checkpoint and node height
    Status,

    /// Manage the processing checkpoint
    Checkpoint {
        #[command(subcommand)]
        action: CheckpointAction,
    },

    /// Transactions that anchored a hash
    Anchor {
        /// Hex encoded hash
        hash: String,
    },

    /// Transaction history of an address
    Txs {
        /// Type name (transfer, anchor, association, ...)
        tx_type: String,
        /// Address
        address: String,
        #[arg(long, default_value_t = lto_indexer::index::transactions::DEFAULT_PAGE_SIZE)]
        limit: usize,
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },

    /// Last known public key of an address
    PublicKey {
        /// Address
        address: String,
    },

    /// Verification methods registered by an address
    VerificationMethods {
        /// Address
        address: String,
        /// Include revoked methods
        #[arg(long)]
        all: bool,
    },

    /// Trust network roles of an address
    Roles {
        /// Address
        address: String,
    },

    /// Associations of an address
    Associations {
        /// Address
        address: String,
    },

    /// Daily transaction counts
    Stats {
        /// Type name
        tx_type: String,
        /// First day (YYYY-MM-DD)
        #[arg(long)]
        from: NaiveDate,
        /// Last day (YYYY-MM-DD), defaults to today
        #[arg(long)]
        to: Option<NaiveDate>,
    },
}

#[derive(Subcommand)]
enum CheckpointAction {
    /// Print the processing height
    Get,
    /// Overwrite the processing height
    Set {
        /// Last fully processed block
        height: u64,
    },
    /// Remove the checkpoint, restarting from the configured block
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::from_file(&cli.config).context("Failed to load configuration")?;

    // Initialize logging
    init_logging(&config.logging, cli.debug)?;

    info!("LTO Indexer {}", env!("CARGO_PKG_VERSION"));

    let storage = open_storage(&config.storage)
        .await
        .context("Failed to open storage")?;

    let command = cli.command.unwrap_or(Commands::Run);
    let result = execute(&config, storage.clone(), command).await;

    storage.close().await;
    result
}

/// Initialize tracing subscriber for logging
fn init_logging(logging: &LoggingConfig, debug: bool) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let env_filter = if debug {
        EnvFilter::new("lto_indexer=debug,sqlx=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("lto_indexer={},sqlx=warn", logging.level))
        })
    };

    let registry = tracing_subscriber::registry().with(env_filter);

    if logging.format == "json" {
        registry
            .with(fmt::layer().json().with_target(true))
            .try_init()
            .context("Failed to install log subscriber")?;
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .try_init()
            .context("Failed to install log subscriber")?;
    }

    Ok(())
}

/// Scanner service, until the scanner fails or Ctrl+C.
async fn run_indexer(config: &Config, storage: Arc<dyn Storage>) -> Result<()> {
    info!("Node: {}", config.node.url);
    info!("Storage: {:?}", config.storage.storage_type);
    info!("Starting block: {}", config.monitor.starting_block);

    let node = NodeClient::new(&config.node).context("Failed to create node client")?;

    let index = IndexService::new(
        storage.clone(),
        config.indexing.clone(),
        &config.trust_network,
    );
    let scanner = BlockScanner::new(
        Arc::new(node),
        index,
        Checkpoint::new(storage),
        config.monitor.clone(),
    );

    info!("Indexer is running. Press Ctrl+C to stop.");

    tokio::select! {
        result = scanner.start() => {
            let state = scanner.state();
            match result {
                Ok(()) => {
                    warn!("Block scanner exited unexpectedly at block {}", state.last_block);
                    Ok(())
                }
                Err(e) => Err(e).with_context(|| {
                    format!("Block scanner failed after block {}", state.last_block)
                }),
            }
        }
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for Ctrl+C")?;
            info!(
                "Received shutdown signal at block {}, shutting down...",
                scanner.state().last_block
            );
            Ok(())
        }
    }
}

async fn execute(config: &Config, storage: Arc<dyn Storage>, command: Commands) -> Result<()> {
    let index = IndexService::new(
        storage.clone(),
        config.indexing.clone(),
        &config.trust_network,
    );

    match command {
        Commands::Run => run_indexer(config, storage).await?,
        Commands::Status => show_status(config, storage).await?,
        Commands::Checkpoint { action } => {
            let checkpoint = Checkpoint::new(storage);
            match action {
                CheckpointAction::Get => match checkpoint.get_processing_height().await? {
                    Some(height) => println!("{}", height),
                    None => println!("none"),
                },
                CheckpointAction::Set { height } => {
                    checkpoint.save_processing_height(height).await?;
                    println!("Checkpoint set to {}", height);
                }
                CheckpointAction::Clear => {
                    checkpoint.clear_processing_height().await?;
                    println!("Checkpoint cleared");
                }
            }
        }
        Commands::Anchor { hash } => print_json(&index.anchors().get_anchor(&hash).await?)?,
        Commands::Txs {
            tx_type,
            address,
            limit,
            offset,
        } => {
            let transactions = index.transactions();
            let ids = transactions
                .get_transactions(&tx_type, &address, limit, offset)
                .await?;
            let total = transactions.count_transactions(&tx_type, &address).await?;
            print_json(&serde_json::json!({ "total": total, "ids": ids }))?;
        }
        Commands::PublicKey { address } => {
            print_json(&index.identity().get_public_key(&address).await?)?
        }
        Commands::VerificationMethods { address, all } => print_json(
            &index
                .identity()
                .get_verification_methods(&address, all)
                .await?,
        )?,
        Commands::Roles { address } => print_json(&index.trust().get_roles(&address).await?)?,
        Commands::Associations { address } => {
            print_json(&index.associations().get_associations(&address).await?)?
        }
        Commands::Stats { tx_type, from, to } => {
            let to = to.unwrap_or_else(|| Utc::now().date_naive());
            let counts = index
                .stats()
                .get_tx_stats(&tx_type, day_number(from)?, day_number(to)?)
                .await?;

            for count in counts {
                println!("{}  {}", format_day(count.day), count.count);
            }
        }
    }

    Ok(())
}

/// Checkpoint and node height.
async fn show_status(config: &Config, storage: Arc<dyn Storage>) -> Result<()> {
    let checkpoint = Checkpoint::new(storage).get_processing_height().await?;

    let node = NodeClient::new(&config.node).context("Failed to create node client")?;
    let node_height = match node.get_last_block_height().await {
        Ok(height) => Some(height),
        Err(e) => {
            warn!("Node unreachable: {}", e);
            None
        }
    };

    println!("\n=== LTO Indexer Status ===\n");
    println!("Node: {}", config.node.url);
    println!("Storage: {:?}", config.storage.storage_type);
    println!("Starting block: {}", config.monitor.starting_block);
    println!(
        "Checkpoint: {}",
        checkpoint.map_or_else(|| "none".to_string(), |h| h.to_string())
    );

    match node_height {
        Some(height) => {
            println!("Node height: {}", height);
            if let Some(done) = checkpoint {
                println!("Blocks behind: {}", height.saturating_sub(done));
            }
        }
        None => println!("Node height: unavailable"),
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Days since the unix epoch, matching the statistics buckets.
fn day_number(date: NaiveDate) -> Result<u64> {
    let millis = date
        .and_hms_opt(0, 0, 0)
        .context("Invalid date")?
        .and_utc()
        .timestamp_millis();
    let millis = u64::try_from(millis).context("Dates before 1970 have no statistics")?;
    Ok(millis / MS_PER_DAY)
}

fn format_day(day: u64) -> String {
    i64::try_from(day * MS_PER_DAY)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .map(|dt| dt.date_naive().to_string())
        .unwrap_or_else(|| day.to_string())
}
