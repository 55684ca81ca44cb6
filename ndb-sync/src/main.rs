//! ndb-sync - search store reconciliation job
//!
//! Loads configuration, opens the four stores and runs one reconciliation.
//! Exits 0 after logging "complete", or 1 after logging "complete with error".

use anyhow::{Context, Result};
use clap::Parser;
use ndb_common::config::{load_config, resolve_config_path, SyncConfig};
use ndb_common::Visibility;
use ndb_sync::{ReconcileOptions, Reconciler, Stores};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for ndb-sync
#[derive(Parser, Debug)]
#[command(name = "ndb-sync")]
#[command(about = "Rebuild the neuron search store from the upstream stores")]
#[command(version)]
struct Args {
    /// TOML config file
    #[arg(short, long, env = "NDB_CONFIG")]
    config: Option<PathBuf>,

    /// Sample store database
    #[arg(long, env = "NDB_SAMPLE_DB")]
    sample_db: Option<PathBuf>,

    /// Raw tracing (SWC) store database
    #[arg(long, env = "NDB_SWC_DB")]
    swc_db: Option<PathBuf>,

    /// Registered tracing (transform) store database
    #[arg(long, env = "NDB_TRANSFORM_DB")]
    transform_db: Option<PathBuf>,

    /// Search store database
    #[arg(long, env = "NDB_SEARCH_DB")]
    search_db: Option<PathBuf>,

    /// Minimum visibility to include (do-not-share, share-all-internal, share-all-external)
    #[arg(long, env = "NDB_VISIBILITY")]
    visibility: Option<Visibility>,

    /// Rewrite every qualifying record even when unchanged
    #[arg(short, long, env = "NDB_FORCE_UPDATE")]
    force: bool,

    /// Delete search samples that no longer qualify
    #[arg(long, env = "NDB_PRUNE_SAMPLES")]
    prune_samples: bool,

    /// Number of concurrently processed tracing chunks
    #[arg(long, env = "NDB_TRACING_CHUNKS")]
    tracing_chunks: Option<usize>,

    /// Nodes per bulk insert statement
    #[arg(long, env = "NDB_NODE_BATCH_SIZE")]
    node_batch_size: Option<usize>,

    /// Content rows per insert statement
    #[arg(long, env = "NDB_CONTENT_BATCH_SIZE")]
    content_batch_size: Option<usize>,

    /// Longest total wait when retrying a locked write
    #[arg(long, env = "NDB_MAX_LOCK_WAIT_MS")]
    max_lock_wait_ms: Option<u64>,

    /// SQLite busy timeout per connection
    #[arg(long, env = "NDB_BUSY_TIMEOUT_MS")]
    busy_timeout_ms: Option<u64>,

    /// Create missing tables in all four stores before running
    #[arg(long)]
    init_schema: bool,

    /// Log level when RUST_LOG is unset
    #[arg(long, env = "NDB_LOG_LEVEL")]
    log_level: Option<String>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match effective_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ndb-sync: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    if args.print_config {
        return match toml::to_string_pretty(&config) {
            Ok(text) => {
                print!("{}", text);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("ndb-sync: failed to render config: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        git_hash = env!("GIT_HASH"),
        built = env!("BUILD_TIMESTAMP"),
        profile = env!("BUILD_PROFILE"),
        "Starting ndb-sync"
    );

    match run(&args, config).await {
        Ok(true) => {
            info!("complete");
            ExitCode::SUCCESS
        }
        Ok(false) => {
            info!("complete with error");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!(error = %format!("{:#}", e), "Startup failed");
            info!("complete with error");
            ExitCode::FAILURE
        }
    }
}

/// Config file values with command-line and environment overrides applied
fn effective_config(args: &Args) -> Result<SyncConfig> {
    let path = resolve_config_path(args.config.as_deref());
    let mut config = load_config(path.as_deref()).context("Failed to load configuration")?;
    apply_overrides(args, &mut config);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn apply_overrides(args: &Args, config: &mut SyncConfig) {
    if let Some(path) = &args.sample_db {
        config.stores.sample = path.clone();
    }
    if let Some(path) = &args.swc_db {
        config.stores.raw_tracing = path.clone();
    }
    if let Some(path) = &args.transform_db {
        config.stores.registered_tracing = path.clone();
    }
    if let Some(path) = &args.search_db {
        config.stores.search = path.clone();
    }
    if let Some(visibility) = args.visibility {
        config.visibility = visibility;
    }
    if args.force {
        config.force_update = true;
    }
    if args.prune_samples {
        config.prune_samples = true;
    }
    if let Some(chunks) = args.tracing_chunks {
        config.tracing_chunk_count = chunks;
    }
    if let Some(size) = args.node_batch_size {
        config.node_batch_size = size;
    }
    if let Some(size) = args.content_batch_size {
        config.content_batch_size = size;
    }
    if let Some(ms) = args.max_lock_wait_ms {
        config.max_lock_wait_ms = ms;
    }
    if let Some(ms) = args.busy_timeout_ms {
        config.busy_timeout_ms = ms;
    }
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
}

async fn run(args: &Args, config: SyncConfig) -> Result<bool> {
    info!(
        sample = %config.stores.sample.display(),
        raw_tracing = %config.stores.raw_tracing.display(),
        registered_tracing = %config.stores.registered_tracing.display(),
        search = %config.stores.search.display(),
        "Store locations"
    );

    let stores = Stores::open(&config.stores, config.busy_timeout_ms, args.init_schema)
        .await
        .context("Failed to open stores")?;

    let reconciler = Reconciler::new(stores, ReconcileOptions::from(&config));
    Ok(reconciler.run().await)
}
