//! Store initialization
//!
//! Each of the four stores is a separate SQLite file. Connection-level
//! pragmas are applied through the connect options so every pooled
//! connection enforces foreign keys and shares the same busy timeout.

use crate::db::schema;
use crate::Result;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Default SQLite busy timeout
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

/// The four relational stores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StoreKind {
    /// Samples, injections, neurons, brain areas, strains
    Sample,
    /// Raw digitized tracings and their lookup tables
    RawTracing,
    /// Spatially registered tracings, nodes and compartment aggregates
    RegisteredTracing,
    /// Denormalized search store
    Search,
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StoreKind::Sample => "sample",
            StoreKind::RawTracing => "raw-tracing",
            StoreKind::RegisteredTracing => "registered-tracing",
            StoreKind::Search => "search",
        };
        f.write_str(name)
    }
}

/// Open (creating if missing) a store database
pub async fn open_store(kind: StoreKind, db_path: &Path, busy_timeout_ms: u64) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // WAL allows readers alongside the single writer during chunked tracing sync
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(busy_timeout_ms));

    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .min_connections(1)
        .connect_with(options)
        .await?;

    if newly_created {
        info!(store = %kind, "Initialized new database: {}", db_path.display());
    } else {
        info!(store = %kind, "Opened existing database: {}", db_path.display());
    }

    Ok(pool)
}

/// Open a store and create any missing tables
pub async fn init_store(kind: StoreKind, db_path: &Path, busy_timeout_ms: u64) -> Result<SqlitePool> {
    let pool = open_store(kind, db_path, busy_timeout_ms).await?;
    schema::create_schema(kind, &pool).await?;
    Ok(pool)
}
