//! Database Test Utilities
//!
//! File-backed stores in a temporary directory, plus search-store queries

use anyhow::Result;
use ndb_common::config::StorePaths;
use ndb_common::{AtlasVersion, Visibility};
use ndb_sync::db::search_store::contents;
use ndb_sync::models::{CompartmentContent, SearchNeuron, SearchTracing};
use ndb_sync::{ReconcileOptions, Reconciler, Stores};
use sqlx::SqlitePool;
use tempfile::TempDir;
use uuid::Uuid;

/// Four fresh stores with schemas created
///
/// The TempDir must be kept alive for the duration of the test.
pub struct TestStores {
    pub dir: TempDir,
    pub stores: Stores,
}

impl TestStores {
    pub fn reconciler(&self, options: ReconcileOptions) -> Reconciler {
        Reconciler::new(self.stores.clone(), options)
    }

    pub fn search(&self) -> &SqlitePool {
        &self.stores.search
    }
}

pub async fn create_test_stores() -> Result<TestStores> {
    let dir = TempDir::new()?;
    let paths = StorePaths::in_directory(dir.path());
    let stores = Stores::open(&paths, 1000, true).await?;
    Ok(TestStores { dir, stores })
}

/// Small batches so windowing and chunking are exercised by tiny fixtures
pub fn test_options(visibility: Visibility) -> ReconcileOptions {
    ReconcileOptions {
        visibility,
        force_update: false,
        tracing_chunk_count: 2,
        node_batch_size: 3,
        content_batch_size: 2,
        max_lock_wait_ms: 2000,
        prune_samples: false,
    }
}

pub async fn count_rows(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn search_neuron(pool: &SqlitePool, id: Uuid) -> Option<SearchNeuron> {
    ndb_sync::db::search_store::neurons::fetch_neurons(pool)
        .await
        .unwrap()
        .remove(&id)
}

pub async fn search_tracing(pool: &SqlitePool, id: Uuid) -> Option<SearchTracing> {
    ndb_sync::db::search_store::tracings::fetch_tracings(pool)
        .await
        .unwrap()
        .remove(&id)
}

pub async fn content_rows(pool: &SqlitePool, version: AtlasVersion, tracing_id: Uuid) -> Vec<CompartmentContent> {
    contents::fetch_for_tracing(pool, version, tracing_id).await.unwrap()
}
