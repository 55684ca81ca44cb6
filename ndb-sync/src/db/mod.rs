//! Store access for the reconciliation engine
//!
//! One module per store. Upstream modules only read; `search_store` owns
//! every write to the destination.

pub mod raw_tracing_store;
pub mod reference;
pub mod registered_store;
pub mod sample_store;
pub mod search_store;

use ndb_common::config::StorePaths;
use ndb_common::db::{init_store, open_store, StoreKind};
use ndb_common::Result;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

/// Upper bound on ids bound into one `IN (...)` list
pub const MAX_IN_LIST: usize = 500;

/// Connection pools for the three upstream stores and the search store
#[derive(Clone)]
pub struct Stores {
    pub sample: SqlitePool,
    pub raw_tracing: SqlitePool,
    pub registered_tracing: SqlitePool,
    pub search: SqlitePool,
}

impl Stores {
    /// Open all four stores, optionally creating missing tables
    pub async fn open(paths: &StorePaths, busy_timeout_ms: u64, create_missing_tables: bool) -> Result<Self> {
        let open = |kind: StoreKind, path: std::path::PathBuf| async move {
            if create_missing_tables {
                init_store(kind, &path, busy_timeout_ms).await
            } else {
                open_store(kind, &path, busy_timeout_ms).await
            }
        };

        Ok(Self {
            sample: open(StoreKind::Sample, paths.sample.clone()).await?,
            raw_tracing: open(StoreKind::RawTracing, paths.raw_tracing.clone()).await?,
            registered_tracing: open(StoreKind::RegisteredTracing, paths.registered_tracing.clone()).await?,
            search: open(StoreKind::Search, paths.search.clone()).await?,
        })
    }
}

/// Append `(?, ?, ...)` bound to the given ids
pub(crate) fn push_id_list(builder: &mut QueryBuilder<'_, Sqlite>, ids: &[Uuid]) {
    builder.push("(");
    let mut separated = builder.separated(", ");
    for id in ids {
        separated.push_bind(id.to_string());
    }
    separated.push_unseparated(")");
}

/// Id of the structure identifier with the SWC soma code, if the table has one
///
/// Works against any store holding a `structure_identifier` table.
pub async fn soma_structure_identifier_id(pool: &SqlitePool) -> Result<Option<Uuid>> {
    let id: Option<String> = sqlx::query_scalar(
        "SELECT id FROM structure_identifier WHERE value = ? ORDER BY id LIMIT 1",
    )
    .bind(crate::models::StructureIdentifier::SOMA_VALUE)
    .fetch_optional(pool)
    .await?;

    id.as_deref().map(ndb_common::uuid_utils::parse).transpose()
}
