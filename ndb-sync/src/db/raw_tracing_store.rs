//! Raw tracing store reads

use crate::models::RawTracing;
use ndb_common::Result;
use sqlx::SqlitePool;

/// All raw tracings, ordered by id
pub async fn fetch_raw_tracings(pool: &SqlitePool) -> Result<Vec<RawTracing>> {
    let rows = sqlx::query(
        "SELECT id, neuron_id, tracing_structure_id, filename, annotator, updated_at \
         FROM swc_tracing ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(RawTracing::from_row).collect()
}
