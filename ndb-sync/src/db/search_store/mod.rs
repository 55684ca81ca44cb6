//! Search store reads and writes
//!
//! Every write is an idempotent upsert by id or a delete by id set, so a
//! failed run is recovered by running again.

pub mod contents;
pub mod neurons;
pub mod nodes;
pub mod samples;
pub mod tracings;

use super::{push_id_list, MAX_IN_LIST};
use ndb_common::Result;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use uuid::Uuid;

/// `DELETE FROM {table} WHERE {column} IN (...)`, chunked
pub(crate) async fn delete_where_in(
    conn: &mut SqliteConnection,
    table: &str,
    column: &str,
    ids: &[Uuid],
) -> Result<u64> {
    let mut removed = 0;
    for chunk in ids.chunks(MAX_IN_LIST) {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("DELETE FROM {table} WHERE {column} IN "));
        push_id_list(&mut builder, chunk);
        removed += builder.build().execute(&mut *conn).await?.rows_affected();
    }
    Ok(removed)
}
