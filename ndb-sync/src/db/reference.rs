//! Generic access to mirrored lookup tables

use crate::models::ReferenceRow;
use ndb_common::{uuid_utils, Result};
use sqlx::SqlitePool;
use uuid::Uuid;

/// Load every row of a lookup table
pub async fn fetch_all<T: ReferenceRow>(pool: &SqlitePool) -> Result<Vec<T>> {
    let sql = format!("SELECT {} FROM {} ORDER BY id", T::COLUMNS.join(", "), T::TABLE);
    let rows = sqlx::query(&sql).fetch_all(pool).await?;
    rows.iter().map(T::from_row).collect()
}

/// Upsert a row by id, touching the table only when a column differs
///
/// Returns true when the row was inserted or changed.
pub async fn upsert_if_changed<T: ReferenceRow>(pool: &SqlitePool, row: &T) -> Result<bool> {
    let sql = upsert_sql::<T>();
    let result = row.bind(sqlx::query(&sql)).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

/// Ids currently present in a lookup table
pub async fn list_ids<T: ReferenceRow>(pool: &SqlitePool) -> Result<Vec<Uuid>> {
    let sql = format!("SELECT id FROM {}", T::TABLE);
    let ids: Vec<String> = sqlx::query_scalar(&sql).fetch_all(pool).await?;
    ids.iter().map(|id| uuid_utils::parse(id)).collect()
}

/// Delete rows by id in one transaction
pub async fn delete_ids<T: ReferenceRow>(pool: &SqlitePool, ids: &[Uuid]) -> Result<u64> {
    if ids.is_empty() {
        return Ok(0);
    }

    let sql = format!("DELETE FROM {} WHERE id = ?", T::TABLE);
    let mut tx = pool.begin().await?;
    let mut removed = 0;
    for id in ids {
        removed += sqlx::query(&sql)
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?
            .rows_affected();
    }
    tx.commit().await?;

    Ok(removed)
}

fn upsert_sql<T: ReferenceRow>() -> String {
    let columns = T::COLUMNS;
    let placeholders = vec!["?"; columns.len()].join(", ");
    let data_columns = &columns[1..];
    let assignments = data_columns
        .iter()
        .map(|c| format!("{c} = excluded.{c}"))
        .collect::<Vec<_>>()
        .join(", ");
    let differs = data_columns
        .iter()
        .map(|c| format!("{table}.{c} IS NOT excluded.{c}", table = T::TABLE))
        .collect::<Vec<_>>()
        .join(" OR ");

    format!(
        "INSERT INTO {table} ({cols}) VALUES ({placeholders}) \
         ON CONFLICT(id) DO UPDATE SET {assignments} WHERE {differs}",
        table = T::TABLE,
        cols = columns.join(", "),
    )
}
