use crate::models::SearchSample;
use ndb_common::db::row::opt_id;
use ndb_common::{time, Result};
use sqlx::{Executor, Sqlite, SqlitePool};
use std::collections::HashMap;
use uuid::Uuid;

/// Current search samples keyed by id
pub async fn fetch_samples(pool: &SqlitePool) -> Result<HashMap<Uuid, SearchSample>> {
    let rows = sqlx::query(
        "SELECT id, id_number, animal_id, tag, comment, sample_date, mouse_strain_id, search_scope, updated_at \
         FROM sample",
    )
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|r| SearchSample::from_row(r).map(|s| (s.id, s)))
        .collect()
}

pub async fn upsert_sample<'e, E>(executor: E, sample: &SearchSample) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO sample (id, id_number, animal_id, tag, comment, sample_date, mouse_strain_id, search_scope, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            id_number = excluded.id_number,
            animal_id = excluded.animal_id,
            tag = excluded.tag,
            comment = excluded.comment,
            sample_date = excluded.sample_date,
            mouse_strain_id = excluded.mouse_strain_id,
            search_scope = excluded.search_scope,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(sample.id.to_string())
    .bind(sample.id_number)
    .bind(&sample.animal_id)
    .bind(&sample.tag)
    .bind(&sample.comment)
    .bind(sample.sample_date.as_ref().map(time::to_db))
    .bind(opt_id(sample.mouse_strain_id))
    .bind(sample.search_scope.code())
    .bind(time::to_db(&sample.updated_at))
    .execute(executor)
    .await?;

    Ok(())
}

/// Delete samples by id, keeping any still referenced by a neuron
pub async fn delete_unreferenced_samples(pool: &SqlitePool, ids: &[Uuid]) -> Result<u64> {
    if ids.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    let mut removed = 0;
    for id in ids {
        removed += sqlx::query(
            "DELETE FROM sample WHERE id = ? AND NOT EXISTS (SELECT 1 FROM neuron WHERE neuron.sample_id = sample.id)",
        )
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?
        .rows_affected();
    }
    tx.commit().await?;

    Ok(removed)
}
