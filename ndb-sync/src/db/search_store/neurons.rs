use super::delete_where_in;
use crate::models::SearchNeuron;
use ndb_common::db::row::opt_id;
use ndb_common::{time, Result};
use sqlx::{Executor, Sqlite, SqlitePool};
use std::collections::HashMap;
use uuid::Uuid;

/// Current search neurons keyed by id
pub async fn fetch_neurons(pool: &SqlitePool) -> Result<HashMap<Uuid, SearchNeuron>> {
    let rows = sqlx::query(
        "SELECT id, id_number, id_string, tag, keywords, x, y, z, doi, consensus, search_scope, \
         brain_area_id, sample_id, manual_soma_compartment_id, legacy_soma_ids, updated_at FROM neuron",
    )
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|r| SearchNeuron::from_row(r).map(|n| (n.id, n)))
        .collect()
}

pub async fn upsert_neuron<'e, E>(executor: E, neuron: &SearchNeuron) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO neuron (id, id_number, id_string, tag, keywords, x, y, z, doi, consensus, search_scope,
                            brain_area_id, sample_id, manual_soma_compartment_id, legacy_soma_ids, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            id_number = excluded.id_number,
            id_string = excluded.id_string,
            tag = excluded.tag,
            keywords = excluded.keywords,
            x = excluded.x,
            y = excluded.y,
            z = excluded.z,
            doi = excluded.doi,
            consensus = excluded.consensus,
            search_scope = excluded.search_scope,
            brain_area_id = excluded.brain_area_id,
            sample_id = excluded.sample_id,
            manual_soma_compartment_id = excluded.manual_soma_compartment_id,
            legacy_soma_ids = excluded.legacy_soma_ids,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(neuron.id.to_string())
    .bind(neuron.id_number)
    .bind(&neuron.id_string)
    .bind(&neuron.tag)
    .bind(&neuron.keywords)
    .bind(neuron.x)
    .bind(neuron.y)
    .bind(neuron.z)
    .bind(&neuron.doi)
    .bind(neuron.consensus)
    .bind(neuron.search_scope.code())
    .bind(opt_id(neuron.brain_area_id))
    .bind(neuron.sample_id.to_string())
    .bind(opt_id(neuron.manual_soma_compartment_id))
    .bind(&neuron.legacy_soma_ids)
    .bind(time::to_db(&neuron.updated_at))
    .execute(executor)
    .await?;

    Ok(())
}

/// Delete neurons by id in one transaction; their tracings and content must already be gone
pub async fn delete_neurons(pool: &SqlitePool, ids: &[Uuid]) -> Result<u64> {
    if ids.is_empty() {
        return Ok(0);
    }
    let mut tx = pool.begin().await?;
    let removed = delete_where_in(&mut *tx, "neuron", "id", ids).await?;
    tx.commit().await?;
    Ok(removed)
}
