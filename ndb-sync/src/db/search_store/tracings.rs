use super::delete_where_in;
use crate::db::{push_id_list, MAX_IN_LIST};
use crate::models::SearchTracing;
use ndb_common::db::row::opt_id;
use ndb_common::{time, AtlasVersion, Result};
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::collections::HashMap;
use uuid::Uuid;

/// `updated_at` of a tracing whose rewrite has not finished
///
/// Older than any real stamp, so a tracing left pending by an aborted run is
/// rewritten by the next one.
pub const PENDING_STAMP: &str = "1970-01-01T00:00:00Z";

/// Current search tracings keyed by id
pub async fn fetch_tracings(pool: &SqlitePool) -> Result<HashMap<Uuid, SearchTracing>> {
    let rows = sqlx::query(
        "SELECT id, neuron_id, tracing_structure_id, swc_tracing_id, node_count, path_count, branch_count, \
         end_count, transformed_at, search_scope, soma_id, updated_at FROM tracing",
    )
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|r| SearchTracing::from_row(r).map(|t| (t.id, t)))
        .collect()
}

/// Ids of search tracings owned by the given neurons
pub async fn tracing_ids_for_neurons(pool: &SqlitePool, neuron_ids: &[Uuid]) -> Result<Vec<Uuid>> {
    let mut ids = Vec::new();
    for chunk in neuron_ids.chunks(MAX_IN_LIST) {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT id FROM tracing WHERE neuron_id IN ");
        push_id_list(&mut builder, chunk);
        let found: Vec<String> = builder.build_query_scalar::<String>().fetch_all(pool).await?;
        for id in &found {
            ids.push(ndb_common::uuid_utils::parse(id)?);
        }
    }
    Ok(ids)
}

/// Replace one tracing and clear everything derived from its old nodes
///
/// Runs as one transaction: the soma back-reference is cleared, content rows
/// for both atlas versions and all nodes are deleted, then the tracing row is
/// upserted with `soma_id` left null for the soma stage to fill in and
/// `updated_at` set to [`PENDING_STAMP`] until its content is rebuilt.
pub async fn rewrite_tracing(pool: &SqlitePool, tracing: &SearchTracing) -> Result<()> {
    let id = tracing.id.to_string();
    let mut tx = pool.begin().await?;

    sqlx::query("UPDATE tracing SET soma_id = NULL WHERE id = ? AND soma_id IS NOT NULL")
        .bind(&id)
        .execute(&mut *tx)
        .await?;

    for version in AtlasVersion::ALL {
        let sql = format!("DELETE FROM {} WHERE tracing_id = ?", version.search_content_table());
        sqlx::query(&sql).bind(&id).execute(&mut *tx).await?;
    }

    sqlx::query("DELETE FROM tracing_node WHERE tracing_id = ?")
        .bind(&id)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        r#"
        INSERT INTO tracing (id, neuron_id, tracing_structure_id, swc_tracing_id, node_count, path_count,
                             branch_count, end_count, transformed_at, search_scope, soma_id, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, NULL, ?)
        ON CONFLICT(id) DO UPDATE SET
            neuron_id = excluded.neuron_id,
            tracing_structure_id = excluded.tracing_structure_id,
            swc_tracing_id = excluded.swc_tracing_id,
            node_count = excluded.node_count,
            path_count = excluded.path_count,
            branch_count = excluded.branch_count,
            end_count = excluded.end_count,
            transformed_at = excluded.transformed_at,
            search_scope = excluded.search_scope,
            soma_id = NULL,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&id)
    .bind(tracing.neuron_id.to_string())
    .bind(opt_id(tracing.tracing_structure_id))
    .bind(opt_id(tracing.swc_tracing_id))
    .bind(tracing.node_count)
    .bind(tracing.path_count)
    .bind(tracing.branch_count)
    .bind(tracing.end_count)
    .bind(tracing.transformed_at.as_ref().map(time::to_db))
    .bind(tracing.search_scope.code())
    .bind(PENDING_STAMP)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

/// Flag every search tracing of the given neurons as pending
///
/// Done before those neurons are rewritten so the dependent tracings are
/// rediscovered from stored state if the run stops in between.
pub async fn mark_pending_for_neurons(pool: &SqlitePool, neuron_ids: &[Uuid]) -> Result<u64> {
    if neuron_ids.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    let mut marked = 0;
    for chunk in neuron_ids.chunks(MAX_IN_LIST) {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE tracing SET updated_at = ");
        builder.push_bind(PENDING_STAMP);
        builder.push(" WHERE updated_at != ");
        builder.push_bind(PENDING_STAMP);
        builder.push(" AND neuron_id IN ");
        push_id_list(&mut builder, chunk);
        marked += builder.build().execute(&mut *tx).await?.rows_affected();
    }
    tx.commit().await?;
    Ok(marked)
}

/// Record the real change stamps of finished tracings in one transaction
pub async fn mark_complete(pool: &SqlitePool, completed: &[(Uuid, DateTime<Utc>)]) -> Result<u64> {
    if completed.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    let mut marked = 0;
    for (tracing_id, stamp) in completed {
        marked += sqlx::query("UPDATE tracing SET updated_at = ? WHERE id = ?")
            .bind(time::to_db(stamp))
            .bind(tracing_id.to_string())
            .execute(&mut *tx)
            .await?
            .rows_affected();
    }
    tx.commit().await?;
    Ok(marked)
}

/// Point a tracing at its soma node; no write when already set
pub async fn set_soma_id(pool: &SqlitePool, tracing_id: Uuid, soma_id: Uuid) -> Result<bool> {
    let result = sqlx::query("UPDATE tracing SET soma_id = ? WHERE id = ? AND soma_id IS NOT ?")
        .bind(soma_id.to_string())
        .bind(tracing_id.to_string())
        .bind(soma_id.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete tracings with their nodes, breaking the soma cycle first
///
/// Content rows must already be gone. Returns (tracings, nodes) removed.
pub async fn delete_tracings(pool: &SqlitePool, ids: &[Uuid]) -> Result<(u64, u64)> {
    if ids.is_empty() {
        return Ok((0, 0));
    }

    let mut tx = pool.begin().await?;

    for chunk in ids.chunks(MAX_IN_LIST) {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("UPDATE tracing SET soma_id = NULL WHERE soma_id IS NOT NULL AND id IN ");
        push_id_list(&mut builder, chunk);
        builder.build().execute(&mut *tx).await?;
    }

    let nodes = delete_where_in(&mut *tx, "tracing_node", "tracing_id", ids).await?;
    let tracings = delete_where_in(&mut *tx, "tracing", "id", ids).await?;

    tx.commit().await?;
    Ok((tracings, nodes))
}
