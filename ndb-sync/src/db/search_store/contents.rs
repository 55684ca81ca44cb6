//! Derived compartment content tables, one per atlas version

use super::delete_where_in;
use crate::models::CompartmentContent;
use ndb_common::db::row::opt_id;
use ndb_common::{AtlasVersion, Result};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use uuid::Uuid;

const CONTENT_COLUMNS: &str = "id, tracing_id, neuron_id, brain_area_id, neuron_id_string, neuron_doi, \
     neuron_consensus, manual_soma_compartment_id, legacy_soma_ids, search_scope, soma_x, soma_y, soma_z, \
     node_count, soma_count, path_count, branch_count, end_count";

/// Delete every content row of the given tracings
pub async fn delete_for_tracings(pool: &SqlitePool, version: AtlasVersion, tracing_ids: &[Uuid]) -> Result<u64> {
    if tracing_ids.is_empty() {
        return Ok(0);
    }
    let mut tx = pool.begin().await?;
    let removed = delete_where_in(&mut *tx, version.search_content_table(), "tracing_id", tracing_ids).await?;
    tx.commit().await?;
    Ok(removed)
}

/// Delete content rows referencing removed tracings or removed neurons
pub async fn delete_for_removed(
    pool: &SqlitePool,
    version: AtlasVersion,
    tracing_ids: &[Uuid],
    neuron_ids: &[Uuid],
) -> Result<u64> {
    if tracing_ids.is_empty() && neuron_ids.is_empty() {
        return Ok(0);
    }
    let table = version.search_content_table();
    let mut tx = pool.begin().await?;
    let mut removed = delete_where_in(&mut *tx, table, "tracing_id", tracing_ids).await?;
    removed += delete_where_in(&mut *tx, table, "neuron_id", neuron_ids).await?;
    tx.commit().await?;
    Ok(removed)
}

/// Insert one batch of content rows in a single transaction
pub async fn insert_contents(pool: &SqlitePool, version: AtlasVersion, rows: &[CompartmentContent]) -> Result<u64> {
    if rows.is_empty() {
        return Ok(0);
    }
    let mut tx = pool.begin().await?;
    let inserted = insert_rows(&mut *tx, version, rows).await?;
    tx.commit().await?;
    Ok(inserted)
}

async fn insert_rows(conn: &mut SqliteConnection, version: AtlasVersion, rows: &[CompartmentContent]) -> Result<u64> {
    // 18 bound columns; stay well under SQLite's variable limit
    let mut inserted = 0;
    for chunk in rows.chunks(500) {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "INSERT INTO {} ({CONTENT_COLUMNS}) ",
            version.search_content_table()
        ));
        builder.push_values(chunk, |mut b, row| {
            b.push_bind(row.id.to_string())
                .push_bind(row.tracing_id.to_string())
                .push_bind(row.neuron_id.to_string())
                .push_bind(row.brain_area_id.to_string())
                .push_bind(row.neuron_id_string.clone())
                .push_bind(row.neuron_doi.clone())
                .push_bind(row.neuron_consensus)
                .push_bind(opt_id(row.manual_soma_compartment_id))
                .push_bind(row.legacy_soma_ids.clone())
                .push_bind(row.search_scope.code())
                .push_bind(row.soma_x)
                .push_bind(row.soma_y)
                .push_bind(row.soma_z)
                .push_bind(row.node_count)
                .push_bind(row.soma_count)
                .push_bind(row.path_count)
                .push_bind(row.branch_count)
                .push_bind(row.end_count);
        });
        inserted += builder.build().execute(&mut *conn).await?.rows_affected();
    }
    Ok(inserted)
}

/// Move a tracing's soma contribution into an explicit compartment
///
/// In one transaction: every row of the tracing outside `target` that holds
/// soma nodes loses them from both `soma_count` and `node_count`, and the
/// `target` row gains the same amount, created when missing. The tracing's
/// total `node_count` is unchanged. Returns the number of soma nodes moved.
pub async fn reallocate_soma(
    pool: &SqlitePool,
    version: AtlasVersion,
    tracing_id: Uuid,
    target: Uuid,
) -> Result<i64> {
    let table = version.search_content_table();
    let tracing = tracing_id.to_string();
    let target_id = target.to_string();

    let mut tx = pool.begin().await?;

    let select = format!(
        "SELECT {CONTENT_COLUMNS} FROM {table} WHERE tracing_id = ? AND soma_count > 0 AND brain_area_id != ?"
    );
    let rows = sqlx::query(&select)
        .bind(&tracing)
        .bind(&target_id)
        .fetch_all(&mut *tx)
        .await?;
    let sources = rows
        .iter()
        .map(CompartmentContent::from_row)
        .collect::<Result<Vec<_>>>()?;

    let Some(template) = sources.first() else {
        return Ok(0);
    };
    let moved: i64 = sources.iter().map(|row| row.soma_count).sum();

    let release = format!(
        "UPDATE {table} SET node_count = node_count - soma_count, soma_count = 0 \
         WHERE tracing_id = ? AND soma_count > 0 AND brain_area_id != ?"
    );
    sqlx::query(&release)
        .bind(&tracing)
        .bind(&target_id)
        .execute(&mut *tx)
        .await?;

    let absorb = format!(
        "UPDATE {table} SET node_count = node_count + ?1, soma_count = soma_count + ?1 \
         WHERE tracing_id = ?2 AND brain_area_id = ?3"
    );
    let absorbed = sqlx::query(&absorb)
        .bind(moved)
        .bind(&tracing)
        .bind(&target_id)
        .execute(&mut *tx)
        .await?;

    if absorbed.rows_affected() == 0 {
        let created = CompartmentContent {
            id: ndb_common::uuid_utils::generate(),
            brain_area_id: target,
            node_count: moved,
            soma_count: moved,
            path_count: 0,
            branch_count: 0,
            end_count: 0,
            ..template.clone()
        };
        insert_rows(&mut *tx, version, std::slice::from_ref(&created)).await?;
    }

    tx.commit().await?;
    Ok(moved)
}

/// All content rows of one tracing, ordered by compartment
pub async fn fetch_for_tracing(
    pool: &SqlitePool,
    version: AtlasVersion,
    tracing_id: Uuid,
) -> Result<Vec<CompartmentContent>> {
    let sql = format!(
        "SELECT {CONTENT_COLUMNS} FROM {} WHERE tracing_id = ? ORDER BY brain_area_id",
        version.search_content_table()
    );
    let rows = sqlx::query(&sql)
        .bind(tracing_id.to_string())
        .fetch_all(pool)
        .await?;
    rows.iter().map(CompartmentContent::from_row).collect()
}
