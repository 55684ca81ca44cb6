//! Registered tracing store reads
//!
//! Node reads are paged by id (keyset) so a single window never holds more
//! than `limit` rows in memory.

use super::{push_id_list, MAX_IN_LIST};
use crate::models::{CompartmentAggregate, RegisteredTracing, TracingNode};
use ndb_common::{AtlasVersion, Result};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

pub(crate) const NODE_COLUMNS: &str = "id, tracing_id, sample_number, parent_number, x, y, z, radius, \
     length_to_parent, structure_identifier_id, brain_area_id_ccf_v25, brain_area_id_ccf_v30";

/// All registered tracings, ordered by id
pub async fn fetch_registered_tracings(pool: &SqlitePool) -> Result<Vec<RegisteredTracing>> {
    let rows = sqlx::query(
        "SELECT id, swc_tracing_id, node_count, path_count, branch_count, end_count, \
         transformed_at, updated_at FROM tracing ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(RegisteredTracing::from_row).collect()
}

/// Soma node of each given tracing
///
/// One entry per tracing that has a node typed as soma. When a tracing
/// carries several, the lowest sample number wins.
pub async fn fetch_soma_nodes(
    pool: &SqlitePool,
    tracing_ids: &[Uuid],
    soma_structure_id: Uuid,
) -> Result<Vec<TracingNode>> {
    let mut somas = Vec::new();

    for chunk in tracing_ids.chunks(MAX_IN_LIST) {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {NODE_COLUMNS} FROM tracing_node n \
             WHERE n.structure_identifier_id = "
        ));
        builder.push_bind(soma_structure_id.to_string());
        builder.push(" AND n.tracing_id IN ");
        push_id_list(&mut builder, chunk);
        builder.push(
            " AND n.sample_number = (SELECT MIN(m.sample_number) FROM tracing_node m \
              WHERE m.tracing_id = n.tracing_id AND m.structure_identifier_id = n.structure_identifier_id) \
              ORDER BY n.tracing_id",
        );

        let rows = builder.build().fetch_all(pool).await?;
        for row in &rows {
            let node = TracingNode::from_row(row)?;
            // duplicate sample numbers within one tracing
            if somas.last().map(|s: &TracingNode| s.tracing_id) != Some(node.tracing_id) {
                somas.push(node);
            }
        }
    }

    Ok(somas)
}

/// One keyset window of nodes belonging to the given tracings
///
/// Returns up to `limit` nodes with id greater than `after`, ordered by id.
pub async fn fetch_node_window(
    pool: &SqlitePool,
    tracing_ids: &[Uuid],
    after: Option<&str>,
    limit: usize,
) -> Result<Vec<TracingNode>> {
    if tracing_ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {NODE_COLUMNS} FROM tracing_node WHERE tracing_id IN "));
    push_id_list(&mut builder, tracing_ids);
    if let Some(after) = after {
        builder.push(" AND id > ");
        builder.push_bind(after.to_string());
    }
    builder.push(" ORDER BY id LIMIT ");
    builder.push_bind(i64::try_from(limit).unwrap_or(i64::MAX));

    let rows = builder.build().fetch_all(pool).await?;
    rows.iter().map(TracingNode::from_row).collect()
}

/// Pre-aggregated compartment rows for the given tracings in one atlas version
pub async fn fetch_compartment_aggregates(
    pool: &SqlitePool,
    version: AtlasVersion,
    tracing_ids: &[Uuid],
) -> Result<Vec<CompartmentAggregate>> {
    let mut aggregates = Vec::new();

    for chunk in tracing_ids.chunks(MAX_IN_LIST) {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT tracing_id, brain_area_id, node_count, soma_count, path_count, branch_count, end_count \
             FROM {} WHERE tracing_id IN ",
            version.source_content_table()
        ));
        push_id_list(&mut builder, chunk);
        builder.push(" ORDER BY tracing_id, brain_area_id");

        let rows = builder.build().fetch_all(pool).await?;
        for row in &rows {
            aggregates.push(CompartmentAggregate::from_row(row)?);
        }
    }

    Ok(aggregates)
}
