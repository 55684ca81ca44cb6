use crate::models::{SomaNode, TracingNode};
use ndb_common::db::row::opt_id;
use ndb_common::Result;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

/// Rows per multi-row `INSERT` statement
const ROWS_PER_STATEMENT: usize = 500;

/// Insert one window of copied nodes in a single transaction
pub async fn insert_nodes(pool: &SqlitePool, nodes: &[TracingNode]) -> Result<u64> {
    let mut tx = pool.begin().await?;
    let mut inserted = 0;

    for chunk in nodes.chunks(ROWS_PER_STATEMENT) {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "INSERT INTO tracing_node (id, tracing_id, sample_number, parent_number, x, y, z, radius, \
             length_to_parent, structure_identifier_id, brain_area_id_ccf_v25, brain_area_id_ccf_v30) ",
        );
        builder.push_values(chunk, |mut b, node| {
            b.push_bind(node.id.to_string())
                .push_bind(node.tracing_id.to_string())
                .push_bind(node.sample_number)
                .push_bind(node.parent_number)
                .push_bind(node.x)
                .push_bind(node.y)
                .push_bind(node.z)
                .push_bind(node.radius)
                .push_bind(node.length_to_parent)
                .push_bind(opt_id(node.structure_identifier_id))
                .push_bind(opt_id(node.brain_area_id_ccf_v25))
                .push_bind(opt_id(node.brain_area_id_ccf_v30));
        });
        inserted += builder.build().execute(&mut *tx).await?.rows_affected();
    }

    tx.commit().await?;
    Ok(inserted)
}

/// Soma node of every search tracing
///
/// Lowest sample number wins when a tracing has more than one node typed
/// as soma.
pub async fn fetch_soma_nodes(pool: &SqlitePool, soma_structure_id: Uuid) -> Result<Vec<SomaNode>> {
    let rows = sqlx::query(
        r#"
        SELECT n.id, n.tracing_id, n.x, n.y, n.z
        FROM tracing_node n
        WHERE n.structure_identifier_id = ?1
          AND n.sample_number = (
              SELECT MIN(m.sample_number) FROM tracing_node m
              WHERE m.tracing_id = n.tracing_id AND m.structure_identifier_id = ?1
          )
        ORDER BY n.tracing_id, n.id
        "#,
    )
    .bind(soma_structure_id.to_string())
    .fetch_all(pool)
    .await?;

    let mut somas: Vec<SomaNode> = Vec::with_capacity(rows.len());
    for row in &rows {
        let soma = SomaNode::from_row(row)?;
        if somas.last().map(|s| s.tracing_id) != Some(soma.tracing_id) {
            somas.push(soma);
        }
    }
    Ok(somas)
}

/// Force both atlas region columns of a node to one region
///
/// Returns false when the node already carries that region in both columns.
pub async fn patch_node_region(pool: &SqlitePool, node_id: Uuid, region: Uuid) -> Result<bool> {
    let region = region.to_string();
    let result = sqlx::query(
        "UPDATE tracing_node SET brain_area_id_ccf_v25 = ?1, brain_area_id_ccf_v30 = ?1 \
         WHERE id = ?2 AND (brain_area_id_ccf_v25 IS NOT ?1 OR brain_area_id_ccf_v30 IS NOT ?1)",
    )
    .bind(&region)
    .bind(node_id.to_string())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
