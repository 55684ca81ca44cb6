//! Sample store reads

use crate::models::{Neuron, Sample};
use ndb_common::Result;
use sqlx::SqlitePool;

const SAMPLE_COLUMNS: &str =
    "id, id_number, animal_id, tag, comment, sample_date, sharing, mouse_strain_id, updated_at";

/// All samples, ordered by id
pub async fn fetch_samples(pool: &SqlitePool) -> Result<Vec<Sample>> {
    let sql = format!("SELECT {SAMPLE_COLUMNS} FROM sample ORDER BY id");
    let rows = sqlx::query(&sql).fetch_all(pool).await?;
    rows.iter().map(Sample::from_row).collect()
}

/// All neurons with the sample id of their injection
///
/// A neuron whose injection row is missing comes back with `sample_id = None`.
pub async fn fetch_neurons(pool: &SqlitePool) -> Result<Vec<Neuron>> {
    let rows = sqlx::query(
        r#"
        SELECT n.id, n.id_number, n.id_string, n.tag, n.keywords, n.x, n.y, n.z,
               n.sharing, n.doi, n.consensus, n.metadata, n.brain_area_id,
               n.injection_id, i.sample_id, n.updated_at
        FROM neuron n
        LEFT JOIN injection i ON i.id = n.injection_id
        ORDER BY n.id
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(Neuron::from_row).collect()
}
