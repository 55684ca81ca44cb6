//! Upstream store seeding
//!
//! A tracing seeded through [`Catalog::insert_tracing`] has one soma node
//! (sample number 1, parent -1) followed by a chain of axon nodes, with
//! matching pre-aggregated compartment rows in both atlas versions.

use anyhow::Result;
use chrono::{DateTime, Duration, TimeZone, Utc};
use ndb_common::{time, AtlasVersion, Sharing};
use ndb_sync::Stores;
use uuid::Uuid;

/// Fixed timestamp `minutes` after the fixture epoch
pub fn t(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minutes)
}

/// Reference rows shared by every fixture
pub struct Catalog {
    pub root: Uuid,
    pub grey: Uuid,
    pub cortex: Uuid,
    pub thalamus: Uuid,
    pub strain: Uuid,
    pub soma: Uuid,
    pub axon: Uuid,
    pub axon_structure: Uuid,
}

pub struct TracingSpec {
    pub node_count: i64,
    pub soma_v25: Option<Uuid>,
    pub soma_v30: Option<Uuid>,
    /// Region of every non-soma node, in both versions
    pub arbor_region: Uuid,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
pub struct TracingIds {
    pub raw: Uuid,
    pub registered: Uuid,
    pub soma_node: Uuid,
}

impl Catalog {
    pub async fn seed(stores: &Stores) -> Result<Self> {
        let catalog = Self {
            root: Uuid::new_v4(),
            grey: Uuid::new_v4(),
            cortex: Uuid::new_v4(),
            thalamus: Uuid::new_v4(),
            strain: Uuid::new_v4(),
            soma: Uuid::new_v4(),
            axon: Uuid::new_v4(),
            axon_structure: Uuid::new_v4(),
        };

        for (id, structure_id, path, name) in [
            (catalog.root, 997, "/997/", "root"),
            (catalog.grey, 8, "/997/8/", "Basic cell groups and regions"),
            (catalog.cortex, 567, "/997/8/567/", "Cerebrum"),
            (catalog.thalamus, 549, "/997/8/549/", "Thalamus"),
        ] {
            sqlx::query(
                "INSERT INTO brain_area (id, structure_id, depth, name, structure_id_path, updated_at) \
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(id.to_string())
            .bind(structure_id)
            .bind(path.matches('/').count() as i64 - 2)
            .bind(name)
            .bind(path)
            .bind(time::to_db(&t(0)))
            .execute(&stores.sample)
            .await?;
        }

        sqlx::query("INSERT INTO mouse_strain (id, name, updated_at) VALUES (?, 'C57BL/6J', ?)")
            .bind(catalog.strain.to_string())
            .bind(time::to_db(&t(0)))
            .execute(&stores.sample)
            .await?;

        for (id, name, value) in [(catalog.soma, "soma", 1), (catalog.axon, "axon", 2)] {
            sqlx::query("INSERT INTO structure_identifier (id, name, value, mutable, updated_at) VALUES (?, ?, ?, 0, ?)")
                .bind(id.to_string())
                .bind(name)
                .bind(value)
                .bind(time::to_db(&t(0)))
                .execute(&stores.raw_tracing)
                .await?;
        }

        sqlx::query("INSERT INTO tracing_structure (id, name, value, updated_at) VALUES (?, 'axon', 1, ?)")
            .bind(catalog.axon_structure.to_string())
            .bind(time::to_db(&t(0)))
            .execute(&stores.raw_tracing)
            .await?;

        Ok(catalog)
    }

    /// Insert a sample with one injection; returns (sample id, injection id)
    pub async fn insert_sample(&self, stores: &Stores, sharing: Sharing, updated_at: DateTime<Utc>) -> Result<(Uuid, Uuid)> {
        let sample = Uuid::new_v4();
        let injection = Uuid::new_v4();

        sqlx::query(
            "INSERT INTO sample (id, id_number, animal_id, sharing, mouse_strain_id, updated_at) \
             VALUES (?, 1, 'A-1', ?, ?, ?)",
        )
        .bind(sample.to_string())
        .bind(sharing.code())
        .bind(self.strain.to_string())
        .bind(time::to_db(&updated_at))
        .execute(&stores.sample)
        .await?;

        sqlx::query("INSERT INTO injection (id, sample_id, brain_area_id, updated_at) VALUES (?, ?, ?, ?)")
            .bind(injection.to_string())
            .bind(sample.to_string())
            .bind(self.cortex.to_string())
            .bind(time::to_db(&updated_at))
            .execute(&stores.sample)
            .await?;

        Ok((sample, injection))
    }

    pub async fn insert_neuron(
        &self,
        stores: &Stores,
        injection: Uuid,
        sharing: Sharing,
        brain_area: Option<Uuid>,
        metadata: Option<&str>,
        updated_at: DateTime<Utc>,
    ) -> Result<Uuid> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO neuron (id, id_number, id_string, doi, consensus, sharing, metadata, brain_area_id, \
             injection_id, updated_at) VALUES (?, 1, ?, '10.25378/janelia.1', 1, ?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(format!("AA{}", &id.simple().to_string()[..4]))
        .bind(sharing.code())
        .bind(metadata)
        .bind(brain_area.map(|b| b.to_string()))
        .bind(injection.to_string())
        .bind(time::to_db(&updated_at))
        .execute(&stores.sample)
        .await?;
        Ok(id)
    }

    pub async fn insert_tracing(&self, stores: &Stores, neuron: Uuid, spec: TracingSpec) -> Result<TracingIds> {
        let ids = TracingIds {
            raw: Uuid::new_v4(),
            registered: Uuid::new_v4(),
            soma_node: Uuid::new_v4(),
        };
        let stamp = time::to_db(&spec.updated_at);

        sqlx::query(
            "INSERT INTO swc_tracing (id, neuron_id, tracing_structure_id, filename, updated_at) \
             VALUES (?, ?, ?, 'tracing.swc', ?)",
        )
        .bind(ids.raw.to_string())
        .bind(neuron.to_string())
        .bind(self.axon_structure.to_string())
        .bind(&stamp)
        .execute(&stores.raw_tracing)
        .await?;

        sqlx::query(
            "INSERT INTO tracing (id, swc_tracing_id, node_count, path_count, branch_count, end_count, updated_at) \
             VALUES (?, ?, ?, ?, 0, 1, ?)",
        )
        .bind(ids.registered.to_string())
        .bind(ids.raw.to_string())
        .bind(spec.node_count)
        .bind(spec.node_count - 1)
        .bind(&stamp)
        .execute(&stores.registered_tracing)
        .await?;

        self.insert_nodes(stores, ids, &spec).await?;
        self.insert_aggregates(stores, ids.registered, &spec).await?;

        Ok(ids)
    }

    /// Replace the nodes and aggregates of a registered tracing and bump its stamp
    pub async fn replace_tracing_geometry(&self, stores: &Stores, ids: TracingIds, spec: TracingSpec) -> Result<TracingIds> {
        let registered = ids.registered.to_string();
        sqlx::query("DELETE FROM tracing_node WHERE tracing_id = ?")
            .bind(&registered)
            .execute(&stores.registered_tracing)
            .await?;
        for version in AtlasVersion::ALL {
            sqlx::query(&format!("DELETE FROM {} WHERE tracing_id = ?", version.source_content_table()))
                .bind(&registered)
                .execute(&stores.registered_tracing)
                .await?;
        }
        sqlx::query("UPDATE tracing SET node_count = ?, path_count = ?, updated_at = ? WHERE id = ?")
            .bind(spec.node_count)
            .bind(spec.node_count - 1)
            .bind(time::to_db(&spec.updated_at))
            .bind(&registered)
            .execute(&stores.registered_tracing)
            .await?;

        let ids = TracingIds {
            soma_node: Uuid::new_v4(),
            ..ids
        };
        self.insert_nodes(stores, ids, &spec).await?;
        self.insert_aggregates(stores, ids.registered, &spec).await?;
        Ok(ids)
    }

    async fn insert_nodes(&self, stores: &Stores, ids: TracingIds, spec: &TracingSpec) -> Result<()> {
        let stamp = time::to_db(&spec.updated_at);
        for sample_number in 1..=spec.node_count {
            let is_soma = sample_number == 1;
            let (node_id, structure, v25, v30) = if is_soma {
                (ids.soma_node, self.soma, spec.soma_v25, spec.soma_v30)
            } else {
                (Uuid::new_v4(), self.axon, Some(spec.arbor_region), Some(spec.arbor_region))
            };
            sqlx::query(
                "INSERT INTO tracing_node (id, tracing_id, sample_number, parent_number, x, y, z, \
                 structure_identifier_id, brain_area_id_ccf_v25, brain_area_id_ccf_v30, updated_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(node_id.to_string())
            .bind(ids.registered.to_string())
            .bind(sample_number)
            .bind(if is_soma { -1 } else { sample_number - 1 })
            .bind(sample_number as f64 * 10.0)
            .bind(5000.0)
            .bind(400.0)
            .bind(structure.to_string())
            .bind(v25.map(|r| r.to_string()))
            .bind(v30.map(|r| r.to_string()))
            .bind(&stamp)
            .execute(&stores.registered_tracing)
            .await?;
        }
        Ok(())
    }

    /// One soma row (when the version has a soma region) plus one arbor row,
    /// merged when both land in the same compartment
    async fn insert_aggregates(&self, stores: &Stores, tracing: Uuid, spec: &TracingSpec) -> Result<()> {
        let stamp = time::to_db(&spec.updated_at);
        for (version, soma_region) in [(AtlasVersion::CcfV25, spec.soma_v25), (AtlasVersion::CcfV30, spec.soma_v30)] {
            let arbor_nodes = spec.node_count - 1;
            let mut rows: Vec<(Uuid, i64, i64, i64)> = Vec::new(); // region, nodes, somas, ends
            match soma_region {
                Some(region) if region == spec.arbor_region => rows.push((region, spec.node_count, 1, 1)),
                Some(region) => {
                    rows.push((region, 1, 1, 0));
                    rows.push((spec.arbor_region, arbor_nodes, 0, 1));
                }
                None => rows.push((spec.arbor_region, arbor_nodes, 0, 1)),
            }

            for (region, nodes, somas, ends) in rows {
                sqlx::query(&format!(
                    "INSERT INTO {} (id, tracing_id, brain_area_id, node_count, soma_count, path_count, \
                     branch_count, end_count, updated_at) VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?)",
                    version.source_content_table()
                ))
                .bind(Uuid::new_v4().to_string())
                .bind(tracing.to_string())
                .bind(region.to_string())
                .bind(nodes)
                .bind(somas)
                .bind(nodes - somas)
                .bind(ends)
                .bind(&stamp)
                .execute(&stores.registered_tracing)
                .await?;
            }
        }
        Ok(())
    }

    pub async fn set_sample_sharing(&self, stores: &Stores, sample: Uuid, sharing: Sharing, updated_at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE sample SET sharing = ?, updated_at = ? WHERE id = ?")
            .bind(sharing.code())
            .bind(time::to_db(&updated_at))
            .bind(sample.to_string())
            .execute(&stores.sample)
            .await?;
        Ok(())
    }

    pub async fn set_neuron_sharing(&self, stores: &Stores, neuron: Uuid, sharing: Sharing, updated_at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE neuron SET sharing = ?, updated_at = ? WHERE id = ?")
            .bind(sharing.code())
            .bind(time::to_db(&updated_at))
            .bind(neuron.to_string())
            .execute(&stores.sample)
            .await?;
        Ok(())
    }
}

impl TracingSpec {
    /// `node_count` nodes, soma in `soma_region` for both versions
    pub fn new(node_count: i64, soma_region: Uuid, arbor_region: Uuid) -> Self {
        Self {
            node_count,
            soma_v25: Some(soma_region),
            soma_v30: Some(soma_region),
            arbor_region,
            updated_at: t(0),
        }
    }
}
