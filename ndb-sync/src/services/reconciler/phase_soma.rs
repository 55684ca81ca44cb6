//! Stage 5: SOMA INDEX
//!
//! Links every qualifying tracing to its soma node and indexes the soma
//! positions for content building.

use super::context::{NodeStage, SomaIndex, TracingStage};
use super::{Reconciler, RunStatistics};
use crate::db::search_store::tracings;
use crate::utils::retry_on_lock;
use ndb_common::{Error, Result};
use uuid::Uuid;

impl Reconciler {
    pub(super) async fn phase_soma(
        &self,
        tracing_stage: &TracingStage,
        nodes: NodeStage,
        stats: &mut RunStatistics,
    ) -> Result<SomaIndex> {
        let mut index = SomaIndex::with_capacity(nodes.somas.len());

        for soma in nodes.somas {
            let Some(entry) = tracing_stage.qualifying.get(&soma.tracing_id) else {
                continue;
            };
            if entry.soma_id != Some(soma.id) {
                let linked = retry_on_lock("soma link", self.options.max_lock_wait_ms, || {
                    tracings::set_soma_id(&self.stores.search, soma.tracing_id, soma.id)
                })
                .await?;
                if linked {
                    stats.soma_links_set += 1;
                }
            }
            index.insert(soma.tracing_id, soma);
        }

        let mut missing: Vec<Uuid> = tracing_stage
            .qualifying
            .keys()
            .filter(|id| !index.contains_key(id))
            .copied()
            .collect();
        missing.sort();
        for tracing_id in missing {
            stats.integrity_warning(Error::dangling("tracing", tracing_id, "soma node"));
        }

        tracing::info!(
            indexed = index.len(),
            linked = stats.soma_links_set,
            "Stage 5: soma index built"
        );

        Ok(index)
    }
}
