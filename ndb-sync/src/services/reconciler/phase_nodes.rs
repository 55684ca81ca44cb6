//! Stage 4: NODES
//!
//! Copies the nodes of every changed tracing in keyset windows of
//! `node_batch_size` rows, one transaction per window. The soma nodes of
//! neurons with an explicit region are then patched to that region in both
//! atlas columns.

use super::context::{NeuronStage, NodeStage, TracingStage};
use super::{Reconciler, RunStatistics};
use crate::db::search_store::nodes;
use crate::db::{registered_store, MAX_IN_LIST};
use crate::utils::retry_on_lock;
use ndb_common::Result;
use uuid::Uuid;

impl Reconciler {
    pub(super) async fn phase_nodes(
        &self,
        tracings: &TracingStage,
        neurons: &NeuronStage,
        soma_structure: Option<Uuid>,
        stats: &mut RunStatistics,
    ) -> Result<NodeStage> {
        let batch_size = self.options.node_batch_size.max(1);
        let max_lock_wait_ms = self.options.max_lock_wait_ms;
        let search = &self.stores.search;
        let mut windows = 0usize;

        for tracing_ids in tracings.changed.chunks(MAX_IN_LIST) {
            let mut after: Option<String> = None;

            loop {
                let window = registered_store::fetch_node_window(
                    &self.stores.registered_tracing,
                    tracing_ids,
                    after.as_deref(),
                    batch_size,
                )
                .await?;
                let last_window = window.len() < batch_size;

                let inserted =
                    retry_on_lock("node copy", max_lock_wait_ms, || nodes::insert_nodes(search, &window)).await?;
                stats.nodes_copied += inserted;
                windows += 1;

                if last_window {
                    break;
                }
                after = window.last().map(|node| node.id.to_string());
            }
        }

        let somas = match soma_structure {
            Some(soma_structure) => nodes::fetch_soma_nodes(search, soma_structure).await?,
            None => Vec::new(),
        };

        for soma in &somas {
            let Some(entry) = tracings.qualifying.get(&soma.tracing_id) else {
                continue;
            };
            let Some(region) = neurons.explicit_regions.get(&entry.neuron_id) else {
                continue;
            };
            let patched = retry_on_lock("soma region patch", max_lock_wait_ms, || {
                nodes::patch_node_region(search, soma.id, *region)
            })
            .await?;
            if patched {
                tracing::debug!(tracing_id = %soma.tracing_id, node_id = %soma.id, region = %region, "Soma region patched");
                stats.soma_regions_patched += 1;
            }
        }

        tracing::info!(
            tracings = tracings.changed.len(),
            windows,
            nodes = stats.nodes_copied,
            patched = stats.soma_regions_patched,
            "Stage 4: nodes copied"
        );

        Ok(NodeStage { somas })
    }
}
