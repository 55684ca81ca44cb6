//! Stages 6 and 7: TRIGGER SET and DERIVED CONTENT
//!
//! Runs once per atlas version. Content rows of triggered tracings are
//! rebuilt from the pre-aggregated upstream counts, then soma counts of
//! neurons with an explicit region are moved into that region.

use super::context::{NeuronStage, SomaIndex, TracingStage, TriggerSet};
use super::{Reconciler, RunStatistics};
use crate::db::registered_store;
use crate::db::search_store::contents;
use crate::models::CompartmentContent;
use crate::utils::retry_on_lock;
use ndb_common::{uuid_utils, AtlasVersion, Result};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use uuid::Uuid;

/// Changed tracings plus every qualifying tracing of a rewritten neuron
pub(super) fn trigger_set(tracings: &TracingStage, neurons: &NeuronStage) -> TriggerSet {
    let mut trigger: BTreeSet<Uuid> = tracings.changed.iter().copied().collect();
    trigger.extend(tracings.tracings_of(&neurons.required));
    trigger.into_iter().collect()
}

impl Reconciler {
    pub(super) async fn phase_content(
        &self,
        version: AtlasVersion,
        trigger: &TriggerSet,
        tracings: &TracingStage,
        neurons: &NeuronStage,
        somas: &SomaIndex,
        stats: &mut RunStatistics,
    ) -> Result<()> {
        if trigger.is_empty() {
            tracing::info!(atlas = %version, "Stage 7: no content to rebuild");
            return Ok(());
        }

        let search = &self.stores.search;
        let max_lock_wait_ms = self.options.max_lock_wait_ms;

        let aggregates =
            registered_store::fetch_compartment_aggregates(&self.stores.registered_tracing, version, trigger).await?;

        retry_on_lock("content clear", max_lock_wait_ms, || {
            contents::delete_for_tracings(search, version, trigger)
        })
        .await?;

        let mut rows: Vec<CompartmentContent> = Vec::with_capacity(aggregates.len());
        let mut skipped: HashSet<Uuid> = HashSet::new();

        for aggregate in &aggregates {
            if skipped.contains(&aggregate.tracing_id) {
                continue;
            }
            let neuron = tracings
                .qualifying
                .get(&aggregate.tracing_id)
                .and_then(|entry| neurons.qualifying.get(&entry.neuron_id));
            let Some(neuron) = neuron else {
                tracing::warn!(atlas = %version, tracing_id = %aggregate.tracing_id, "Content skipped: tracing has no resolvable neuron");
                skipped.insert(aggregate.tracing_id);
                continue;
            };
            let Some(soma) = somas.get(&aggregate.tracing_id) else {
                tracing::warn!(atlas = %version, tracing_id = %aggregate.tracing_id, "Content skipped: tracing has no soma node");
                skipped.insert(aggregate.tracing_id);
                continue;
            };

            rows.push(CompartmentContent {
                id: uuid_utils::generate(),
                tracing_id: aggregate.tracing_id,
                neuron_id: neuron.id,
                brain_area_id: aggregate.brain_area_id,
                neuron_id_string: neuron.id_string.clone(),
                neuron_doi: neuron.doi.clone(),
                neuron_consensus: neuron.consensus,
                manual_soma_compartment_id: neuron.manual_soma_compartment_id,
                legacy_soma_ids: neuron.legacy_soma_ids.clone(),
                search_scope: neuron.search_scope,
                soma_x: soma.x,
                soma_y: soma.y,
                soma_z: soma.z,
                node_count: aggregate.node_count,
                soma_count: aggregate.soma_count,
                path_count: aggregate.path_count,
                branch_count: aggregate.branch_count,
                end_count: aggregate.end_count,
            });
        }

        let mut inserted = 0;
        for batch in rows.chunks(self.options.content_batch_size.max(1)) {
            inserted += retry_on_lock("content insert", max_lock_wait_ms, || {
                contents::insert_contents(search, version, batch)
            })
            .await?;
        }

        // tracing -> explicit region, for rows holding soma nodes elsewhere
        let reallocate: BTreeMap<Uuid, Uuid> = rows
            .iter()
            .filter(|row| row.soma_count > 0)
            .filter_map(|row| {
                neurons
                    .explicit_regions
                    .get(&row.neuron_id)
                    .filter(|region| **region != row.brain_area_id)
                    .map(|region| (row.tracing_id, *region))
            })
            .collect();

        let mut reallocations = 0;
        for (tracing_id, region) in &reallocate {
            let moved = retry_on_lock("soma reallocation", max_lock_wait_ms, || {
                contents::reallocate_soma(search, version, *tracing_id, *region)
            })
            .await?;
            if moved > 0 {
                tracing::debug!(atlas = %version, tracing_id = %tracing_id, region = %region, moved, "Soma count reallocated");
                reallocations += 1;
            }
        }

        let content = stats.content_mut(version);
        content.rows_inserted += inserted;
        content.reallocations += reallocations;
        content.tracings_skipped += skipped.len() as u64;

        tracing::info!(
            atlas = %version,
            tracings = trigger.len(),
            rows = inserted,
            reallocations,
            skipped = skipped.len(),
            "Stage 7: compartment content rebuilt"
        );

        Ok(())
    }
}
