//! Stage 2: NEURONS
//!
//! Region resolution: the explicit region when set, else the soma node's
//! v3.0 region, else its v2.5 region. Annotation overrides map structure
//! ids to compartments.
//!
//! A search neuron's `updated_at` is the later of the neuron's and its
//! sample's stamps, so a sample change that has to reach the neuron is
//! still visible after an aborted run.

use super::context::{NeuronStage, SampleStage, Upstream};
use super::{Reconciler, RunStatistics};
use crate::db::registered_store;
use crate::db::search_store::{neurons, tracings};
use crate::models::{Neuron, SearchNeuron};
use crate::services::annotations::{self, SomaOverrides};
use crate::services::{CompartmentCache, VisibilityResolver};
use crate::utils::retry_on_lock;
use chrono::{DateTime, Utc};
use ndb_common::{Error, Result, Visibility};
use std::collections::HashMap;
use uuid::Uuid;

/// A qualifying neuron that needs a write this run
struct PendingNeuron<'a> {
    neuron: &'a Neuron,
    visibility: Visibility,
    sample_id: Uuid,
    stamp: DateTime<Utc>,
}

impl Reconciler {
    pub(super) async fn phase_neurons(
        &self,
        upstream: &Upstream,
        samples: &SampleStage,
        compartments: &CompartmentCache,
        soma_structure: Option<Uuid>,
        stats: &mut RunStatistics,
    ) -> Result<NeuronStage> {
        let mut stage = NeuronStage::default();
        let existing: HashMap<Uuid, SearchNeuron> = neurons::fetch_neurons(&self.stores.search).await?;

        let mut candidates: Vec<(&Uuid, &Visibility)> = samples.qualifying_neurons.iter().collect();
        candidates.sort();

        let mut pending: Vec<PendingNeuron> = Vec::new();
        for (id, visibility) in candidates {
            let Some(neuron) = upstream.neurons.get(id) else { continue };
            let Some(sample) = neuron.sample_id.and_then(|sid| upstream.samples.get(&sid)) else {
                continue;
            };
            let stamp = neuron.updated_at.max(sample.updated_at);

            if let Some(region) = neuron.brain_area_id {
                stage.explicit_regions.insert(neuron.id, region);
            }

            if let Some(row) = existing.get(&neuron.id) {
                let unchanged = !self.options.force_update
                    && stamp <= row.updated_at
                    && !samples.updated.contains(&sample.id);
                if unchanged {
                    stats.neurons_reused += 1;
                    stage.qualifying.insert(neuron.id, row.clone());
                    continue;
                }
            }

            pending.push(PendingNeuron {
                neuron,
                visibility: *visibility,
                sample_id: sample.id,
                stamp,
            });
        }

        let tracings_by_neuron = upstream.registered_by_neuron();
        let soma_regions = self
            .soma_regions(&pending, &tracings_by_neuron, soma_structure)
            .await?;

        let rewritten: Vec<Uuid> = pending
            .iter()
            .map(|p| p.neuron.id)
            .filter(|id| existing.contains_key(id))
            .collect();
        let invalidated = retry_on_lock("tracing invalidation", self.options.max_lock_wait_ms, || {
            tracings::mark_pending_for_neurons(&self.stores.search, &rewritten)
        })
        .await?;
        if invalidated > 0 {
            tracing::debug!(tracings = invalidated, "Tracings of rewritten neurons marked pending");
        }

        for PendingNeuron {
            neuron,
            visibility,
            sample_id,
            stamp,
        } in pending
        {
            let brain_area_id = neuron.brain_area_id.or_else(|| {
                tracings_by_neuron
                    .get(&neuron.id)
                    .and_then(|ids| ids.iter().find_map(|t| soma_regions.get(t).copied()))
            });
            if brain_area_id.is_none() {
                stats.integrity_warning(Error::dangling("neuron", neuron.id, "soma region"));
            }

            let overrides = match annotations::parse_annotations(neuron.metadata.as_deref()) {
                Ok(Some(parsed)) => annotations::resolve_overrides(neuron.id, &parsed, compartments)?,
                Ok(None) => SomaOverrides::default(),
                Err(e) => {
                    stats.integrity_warning(Error::Validation(format!(
                        "neuron {} has unreadable annotation metadata: {}",
                        neuron.id, e
                    )));
                    SomaOverrides::default()
                }
            };

            let row = SearchNeuron {
                id: neuron.id,
                id_number: neuron.id_number,
                id_string: neuron.id_string.clone(),
                tag: neuron.tag.clone(),
                keywords: neuron.keywords.clone(),
                x: neuron.x,
                y: neuron.y,
                z: neuron.z,
                doi: neuron.doi.clone(),
                consensus: neuron.consensus,
                search_scope: VisibilityResolver::scope(Some(visibility)),
                brain_area_id,
                sample_id,
                manual_soma_compartment_id: overrides.manual_soma_compartment_id,
                legacy_soma_ids: overrides.legacy_soma_ids,
                updated_at: stamp,
            };
            retry_on_lock("neuron upsert", self.options.max_lock_wait_ms, || {
                neurons::upsert_neuron(&self.stores.search, &row)
            })
            .await?;

            tracing::debug!(neuron_id = %row.id, brain_area_id = ?row.brain_area_id, "Neuron written");
            stats.neurons_written += 1;
            stage.required.insert(row.id);
            stage.qualifying.insert(row.id, row);
        }

        stage.removed = existing
            .keys()
            .filter(|id| !stage.qualifying.contains_key(id))
            .copied()
            .collect();
        stage.removed.sort();

        tracing::info!(
            qualifying = stage.qualifying.len(),
            written = stats.neurons_written,
            reused = stats.neurons_reused,
            explicit_regions = stage.explicit_regions.len(),
            removed = stage.removed.len(),
            "Stage 2: neurons reconciled"
        );

        Ok(stage)
    }

    /// Soma-derived region per registered tracing of neurons lacking an explicit region
    async fn soma_regions(
        &self,
        pending: &[PendingNeuron<'_>],
        tracings_by_neuron: &HashMap<Uuid, Vec<Uuid>>,
        soma_structure: Option<Uuid>,
    ) -> Result<HashMap<Uuid, Uuid>> {
        let Some(soma_structure) = soma_structure else {
            return Ok(HashMap::new());
        };

        let tracing_ids: Vec<Uuid> = pending
            .iter()
            .filter(|p| p.neuron.brain_area_id.is_none())
            .filter_map(|p| tracings_by_neuron.get(&p.neuron.id))
            .flatten()
            .copied()
            .collect();
        if tracing_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let somas =
            registered_store::fetch_soma_nodes(&self.stores.registered_tracing, &tracing_ids, soma_structure).await?;

        Ok(somas
            .iter()
            .filter_map(|soma| soma.preferred_region().map(|region| (soma.tracing_id, region)))
            .collect())
    }
}
