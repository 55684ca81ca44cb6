//! Stage 1: SAMPLES
//!
//! A sample qualifies on its own visibility or because one of its neurons
//! qualifies. Unchanged rows are carried forward without a write.

use super::context::{SampleStage, Upstream};
use super::{Reconciler, RunStatistics};
use crate::db::search_store::samples;
use crate::models::SearchSample;
use crate::services::VisibilityResolver;
use crate::utils::retry_on_lock;
use ndb_common::{Error, Result, Visibility};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

impl Reconciler {
    pub(super) async fn phase_samples(&self, upstream: &Upstream, stats: &mut RunStatistics) -> Result<SampleStage> {
        let mut stage = SampleStage::default();

        let sample_visibility: HashMap<Uuid, Option<Visibility>> = upstream
            .samples
            .values()
            .map(|sample| (sample.id, self.resolver.sample_visibility(sample)))
            .collect();

        let mut neuron_ids: Vec<&Uuid> = upstream.neurons.keys().collect();
        neuron_ids.sort();
        for id in neuron_ids {
            let neuron = &upstream.neurons[id];
            let Some(inherited) = neuron.sample_id.and_then(|sid| sample_visibility.get(&sid)) else {
                stats.integrity_warning(Error::dangling("neuron", neuron.id, "sample"));
                continue;
            };
            if let Some(visibility) = self.resolver.neuron_visibility(neuron, *inherited) {
                if self.resolver.qualifies(Some(visibility)) {
                    stage.qualifying_neurons.insert(neuron.id, visibility);
                }
            }
        }

        let retained_by_neuron: HashSet<Uuid> = stage
            .qualifying_neurons
            .keys()
            .filter_map(|id| upstream.neurons.get(id).and_then(|n| n.sample_id))
            .collect();

        let existing: HashMap<Uuid, SearchSample> = samples::fetch_samples(&self.stores.search).await?;

        let mut sample_ids: Vec<&Uuid> = upstream.samples.keys().collect();
        sample_ids.sort();
        for id in sample_ids {
            let sample = &upstream.samples[id];
            let visibility = sample_visibility.get(&sample.id).copied().flatten();
            if !self.resolver.qualifies(visibility) && !retained_by_neuron.contains(&sample.id) {
                continue;
            }

            if let Some(row) = existing.get(&sample.id) {
                if !self.options.force_update && sample.updated_at <= row.updated_at {
                    stats.samples_reused += 1;
                    stage.qualifying.insert(sample.id, row.clone());
                    continue;
                }
            }

            let row = SearchSample {
                id: sample.id,
                id_number: sample.id_number,
                animal_id: sample.animal_id.clone(),
                tag: sample.tag.clone(),
                comment: sample.comment.clone(),
                sample_date: sample.sample_date,
                mouse_strain_id: sample.mouse_strain_id,
                search_scope: VisibilityResolver::scope(visibility),
                updated_at: sample.updated_at,
            };
            retry_on_lock("sample upsert", self.options.max_lock_wait_ms, || {
                samples::upsert_sample(&self.stores.search, &row)
            })
            .await?;

            tracing::debug!(sample_id = %row.id, scope = ?row.search_scope, "Sample written");
            stats.samples_written += 1;
            stage.updated.insert(row.id);
            stage.qualifying.insert(row.id, row);
        }

        stage.removed = existing
            .keys()
            .filter(|id| !stage.qualifying.contains_key(id))
            .copied()
            .collect();
        stage.removed.sort();
        stats.samples_unqualified = stage.removed.len() as u64;

        tracing::info!(
            qualifying = stage.qualifying.len(),
            written = stats.samples_written,
            reused = stats.samples_reused,
            unqualified = stage.removed.len(),
            "Stage 1: samples reconciled"
        );

        Ok(stage)
    }
}
