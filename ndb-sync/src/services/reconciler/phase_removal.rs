//! Stage 9: REMOVAL
//!
//! Deletes search rows that no longer qualify, children first: content,
//! then tracings (soma links cleared before their nodes go), then neurons,
//! then optionally samples.

use super::context::{NeuronStage, SampleStage, TracingStage};
use super::{Reconciler, RunStatistics};
use crate::db::search_store::{contents, neurons, samples, tracings};
use crate::utils::retry_on_lock;
use ndb_common::{AtlasVersion, Result};
use std::collections::BTreeSet;
use uuid::Uuid;

impl Reconciler {
    pub(super) async fn phase_removal(
        &self,
        sample_stage: &SampleStage,
        neuron_stage: &NeuronStage,
        tracing_stage: &TracingStage,
        stats: &mut RunStatistics,
    ) -> Result<()> {
        let search = &self.stores.search;
        let max_lock_wait_ms = self.options.max_lock_wait_ms;

        let mut removed_tracings: BTreeSet<Uuid> = tracing_stage.removed.iter().copied().collect();
        removed_tracings.extend(tracings::tracing_ids_for_neurons(search, &neuron_stage.removed).await?);
        let removed_tracings: Vec<Uuid> = removed_tracings.into_iter().collect();

        for version in AtlasVersion::ALL {
            stats.content_rows_removed += retry_on_lock("content removal", max_lock_wait_ms, || {
                contents::delete_for_removed(search, version, &removed_tracings, &neuron_stage.removed)
            })
            .await?;
        }

        let (tracings_removed, nodes_removed) = retry_on_lock("tracing removal", max_lock_wait_ms, || {
            tracings::delete_tracings(search, &removed_tracings)
        })
        .await?;
        stats.tracings_removed += tracings_removed;
        stats.nodes_removed += nodes_removed;

        stats.neurons_removed += retry_on_lock("neuron removal", max_lock_wait_ms, || {
            neurons::delete_neurons(search, &neuron_stage.removed)
        })
        .await?;

        if self.options.prune_samples {
            stats.samples_removed += retry_on_lock("sample removal", max_lock_wait_ms, || {
                samples::delete_unreferenced_samples(search, &sample_stage.removed)
            })
            .await?;
        } else if !sample_stage.removed.is_empty() {
            tracing::info!(
                samples = sample_stage.removed.len(),
                "Unqualified samples kept; enable prune_samples to delete them"
            );
        }

        tracing::info!(
            content_rows = stats.content_rows_removed,
            tracings = stats.tracings_removed,
            nodes = stats.nodes_removed,
            neurons = stats.neurons_removed,
            samples = stats.samples_removed,
            "Stage 9: removals applied"
        );

        Ok(())
    }
}
