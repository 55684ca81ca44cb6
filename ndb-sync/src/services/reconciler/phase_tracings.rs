//! Stage 3: TRACINGS
//!
//! Registered tracings resolve to neurons through their raw tracing. The
//! change stamp is the latest of the registered, raw, neuron and sample
//! timestamps. A changed tracing is rewritten with its soma link cleared and
//! its nodes and content deleted. Rewrites are split into `tracing_chunk_count` chunks that
//! run concurrently; each chunk is processed in order.

use super::context::{NeuronStage, TracingEntry, TracingStage, Upstream};
use super::{Reconciler, RunStatistics};
use crate::db::search_store::tracings;
use crate::models::SearchTracing;
use crate::utils::{partition_into_chunks, retry_on_lock};
use futures::stream::{self, StreamExt, TryStreamExt};
use ndb_common::{Error, Result};
use std::collections::HashMap;
use uuid::Uuid;

impl Reconciler {
    pub(super) async fn phase_tracings(
        &self,
        upstream: &Upstream,
        neurons: &NeuronStage,
        stats: &mut RunStatistics,
    ) -> Result<TracingStage> {
        let mut stage = TracingStage::default();
        let existing: HashMap<Uuid, SearchTracing> = tracings::fetch_tracings(&self.stores.search).await?;
        let mut pending: Vec<SearchTracing> = Vec::new();

        for registered in &upstream.registered {
            let Some(raw) = registered
                .swc_tracing_id
                .and_then(|raw_id| upstream.raw_tracings.get(&raw_id))
            else {
                stats.integrity_warning(Error::dangling("tracing", registered.id, "raw tracing"));
                continue;
            };
            let Some(neuron) = upstream.neurons.get(&raw.neuron_id) else {
                stats.integrity_warning(Error::dangling("tracing", registered.id, "neuron"));
                continue;
            };
            let Some(search_neuron) = neurons.qualifying.get(&neuron.id) else {
                continue;
            };

            let sample_stamp = neuron
                .sample_id
                .and_then(|sid| upstream.samples.get(&sid))
                .map(|sample| sample.updated_at);
            let stamp = registered
                .updated_at
                .max(raw.updated_at)
                .max(neuron.updated_at)
                .max(sample_stamp.unwrap_or(neuron.updated_at));
            let current = existing.get(&registered.id);
            let reprocess = self.options.force_update
                || neurons.required.contains(&neuron.id)
                || current.map_or(true, |row| stamp > row.updated_at);

            stage.qualifying.insert(
                registered.id,
                TracingEntry {
                    neuron_id: neuron.id,
                    stamp,
                    soma_id: if reprocess { None } else { current.and_then(|row| row.soma_id) },
                },
            );

            if !reprocess {
                stats.tracings_reused += 1;
                continue;
            }

            pending.push(SearchTracing {
                id: registered.id,
                neuron_id: neuron.id,
                tracing_structure_id: raw.tracing_structure_id,
                swc_tracing_id: Some(raw.id),
                node_count: registered.node_count,
                path_count: registered.path_count,
                branch_count: registered.branch_count,
                end_count: registered.end_count,
                transformed_at: registered.transformed_at,
                search_scope: search_neuron.search_scope,
                soma_id: None,
                updated_at: stamp,
            });
        }

        let chunk_count = self.options.tracing_chunk_count.max(1);
        let chunks = partition_into_chunks(&pending, chunk_count);
        let pool = &self.stores.search;
        let max_lock_wait_ms = self.options.max_lock_wait_ms;

        let written: Vec<usize> = stream::iter(chunks.iter().enumerate())
            .map(|(index, chunk)| async move {
                for tracing in chunk {
                    retry_on_lock("tracing rewrite", max_lock_wait_ms, || tracings::rewrite_tracing(pool, tracing))
                        .await?;
                }
                tracing::debug!(chunk = index, tracings = chunk.len(), "Tracing chunk written");
                Ok::<usize, Error>(chunk.len())
            })
            .buffer_unordered(chunk_count)
            .try_collect()
            .await?;
        stats.tracings_written += written.iter().sum::<usize>() as u64;

        stage.changed = pending.iter().map(|t| t.id).collect();
        stage.changed.sort();

        stage.removed = existing
            .keys()
            .filter(|id| !stage.qualifying.contains_key(id))
            .copied()
            .collect();
        stage.removed.sort();

        tracing::info!(
            qualifying = stage.qualifying.len(),
            written = stats.tracings_written,
            reused = stats.tracings_reused,
            chunks = chunks.len(),
            removed = stage.removed.len(),
            "Stage 3: tracings reconciled"
        );

        Ok(stage)
    }
}
