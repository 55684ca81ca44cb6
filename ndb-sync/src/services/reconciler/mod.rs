//! Reconciliation orchestrator
//!
//! Rebuilds the search store from the three upstream stores.
//!
//! # Stage Progression
//! COMPARTMENTS → REFERENCE MIRROR → SAMPLES → NEURONS → TRACINGS → NODES →
//! SOMA INDEX → CONTENT (v2.5, v3.0) → COMPLETION → REMOVAL
//!
//! Each stage is a `phase_*` method in its own module. A stage starts only
//! after the previous one has committed, and receives the previous stages'
//! results as values (see `context`).

mod context;
mod phase_complete;
mod phase_content;
mod phase_neurons;
mod phase_nodes;
mod phase_removal;
mod phase_samples;
mod phase_soma;
mod phase_tracings;
pub mod statistics;

pub use statistics::{ContentStats, RunStatistics};

use crate::config::ReconcileOptions;
use crate::db::{self, Stores};
use crate::services::{mirror_reference_tables, CompartmentCache, VisibilityResolver};
use context::Upstream;
use ndb_common::{AtlasVersion, Result};
use std::time::Instant;
use tracing::{info_span, Instrument};

/// Search store reconciler
pub struct Reconciler {
    stores: Stores,
    options: ReconcileOptions,
    resolver: VisibilityResolver,
}

impl Reconciler {
    pub fn new(stores: Stores, options: ReconcileOptions) -> Self {
        let resolver = VisibilityResolver::new(options.visibility);
        Self {
            stores,
            options,
            resolver,
        }
    }

    pub fn options(&self) -> &ReconcileOptions {
        &self.options
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    /// Run a full reconciliation, reporting only success or failure
    pub async fn run(&self) -> bool {
        match self.try_run().await {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(error = %e, "Reconciliation failed");
                false
            }
        }
    }

    /// Run a full reconciliation
    ///
    /// Any store error aborts the run. Every write is an idempotent upsert or
    /// delete, so recovery is running again.
    pub async fn try_run(&self) -> Result<RunStatistics> {
        let start_time = Instant::now();
        let mut stats = RunStatistics::default();

        tracing::info!(
            visibility = %self.options.visibility,
            force_update = self.options.force_update,
            "Starting reconciliation"
        );

        let compartments = CompartmentCache::load(&self.stores.sample)
            .instrument(info_span!("compartments"))
            .await?;

        stats.reference = mirror_reference_tables(&self.stores, self.options.max_lock_wait_ms)
            .instrument(info_span!("reference_mirror"))
            .await?;

        let soma_structure = db::soma_structure_identifier_id(&self.stores.search).await?;
        if soma_structure.is_none() {
            tracing::warn!("No soma structure identifier; soma regions and soma links cannot be resolved");
        }

        let upstream = Upstream::load(&self.stores).await?;
        tracing::info!(
            samples = upstream.samples.len(),
            neurons = upstream.neurons.len(),
            raw_tracings = upstream.raw_tracings.len(),
            registered_tracings = upstream.registered.len(),
            "Upstream stores loaded"
        );

        let samples = self
            .phase_samples(&upstream, &mut stats)
            .instrument(info_span!("samples"))
            .await?;

        let neurons = self
            .phase_neurons(&upstream, &samples, &compartments, soma_structure, &mut stats)
            .instrument(info_span!("neurons"))
            .await?;

        let tracings = self
            .phase_tracings(&upstream, &neurons, &mut stats)
            .instrument(info_span!("tracings"))
            .await?;

        let nodes = self
            .phase_nodes(&tracings, &neurons, soma_structure, &mut stats)
            .instrument(info_span!("nodes"))
            .await?;

        let somas = self
            .phase_soma(&tracings, nodes, &mut stats)
            .instrument(info_span!("soma_index"))
            .await?;

        let trigger = phase_content::trigger_set(&tracings, &neurons);
        tracing::info!(tracings = trigger.len(), "Search content trigger set built");

        for version in AtlasVersion::ALL {
            self.phase_content(version, &trigger, &tracings, &neurons, &somas, &mut stats)
                .instrument(info_span!("content", atlas = %version))
                .await?;
        }

        self.phase_complete(&tracings, &mut stats)
            .instrument(info_span!("completion"))
            .await?;

        self.phase_removal(&samples, &neurons, &tracings, &mut stats)
            .instrument(info_span!("removal"))
            .await?;

        stats.log_summary();
        tracing::info!(
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Reconciliation finished"
        );

        Ok(stats)
    }
}
