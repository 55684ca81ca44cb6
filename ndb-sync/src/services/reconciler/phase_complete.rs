//! Stage 8: COMPLETION
//!
//! Rewritten tracings keep the pending stamp through node copy, soma
//! linking and content for both atlas versions. Only then is the real stamp
//! recorded, so an abort in any of those stages is redone by the next run.

use super::context::TracingStage;
use super::{Reconciler, RunStatistics};
use crate::db::search_store::tracings;
use crate::utils::retry_on_lock;
use chrono::{DateTime, Utc};
use ndb_common::Result;
use uuid::Uuid;

impl Reconciler {
    pub(super) async fn phase_complete(&self, tracing_stage: &TracingStage, stats: &mut RunStatistics) -> Result<()> {
        let completed: Vec<(Uuid, DateTime<Utc>)> = tracing_stage
            .changed
            .iter()
            .filter_map(|id| tracing_stage.qualifying.get(id).map(|entry| (*id, entry.stamp)))
            .collect();

        stats.tracings_completed += retry_on_lock("tracing completion", self.options.max_lock_wait_ms, || {
            tracings::mark_complete(&self.stores.search, &completed)
        })
        .await?;

        tracing::info!(tracings = stats.tracings_completed, "Stage 8: tracing stamps recorded");
        Ok(())
    }
}
