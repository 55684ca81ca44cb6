//! Per-run reconciliation statistics

use crate::services::MirrorCounts;
use ndb_common::{AtlasVersion, Error};
use serde::Serialize;

/// Derived content counters for one atlas version
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ContentStats {
    pub rows_inserted: u64,
    /// Tracings whose soma contribution was moved to an explicit compartment
    pub reallocations: u64,
    /// Tracings skipped for a missing neuron or soma
    pub tracings_skipped: u64,
}

/// What one run wrote, reused and removed
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunStatistics {
    pub reference: MirrorCounts,

    pub samples_written: u64,
    pub samples_reused: u64,
    pub neurons_written: u64,
    pub neurons_reused: u64,
    pub tracings_written: u64,
    pub tracings_reused: u64,

    pub nodes_copied: u64,
    pub soma_regions_patched: u64,
    pub soma_links_set: u64,

    pub content_ccf_v25: ContentStats,
    pub content_ccf_v30: ContentStats,
    /// Rewritten tracings whose real stamp was recorded after content
    pub tracings_completed: u64,

    /// Samples that no longer qualify
    pub samples_unqualified: u64,
    pub samples_removed: u64,
    pub neurons_removed: u64,
    pub tracings_removed: u64,
    pub nodes_removed: u64,
    pub content_rows_removed: u64,

    pub integrity_warnings: u64,
}

impl RunStatistics {
    pub fn content(&self, version: AtlasVersion) -> &ContentStats {
        match version {
            AtlasVersion::CcfV25 => &self.content_ccf_v25,
            AtlasVersion::CcfV30 => &self.content_ccf_v30,
        }
    }

    pub fn content_mut(&mut self, version: AtlasVersion) -> &mut ContentStats {
        match version {
            AtlasVersion::CcfV25 => &mut self.content_ccf_v25,
            AtlasVersion::CcfV30 => &mut self.content_ccf_v30,
        }
    }

    /// Log an integrity warning and count it; the affected unit is skipped by the caller
    pub fn integrity_warning(&mut self, warning: Error) {
        self.integrity_warnings += 1;
        tracing::warn!(warning = %warning, "Integrity warning");
    }

    /// Entity, node and content rows written (excluding removals)
    pub fn rows_written(&self) -> u64 {
        self.samples_written
            + self.neurons_written
            + self.tracings_written
            + self.nodes_copied
            + self.soma_regions_patched
            + self.soma_links_set
            + self.content_ccf_v25.rows_inserted
            + self.content_ccf_v30.rows_inserted
            + self.content_ccf_v25.reallocations
            + self.content_ccf_v30.reallocations
    }

    pub fn rows_removed(&self) -> u64 {
        self.samples_removed + self.neurons_removed + self.tracings_removed + self.nodes_removed + self.content_rows_removed
    }

    pub fn log_summary(&self) {
        tracing::info!(
            reference_upserted = self.reference.upserted,
            reference_removed = self.reference.removed,
            samples_written = self.samples_written,
            samples_reused = self.samples_reused,
            neurons_written = self.neurons_written,
            neurons_reused = self.neurons_reused,
            tracings_written = self.tracings_written,
            tracings_reused = self.tracings_reused,
            nodes_copied = self.nodes_copied,
            soma_links_set = self.soma_links_set,
            content_v25 = self.content_ccf_v25.rows_inserted,
            content_v30 = self.content_ccf_v30.rows_inserted,
            tracings_completed = self.tracings_completed,
            removed = self.rows_removed(),
            samples_unqualified = self.samples_unqualified,
            integrity_warnings = self.integrity_warnings,
            "Reconciliation summary"
        );
    }
}
