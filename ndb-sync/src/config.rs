//! Reconciliation options
//!
//! Built from a loaded [`SyncConfig`]; the binary applies command-line and
//! environment overrides on top.

use ndb_common::config::SyncConfig;
use ndb_common::Visibility;

#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileOptions {
    /// Minimum visibility a Sample or Neuron needs to be searchable
    pub visibility: Visibility,
    pub force_update: bool,
    pub tracing_chunk_count: usize,
    pub node_batch_size: usize,
    pub content_batch_size: usize,
    pub max_lock_wait_ms: u64,
    /// Delete unqualified search samples after neurons are swept
    pub prune_samples: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self::from(&SyncConfig::default())
    }
}

impl From<&SyncConfig> for ReconcileOptions {
    fn from(config: &SyncConfig) -> Self {
        Self {
            visibility: config.visibility,
            force_update: config.force_update,
            tracing_chunk_count: config.tracing_chunk_count.max(1),
            node_batch_size: config.node_batch_size.max(1),
            content_batch_size: config.content_batch_size.max(1),
            max_lock_wait_ms: config.max_lock_wait_ms,
            prune_samples: config.prune_samples,
        }
    }
}
