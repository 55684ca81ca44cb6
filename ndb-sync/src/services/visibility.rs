//! Visibility resolution
//!
//! A neuron whose sharing is `Inherited` takes its sample's sharing. An
//! unrecognized code, or the inherit code on a sample, resolves to no visibility: it never qualifies and maps
//! to `SearchScope::Private`.

use crate::models::{Neuron, Sample};
use ndb_common::{SearchScope, Sharing, Visibility};

#[derive(Debug, Clone, Copy)]
pub struct VisibilityResolver {
    threshold: Visibility,
}

impl VisibilityResolver {
    pub fn new(threshold: Visibility) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> Visibility {
        self.threshold
    }

    /// Effective visibility of a sample
    ///
    /// Called once per sample per run; inheriting neurons reuse the result.
    pub fn sample_visibility(&self, sample: &Sample) -> Option<Visibility> {
        match Sharing::from_code(sample.sharing) {
            Some(Sharing::Inherited) => {
                tracing::warn!(sample_id = %sample.id, "Sample carries the neuron-only inherited sharing code");
                None
            }
            Some(sharing) => sharing.visibility(),
            None => {
                tracing::warn!(sample_id = %sample.id, sharing = sample.sharing, "Unrecognized sample sharing code");
                None
            }
        }
    }

    /// Effective visibility of a neuron given its sample's resolved visibility
    pub fn neuron_visibility(&self, neuron: &Neuron, sample_visibility: Option<Visibility>) -> Option<Visibility> {
        match Sharing::from_code(neuron.sharing) {
            Some(Sharing::Inherited) => sample_visibility,
            Some(sharing) => sharing.visibility(),
            None => {
                tracing::warn!(neuron_id = %neuron.id, sharing = neuron.sharing, "Unrecognized neuron sharing code");
                None
            }
        }
    }

    pub fn qualifies(&self, visibility: Option<Visibility>) -> bool {
        visibility.is_some_and(|v| v >= self.threshold)
    }

    pub fn scope(visibility: Option<Visibility>) -> SearchScope {
        visibility.map(SearchScope::from).unwrap_or(SearchScope::Private)
    }
}
