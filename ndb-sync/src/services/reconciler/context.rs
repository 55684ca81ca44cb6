//! Run-scoped state
//!
//! Every stage returns one of these values and later stages only read them.
//! Nothing here is mutated after the stage that built it returns.

use crate::db::{raw_tracing_store, registered_store, sample_store, Stores};
use crate::models::{Neuron, RawTracing, RegisteredTracing, Sample, SearchNeuron, SearchSample, SomaNode};
use chrono::{DateTime, Utc};
use ndb_common::{Result, Visibility};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Upstream rows read once at the start of a run
pub struct Upstream {
    pub samples: HashMap<Uuid, Sample>,
    pub neurons: HashMap<Uuid, Neuron>,
    pub raw_tracings: HashMap<Uuid, RawTracing>,
    pub registered: Vec<RegisteredTracing>,
}

impl Upstream {
    pub async fn load(stores: &Stores) -> Result<Self> {
        let (samples, neurons, raw_tracings, registered) = futures::try_join!(
            sample_store::fetch_samples(&stores.sample),
            sample_store::fetch_neurons(&stores.sample),
            raw_tracing_store::fetch_raw_tracings(&stores.raw_tracing),
            registered_store::fetch_registered_tracings(&stores.registered_tracing),
        )?;

        Ok(Self {
            samples: samples.into_iter().map(|s| (s.id, s)).collect(),
            neurons: neurons.into_iter().map(|n| (n.id, n)).collect(),
            raw_tracings: raw_tracings.into_iter().map(|t| (t.id, t)).collect(),
            registered,
        })
    }

    /// Registered tracing ids per neuron, resolved through raw tracings
    pub fn registered_by_neuron(&self) -> HashMap<Uuid, Vec<Uuid>> {
        let mut by_neuron: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for tracing in &self.registered {
            let neuron_id = tracing
                .swc_tracing_id
                .and_then(|raw_id| self.raw_tracings.get(&raw_id))
                .map(|raw| raw.neuron_id);
            if let Some(neuron_id) = neuron_id {
                by_neuron.entry(neuron_id).or_default().push(tracing.id);
            }
        }
        by_neuron
    }
}

/// Stage 1 output
#[derive(Debug, Default)]
pub struct SampleStage {
    /// Effective visibility of every qualifying neuron
    pub qualifying_neurons: HashMap<Uuid, Visibility>,
    /// Search rows of every qualifying sample, written or reused
    pub qualifying: HashMap<Uuid, SearchSample>,
    pub updated: HashSet<Uuid>,
    /// Search samples that no longer qualify
    pub removed: Vec<Uuid>,
}

/// Stage 2 output
#[derive(Debug, Default)]
pub struct NeuronStage {
    pub qualifying: HashMap<Uuid, SearchNeuron>,
    /// Neurons rewritten this run; their content must be regenerated
    pub required: HashSet<Uuid>,
    /// Qualifying neurons with a user-assigned region, and that region
    pub explicit_regions: HashMap<Uuid, Uuid>,
    pub removed: Vec<Uuid>,
}

/// A qualifying registered tracing
#[derive(Debug, Clone, Copy)]
pub struct TracingEntry {
    pub neuron_id: Uuid,
    /// Latest of the registered, raw, neuron and sample timestamps
    pub stamp: DateTime<Utc>,
    pub soma_id: Option<Uuid>,
}

/// Stage 3 output
#[derive(Debug, Default)]
pub struct TracingStage {
    pub qualifying: HashMap<Uuid, TracingEntry>,
    /// Tracings rewritten this run, sorted
    pub changed: Vec<Uuid>,
    pub removed: Vec<Uuid>,
}

impl TracingStage {
    /// Qualifying tracings owned by any of the given neurons
    pub fn tracings_of<'a>(&'a self, neurons: &'a HashSet<Uuid>) -> impl Iterator<Item = Uuid> + 'a {
        self.qualifying
            .iter()
            .filter(move |(_, entry)| neurons.contains(&entry.neuron_id))
            .map(|(id, _)| *id)
    }
}

/// Stage 4 output
#[derive(Debug, Default)]
pub struct NodeStage {
    /// Soma node of every search tracing, after the region patch pass
    pub somas: Vec<SomaNode>,
}

/// Stage 5 output: soma node by tracing id
pub type SomaIndex = HashMap<Uuid, SomaNode>;

/// Stage 6 output: tracings whose derived content is rebuilt, sorted
pub type TriggerSet = Vec<Uuid>;
