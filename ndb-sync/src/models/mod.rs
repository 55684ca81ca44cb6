//! Row types for the upstream stores and the search store

pub mod reference;
pub mod search;
pub mod source;

pub use reference::{BrainArea, MouseStrain, ReferenceRow, StructureIdentifier, TracingStructure};
pub use search::{CompartmentContent, SearchNeuron, SearchSample, SearchTracing, SomaNode};
pub use source::{CompartmentAggregate, Neuron, RawTracing, RegisteredTracing, Sample, TracingNode};
