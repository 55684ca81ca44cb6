//! Manual annotation overrides carried in neuron metadata
//!
//! ```json
//! { "manualAnnotations": { "curatedCompartmentId": 567, "legacyCompartmentIds": [8, 997] } }
//! ```
//!
//! Ids are brain-area structure ids and are mapped to area ids through the
//! compartment cache.

use super::CompartmentCache;
use ndb_common::Result;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NeuronMetadata {
    #[serde(default)]
    manual_annotations: Option<ManualAnnotations>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualAnnotations {
    #[serde(default)]
    pub curated_compartment_id: Option<i64>,
    #[serde(default)]
    pub legacy_compartment_ids: Vec<i64>,
}

/// Soma compartment overrides resolved to area ids
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SomaOverrides {
    pub manual_soma_compartment_id: Option<Uuid>,
    /// JSON array of area ids
    pub legacy_soma_ids: Option<String>,
}

/// Parse the annotation block; `None` for empty or annotation-free metadata
pub fn parse_annotations(metadata: Option<&str>) -> Result<Option<ManualAnnotations>> {
    let Some(text) = metadata.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(None);
    };
    let parsed: NeuronMetadata = serde_json::from_str(text)?;
    Ok(parsed.manual_annotations)
}

/// Map structure ids to area ids, dropping (and logging) unknown ones
pub fn resolve_overrides(
    neuron_id: Uuid,
    annotations: &ManualAnnotations,
    compartments: &CompartmentCache,
) -> Result<SomaOverrides> {
    let lookup = |structure_id: i64| {
        let found = compartments.by_structure_id(structure_id).map(|area| area.id);
        if found.is_none() {
            tracing::warn!(neuron_id = %neuron_id, structure_id, "Annotation names an unknown compartment");
        }
        found
    };

    let manual_soma_compartment_id = annotations.curated_compartment_id.and_then(lookup);

    let legacy: Vec<Uuid> = annotations
        .legacy_compartment_ids
        .iter()
        .filter_map(|id| lookup(*id))
        .collect();
    let legacy_soma_ids = if legacy.is_empty() {
        None
    } else {
        Some(serde_json::to_string(&legacy)?)
    };

    Ok(SomaOverrides {
        manual_soma_compartment_id,
        legacy_soma_ids,
    })
}
