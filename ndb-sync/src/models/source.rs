//! Upstream (read-only) records

use chrono::{DateTime, Utc};
use ndb_common::db::row;
use ndb_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

/// Specimen record from the sample store
#[derive(Debug, Clone)]
pub struct Sample {
    pub id: Uuid,
    pub id_number: i64,
    pub animal_id: String,
    pub tag: String,
    pub comment: String,
    pub sample_date: Option<DateTime<Utc>>,
    /// Raw sharing code, see `ndb_common::Sharing`
    pub sharing: i64,
    pub mouse_strain_id: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

impl Sample {
    pub fn from_row(r: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: row::uuid(r, "id")?,
            id_number: r.try_get("id_number")?,
            animal_id: r.try_get("animal_id")?,
            tag: r.try_get("tag")?,
            comment: r.try_get("comment")?,
            sample_date: row::opt_timestamp(r, "sample_date")?,
            sharing: r.try_get("sharing")?,
            mouse_strain_id: row::opt_uuid(r, "mouse_strain_id")?,
            updated_at: row::timestamp(r, "updated_at")?,
        })
    }
}

/// Neuron record joined with its injection's sample id
#[derive(Debug, Clone)]
pub struct Neuron {
    pub id: Uuid,
    pub id_number: i64,
    pub id_string: String,
    pub tag: String,
    pub keywords: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub sharing: i64,
    pub doi: Option<String>,
    pub consensus: i64,
    /// Free-form JSON annotation metadata
    pub metadata: Option<String>,
    /// Explicit, user-assigned region
    pub brain_area_id: Option<Uuid>,
    pub injection_id: Uuid,
    /// `None` when the injection row is missing
    pub sample_id: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

impl Neuron {
    pub fn from_row(r: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: row::uuid(r, "id")?,
            id_number: r.try_get("id_number")?,
            id_string: r.try_get("id_string")?,
            tag: r.try_get("tag")?,
            keywords: r.try_get("keywords")?,
            x: r.try_get("x")?,
            y: r.try_get("y")?,
            z: r.try_get("z")?,
            sharing: r.try_get("sharing")?,
            doi: r.try_get("doi")?,
            consensus: r.try_get("consensus")?,
            metadata: r.try_get("metadata")?,
            brain_area_id: row::opt_uuid(r, "brain_area_id")?,
            injection_id: row::uuid(r, "injection_id")?,
            sample_id: row::opt_uuid(r, "sample_id")?,
            updated_at: row::timestamp(r, "updated_at")?,
        })
    }
}

/// Digitized skeleton before registration
#[derive(Debug, Clone)]
pub struct RawTracing {
    pub id: Uuid,
    pub neuron_id: Uuid,
    pub tracing_structure_id: Option<Uuid>,
    pub filename: String,
    pub annotator: String,
    pub updated_at: DateTime<Utc>,
}

impl RawTracing {
    pub fn from_row(r: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: row::uuid(r, "id")?,
            neuron_id: row::uuid(r, "neuron_id")?,
            tracing_structure_id: row::opt_uuid(r, "tracing_structure_id")?,
            filename: r.try_get("filename")?,
            annotator: r.try_get("annotator")?,
            updated_at: row::timestamp(r, "updated_at")?,
        })
    }
}

/// Spatially registered counterpart of a raw tracing
#[derive(Debug, Clone)]
pub struct RegisteredTracing {
    pub id: Uuid,
    pub swc_tracing_id: Option<Uuid>,
    pub node_count: i64,
    pub path_count: i64,
    pub branch_count: i64,
    pub end_count: i64,
    pub transformed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl RegisteredTracing {
    pub fn from_row(r: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: row::uuid(r, "id")?,
            swc_tracing_id: row::opt_uuid(r, "swc_tracing_id")?,
            node_count: r.try_get("node_count")?,
            path_count: r.try_get("path_count")?,
            branch_count: r.try_get("branch_count")?,
            end_count: r.try_get("end_count")?,
            transformed_at: row::opt_timestamp(r, "transformed_at")?,
            updated_at: row::timestamp(r, "updated_at")?,
        })
    }
}

/// One skeleton point. Same layout in the registered and search stores.
#[derive(Debug, Clone, PartialEq)]
pub struct TracingNode {
    pub id: Uuid,
    pub tracing_id: Uuid,
    pub sample_number: i64,
    /// `-1` marks the root
    pub parent_number: i64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub radius: f64,
    pub length_to_parent: f64,
    pub structure_identifier_id: Option<Uuid>,
    pub brain_area_id_ccf_v25: Option<Uuid>,
    pub brain_area_id_ccf_v30: Option<Uuid>,
}

impl TracingNode {
    pub fn from_row(r: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: row::uuid(r, "id")?,
            tracing_id: row::uuid(r, "tracing_id")?,
            sample_number: r.try_get("sample_number")?,
            parent_number: r.try_get("parent_number")?,
            x: r.try_get("x")?,
            y: r.try_get("y")?,
            z: r.try_get("z")?,
            radius: r.try_get("radius")?,
            length_to_parent: r.try_get("length_to_parent")?,
            structure_identifier_id: row::opt_uuid(r, "structure_identifier_id")?,
            brain_area_id_ccf_v25: row::opt_uuid(r, "brain_area_id_ccf_v25")?,
            brain_area_id_ccf_v30: row::opt_uuid(r, "brain_area_id_ccf_v30")?,
        })
    }

    /// Region for the newer atlas, falling back to the older one
    pub fn preferred_region(&self) -> Option<Uuid> {
        self.brain_area_id_ccf_v30.or(self.brain_area_id_ccf_v25)
    }
}

/// Pre-aggregated per-(tracing, compartment) counts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompartmentAggregate {
    pub tracing_id: Uuid,
    pub brain_area_id: Uuid,
    pub node_count: i64,
    pub soma_count: i64,
    pub path_count: i64,
    pub branch_count: i64,
    pub end_count: i64,
}

impl CompartmentAggregate {
    pub fn from_row(r: &SqliteRow) -> Result<Self> {
        Ok(Self {
            tracing_id: row::uuid(r, "tracing_id")?,
            brain_area_id: row::uuid(r, "brain_area_id")?,
            node_count: r.try_get("node_count")?,
            soma_count: r.try_get("soma_count")?,
            path_count: r.try_get("path_count")?,
            branch_count: r.try_get("branch_count")?,
            end_count: r.try_get("end_count")?,
        })
    }
}
