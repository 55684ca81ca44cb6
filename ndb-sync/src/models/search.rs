//! Search-store records

use chrono::{DateTime, Utc};
use ndb_common::db::row;
use ndb_common::{Result, SearchScope};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct SearchSample {
    pub id: Uuid,
    pub id_number: i64,
    pub animal_id: String,
    pub tag: String,
    pub comment: String,
    pub sample_date: Option<DateTime<Utc>>,
    pub mouse_strain_id: Option<Uuid>,
    pub search_scope: SearchScope,
    pub updated_at: DateTime<Utc>,
}

impl SearchSample {
    pub fn from_row(r: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: row::uuid(r, "id")?,
            id_number: r.try_get("id_number")?,
            animal_id: r.try_get("animal_id")?,
            tag: r.try_get("tag")?,
            comment: r.try_get("comment")?,
            sample_date: row::opt_timestamp(r, "sample_date")?,
            mouse_strain_id: row::opt_uuid(r, "mouse_strain_id")?,
            search_scope: SearchScope::from_code(r.try_get("search_scope")?),
            updated_at: row::timestamp(r, "updated_at")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchNeuron {
    pub id: Uuid,
    pub id_number: i64,
    pub id_string: String,
    pub tag: String,
    pub keywords: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub doi: Option<String>,
    pub consensus: i64,
    pub search_scope: SearchScope,
    /// Explicit region, else the soma-derived one
    pub brain_area_id: Option<Uuid>,
    pub sample_id: Uuid,
    pub manual_soma_compartment_id: Option<Uuid>,
    /// JSON array of brain area ids
    pub legacy_soma_ids: Option<String>,
    /// Later of the neuron and sample timestamps
    pub updated_at: DateTime<Utc>,
}

impl SearchNeuron {
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
            doi: r.try_get("doi")?,
            consensus: r.try_get("consensus")?,
            search_scope: SearchScope::from_code(r.try_get("search_scope")?),
            brain_area_id: row::opt_uuid(r, "brain_area_id")?,
            sample_id: row::uuid(r, "sample_id")?,
            manual_soma_compartment_id: row::opt_uuid(r, "manual_soma_compartment_id")?,
            legacy_soma_ids: r.try_get("legacy_soma_ids")?,
            updated_at: row::timestamp(r, "updated_at")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchTracing {
    pub id: Uuid,
    pub neuron_id: Uuid,
    pub tracing_structure_id: Option<Uuid>,
    pub swc_tracing_id: Option<Uuid>,
    pub node_count: i64,
    pub path_count: i64,
    pub branch_count: i64,
    pub end_count: i64,
    pub transformed_at: Option<DateTime<Utc>>,
    pub search_scope: SearchScope,
    /// Weak back-reference to this tracing's soma node
    pub soma_id: Option<Uuid>,
    /// Latest of the registered, raw, neuron and sample timestamps
    pub updated_at: DateTime<Utc>,
}

impl SearchTracing {
    pub fn from_row(r: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: row::uuid(r, "id")?,
            neuron_id: row::uuid(r, "neuron_id")?,
            tracing_structure_id: row::opt_uuid(r, "tracing_structure_id")?,
            swc_tracing_id: row::opt_uuid(r, "swc_tracing_id")?,
            node_count: r.try_get("node_count")?,
            path_count: r.try_get("path_count")?,
            branch_count: r.try_get("branch_count")?,
            end_count: r.try_get("end_count")?,
            transformed_at: row::opt_timestamp(r, "transformed_at")?,
            search_scope: SearchScope::from_code(r.try_get("search_scope")?),
            soma_id: row::opt_uuid(r, "soma_id")?,
            updated_at: row::timestamp(r, "updated_at")?,
        })
    }
}

/// Soma node position, indexed by tracing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SomaNode {
    pub id: Uuid,
    pub tracing_id: Uuid,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl SomaNode {
    pub fn from_row(r: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: row::uuid(r, "id")?,
            tracing_id: row::uuid(r, "tracing_id")?,
            x: r.try_get("x")?,
            y: r.try_get("y")?,
            z: r.try_get("z")?,
        })
    }
}

/// Derived per-(tracing, compartment) row for one atlas version
#[derive(Debug, Clone, PartialEq)]
pub struct CompartmentContent {
    pub id: Uuid,
    pub tracing_id: Uuid,
    pub neuron_id: Uuid,
    pub brain_area_id: Uuid,
    pub neuron_id_string: String,
    pub neuron_doi: Option<String>,
    pub neuron_consensus: i64,
    pub manual_soma_compartment_id: Option<Uuid>,
    pub legacy_soma_ids: Option<String>,
    pub search_scope: SearchScope,
    pub soma_x: f64,
    pub soma_y: f64,
    pub soma_z: f64,
    pub node_count: i64,
    pub soma_count: i64,
    pub path_count: i64,
    pub branch_count: i64,
    pub end_count: i64,
}

impl CompartmentContent {
    pub fn from_row(r: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: row::uuid(r, "id")?,
            tracing_id: row::uuid(r, "tracing_id")?,
            neuron_id: row::uuid(r, "neuron_id")?,
            brain_area_id: row::uuid(r, "brain_area_id")?,
            neuron_id_string: r.try_get("neuron_id_string")?,
            neuron_doi: r.try_get("neuron_doi")?,
            neuron_consensus: r.try_get("neuron_consensus")?,
            manual_soma_compartment_id: row::opt_uuid(r, "manual_soma_compartment_id")?,
            legacy_soma_ids: r.try_get("legacy_soma_ids")?,
            search_scope: SearchScope::from_code(r.try_get("search_scope")?),
            soma_x: r.try_get("soma_x")?,
            soma_y: r.try_get("soma_y")?,
            soma_z: r.try_get("soma_z")?,
            node_count: r.try_get("node_count")?,
            soma_count: r.try_get("soma_count")?,
            path_count: r.try_get("path_count")?,
            branch_count: r.try_get("branch_count")?,
            end_count: r.try_get("end_count")?,
        })
    }
}
