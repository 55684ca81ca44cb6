//! Small lookup tables mirrored verbatim into the search store

use chrono::{DateTime, Utc};
use ndb_common::db::row;
use ndb_common::{time, Result};
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Row, Sqlite};
use uuid::Uuid;

pub type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

/// A lookup row with an identical layout in its source store and the search store
pub trait ReferenceRow: Sized + Send + Sync + Unpin + 'static {
    const TABLE: &'static str;
    /// Column order used by `bind`; the first column is the primary key `id`
    const COLUMNS: &'static [&'static str];

    fn id(&self) -> Uuid;
    fn from_row(row: &SqliteRow) -> Result<Self>;
    fn bind<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q>;
}

/// Anatomical region in the hierarchical taxonomy
#[derive(Debug, Clone, PartialEq)]
pub struct BrainArea {
    pub id: Uuid,
    pub structure_id: i64,
    pub depth: i64,
    pub name: String,
    pub safe_name: String,
    pub acronym: String,
    pub parent_structure_id: Option<i64>,
    /// Ancestor chain of structure ids, e.g. `/997/8/567/`
    pub structure_id_path: String,
    pub geometry_color: String,
    pub geometry_file: String,
    pub geometry_enable: bool,
    pub updated_at: DateTime<Utc>,
}

impl ReferenceRow for BrainArea {
    const TABLE: &'static str = "brain_area";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "structure_id",
        "depth",
        "name",
        "safe_name",
        "acronym",
        "parent_structure_id",
        "structure_id_path",
        "geometry_color",
        "geometry_file",
        "geometry_enable",
        "updated_at",
    ];

    fn id(&self) -> Uuid {
        self.id
    }

    fn from_row(r: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: row::uuid(r, "id")?,
            structure_id: r.try_get("structure_id")?,
            depth: r.try_get("depth")?,
            name: r.try_get("name")?,
            safe_name: r.try_get("safe_name")?,
            acronym: r.try_get("acronym")?,
            parent_structure_id: r.try_get("parent_structure_id")?,
            structure_id_path: r.try_get("structure_id_path")?,
            geometry_color: r.try_get("geometry_color")?,
            geometry_file: r.try_get("geometry_file")?,
            geometry_enable: r.try_get("geometry_enable")?,
            updated_at: row::timestamp(r, "updated_at")?,
        })
    }

    fn bind<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.id.to_string())
            .bind(self.structure_id)
            .bind(self.depth)
            .bind(&self.name)
            .bind(&self.safe_name)
            .bind(&self.acronym)
            .bind(self.parent_structure_id)
            .bind(&self.structure_id_path)
            .bind(&self.geometry_color)
            .bind(&self.geometry_file)
            .bind(self.geometry_enable)
            .bind(time::to_db(&self.updated_at))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MouseStrain {
    pub id: Uuid,
    pub name: String,
    pub updated_at: DateTime<Utc>,
}

impl ReferenceRow for MouseStrain {
    const TABLE: &'static str = "mouse_strain";
    const COLUMNS: &'static [&'static str] = &["id", "name", "updated_at"];

    fn id(&self) -> Uuid {
        self.id
    }

    fn from_row(r: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: row::uuid(r, "id")?,
            name: r.try_get("name")?,
            updated_at: row::timestamp(r, "updated_at")?,
        })
    }

    fn bind<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.id.to_string())
            .bind(&self.name)
            .bind(time::to_db(&self.updated_at))
    }
}

/// SWC node type (soma, axon, dendrite, ...)
#[derive(Debug, Clone, PartialEq)]
pub struct StructureIdentifier {
    pub id: Uuid,
    pub name: String,
    /// SWC type code
    pub value: i64,
    pub mutable: bool,
    pub updated_at: DateTime<Utc>,
}

impl StructureIdentifier {
    /// SWC type code of the soma
    pub const SOMA_VALUE: i64 = 1;
}

impl ReferenceRow for StructureIdentifier {
    const TABLE: &'static str = "structure_identifier";
    const COLUMNS: &'static [&'static str] = &["id", "name", "value", "mutable", "updated_at"];

    fn id(&self) -> Uuid {
        self.id
    }

    fn from_row(r: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: row::uuid(r, "id")?,
            name: r.try_get("name")?,
            value: r.try_get("value")?,
            mutable: r.try_get("mutable")?,
            updated_at: row::timestamp(r, "updated_at")?,
        })
    }

    fn bind<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.id.to_string())
            .bind(&self.name)
            .bind(self.value)
            .bind(self.mutable)
            .bind(time::to_db(&self.updated_at))
    }
}

/// Tracing kind (axon or dendrite)
#[derive(Debug, Clone, PartialEq)]
pub struct TracingStructure {
    pub id: Uuid,
    pub name: String,
    pub value: i64,
    pub updated_at: DateTime<Utc>,
}

impl ReferenceRow for TracingStructure {
    const TABLE: &'static str = "tracing_structure";
    const COLUMNS: &'static [&'static str] = &["id", "name", "value", "updated_at"];

    fn id(&self) -> Uuid {
        self.id
    }

    fn from_row(r: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: row::uuid(r, "id")?,
            name: r.try_get("name")?,
            value: r.try_get("value")?,
            updated_at: row::timestamp(r, "updated_at")?,
        })
    }

    fn bind<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.id.to_string())
            .bind(&self.name)
            .bind(self.value)
            .bind(time::to_db(&self.updated_at))
    }
}
