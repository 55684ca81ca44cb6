//! Column decoding helpers
//!
//! Ids and timestamps are stored as text; these helpers turn decode
//! failures into `Error` values instead of panics.

use crate::{time, uuid_utils, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

pub fn uuid(row: &SqliteRow, column: &str) -> Result<Uuid> {
    let value: String = row.try_get(column)?;
    uuid_utils::parse(&value)
}

pub fn opt_uuid(row: &SqliteRow, column: &str) -> Result<Option<Uuid>> {
    let value: Option<String> = row.try_get(column)?;
    value.as_deref().map(uuid_utils::parse).transpose()
}

pub fn timestamp(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>> {
    let value: String = row.try_get(column)?;
    time::parse_db(&value)
}

pub fn opt_timestamp(row: &SqliteRow, column: &str) -> Result<Option<DateTime<Utc>>> {
    let value: Option<String> = row.try_get(column)?;
    value.as_deref().map(time::parse_db).transpose()
}

/// Bindable text form of an optional id
pub fn opt_id(id: Option<Uuid>) -> Option<String> {
    id.map(|id| id.to_string())
}
