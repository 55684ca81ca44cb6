//! Reference-table mirror
//!
//! Brain areas and strains come from the sample store, structure
//! identifiers and tracing structures from the raw tracing store. Each table
//! is upserted row by row and then trimmed to the source id set.

use crate::db::{reference, Stores};
use crate::models::{BrainArea, MouseStrain, ReferenceRow, StructureIdentifier, TracingStructure};
use crate::utils::retry_on_lock;
use futures::stream::{self, StreamExt, TryStreamExt};
use ndb_common::Result;
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::HashSet;
use std::ops::AddAssign;

/// Concurrent row upserts per table
const ROW_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MirrorCounts {
    pub upserted: u64,
    pub removed: u64,
}

impl AddAssign for MirrorCounts {
    fn add_assign(&mut self, other: Self) {
        self.upserted += other.upserted;
        self.removed += other.removed;
    }
}

/// Mirror all four lookup tables into the search store
pub async fn mirror_reference_tables(stores: &Stores, max_lock_wait_ms: u64) -> Result<MirrorCounts> {
    let (areas, strains, identifiers, structures) = futures::try_join!(
        mirror_table::<BrainArea>(&stores.sample, &stores.search, max_lock_wait_ms),
        mirror_table::<MouseStrain>(&stores.sample, &stores.search, max_lock_wait_ms),
        mirror_table::<StructureIdentifier>(&stores.raw_tracing, &stores.search, max_lock_wait_ms),
        mirror_table::<TracingStructure>(&stores.raw_tracing, &stores.search, max_lock_wait_ms),
    )?;

    let mut total = MirrorCounts::default();
    for counts in [areas, strains, identifiers, structures] {
        total += counts;
    }
    Ok(total)
}

/// Mirror one lookup table
pub async fn mirror_table<T: ReferenceRow>(
    source: &SqlitePool,
    destination: &SqlitePool,
    max_lock_wait_ms: u64,
) -> Result<MirrorCounts> {
    let rows = reference::fetch_all::<T>(source).await?;
    let source_ids: HashSet<_> = rows.iter().map(T::id).collect();

    let changed: Vec<bool> = stream::iter(rows.iter())
        .map(|row| {
            retry_on_lock(T::TABLE, max_lock_wait_ms, move || {
                reference::upsert_if_changed(destination, row)
            })
        })
        .buffer_unordered(ROW_CONCURRENCY)
        .try_collect()
        .await?;

    let stale: Vec<_> = reference::list_ids::<T>(destination)
        .await?
        .into_iter()
        .filter(|id| !source_ids.contains(id))
        .collect();
    let removed = retry_on_lock(T::TABLE, max_lock_wait_ms, || reference::delete_ids::<T>(destination, &stale)).await?;

    let counts = MirrorCounts {
        upserted: changed.into_iter().filter(|c| *c).count() as u64,
        removed,
    };
    tracing::debug!(table = T::TABLE, upserted = counts.upserted, removed = counts.removed, "Mirrored reference table");
    Ok(counts)
}
