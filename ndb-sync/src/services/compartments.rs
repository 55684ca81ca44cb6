//! Compartment hierarchy cache
//!
//! Loads every brain area once per run and indexes the subregion closure
//! from `structure_id_path` strings (`/997/8/567/`, dots also accepted).

use crate::db::reference;
use crate::models::BrainArea;
use ndb_common::Result;
use sqlx::SqlitePool;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct CompartmentCache {
    areas: HashMap<Uuid, BrainArea>,
    by_structure: HashMap<i64, Uuid>,
    /// Area id -> itself plus every area below it
    closure: HashMap<Uuid, HashSet<Uuid>>,
}

impl CompartmentCache {
    pub async fn load(pool: &SqlitePool) -> Result<Self> {
        let areas = reference::fetch_all::<BrainArea>(pool).await?;
        let cache = Self::from_areas(areas);
        tracing::debug!(areas = cache.len(), "Compartment cache loaded");
        Ok(cache)
    }

    pub fn from_areas(areas: Vec<BrainArea>) -> Self {
        let by_structure: HashMap<i64, Uuid> = areas.iter().map(|a| (a.structure_id, a.id)).collect();
        let mut closure: HashMap<Uuid, HashSet<Uuid>> = HashMap::new();

        for area in &areas {
            closure.entry(area.id).or_default().insert(area.id);

            for ancestor in parse_path(&area.structure_id_path) {
                match by_structure.get(&ancestor) {
                    Some(ancestor_id) => {
                        closure.entry(*ancestor_id).or_default().insert(area.id);
                    }
                    None => tracing::debug!(
                        area = %area.id,
                        structure_id = ancestor,
                        "Path names an unknown structure id"
                    ),
                }
            }
        }

        Self {
            areas: areas.into_iter().map(|a| (a.id, a)).collect(),
            by_structure,
            closure,
        }
    }

    pub fn get(&self, id: Uuid) -> Option<&BrainArea> {
        self.areas.get(&id)
    }

    pub fn by_structure_id(&self, structure_id: i64) -> Option<&BrainArea> {
        self.by_structure.get(&structure_id).and_then(|id| self.areas.get(id))
    }

    /// The area and all of its subregions; empty for an unknown id
    pub fn descendants(&self, id: Uuid) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = self
            .closure
            .get(&id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    /// True when `descendant` is `ancestor` or lies below it
    pub fn contains(&self, ancestor: Uuid, descendant: Uuid) -> bool {
        self.closure
            .get(&ancestor)
            .is_some_and(|set| set.contains(&descendant))
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }
}

fn parse_path(path: &str) -> impl Iterator<Item = i64> + '_ {
    path.split(['/', '.'])
        .filter(|segment| !segment.is_empty())
        .filter_map(|segment| segment.trim().parse().ok())
}
