//! Versioned memo of which species a candidate would interact with.
//!
//! Entries are keyed by `(variety signature, lattice point)` and tagged
//! with the garden version they were computed against. A lookup under a
//! different version is a miss, and the first insert under a new version
//! clears the shard, so stale answers are never served. The map is
//! sharded behind `RwLock`s so the parallel admissibility pass can read
//! and fill it concurrently.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use crate::collision::GeometryOracle;
use crate::garden::{Garden, GardenVersion};
use crate::types::{GridPos, SpeciesSet, Variety, VarietyKey};

const SHARDS: usize = 16;

type CacheKey = (VarietyKey, GridPos);

#[derive(Default)]
struct Shard {
    version: Option<GardenVersion>,
    entries: HashMap<CacheKey, SpeciesSet>,
}

pub struct InteractionCache {
    shards: Vec<RwLock<Shard>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

impl Default for InteractionCache {
    fn default() -> Self {
        Self::new()
    }
}

impl InteractionCache {
    pub fn new() -> Self {
        Self {
            shards: (0..SHARDS).map(|_| RwLock::new(Shard::default())).collect(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Species the candidate would interact with in the current garden.
    pub fn interacting_species(
        &self,
        geometry: &dyn GeometryOracle,
        garden: &Garden,
        variety: &Variety,
        cell: GridPos,
    ) -> SpeciesSet {
        let version = garden.version();
        let key = (variety.key(), cell);
        let shard = self.shard(&key);

        {
            let guard = shard.read().unwrap_or_else(PoisonError::into_inner);
            if guard.version == Some(version) {
                if let Some(set) = guard.entries.get(&key) {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return *set;
                }
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let set = geometry.interacting_species(variety, cell.to_position(), garden);

        let mut guard = shard.write().unwrap_or_else(PoisonError::into_inner);
        if guard.version != Some(version) {
            guard.entries.clear();
            guard.version = Some(version);
        }
        guard.entries.insert(key, set);
        set
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    fn shard(&self, key: &CacheKey) -> &RwLock<Shard> {
        let mut h = DefaultHasher::new();
        key.hash(&mut h);
        &self.shards[h.finish() as usize % SHARDS]
    }
}
