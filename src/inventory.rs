//! Finite stock of plant instances.
//!
//! Each slot is one physical plant. Slots are drawn when a plant is
//! committed and restored when it is rolled back or pruned, so the
//! garden and the inventory always account for the same instances.

use std::collections::HashSet;

use crate::error::Result;
use crate::prng::Pcg32;
use crate::types::{CatalogVariety, NutrientProfile, Species, SpeciesSet, Variety, VarietyKey};

#[derive(Debug, Clone, Default)]
pub struct Inventory {
    slots: Vec<Variety>,
    used: Vec<bool>,
}

impl Inventory {
    pub fn new(varieties: Vec<Variety>) -> Result<Self> {
        for v in &varieties {
            v.validate()?;
        }
        let used = vec![false; varieties.len()];
        Ok(Self {
            slots: varieties,
            used,
        })
    }

    /// Expands catalog entries; a missing quantity means one instance.
    pub fn from_catalog(catalog: &[CatalogVariety]) -> Result<Self> {
        let mut slots = Vec::new();
        for entry in catalog {
            entry.item.validate()?;
            let n = entry.quantity.unwrap_or(1);
            slots.extend(std::iter::repeat(entry.item.clone()).take(n as usize));
        }
        Self::new(slots)
    }

    /// Random inventory of `per_species` instances for each species,
    /// drawn from a handful of generated varieties.
    pub fn random(seed: u64, per_species: usize) -> Self {
        let mut rng = Pcg32::new(seed, 0);
        let mut slots = Vec::with_capacity(per_species * Species::ALL.len());
        for species in Species::ALL {
            let kinds: Vec<Variety> = (0..3)
                .map(|k| random_variety(&mut rng, species, k))
                .collect();
            for _ in 0..per_species {
                if let Some(v) = rng.pick(&kinds) {
                    slots.push(v.clone());
                }
            }
        }
        let used = vec![false; slots.len()];
        Self { slots, used }
    }

    /// Total instances, used or not.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.used.iter().filter(|u| !**u).count()
    }

    pub fn is_available(&self, slot: usize) -> bool {
        self.used.get(slot).is_some_and(|u| !u)
    }

    /// Species present anywhere in the original stock.
    pub fn species_in_stock(&self) -> SpeciesSet {
        self.slots.iter().map(|v| v.species).collect()
    }

    pub fn mean_radius(&self) -> f64 {
        if self.slots.is_empty() {
            return 0.0;
        }
        self.slots.iter().map(|v| v.radius).sum::<f64>() / self.slots.len() as f64
    }

    /// One unused instance per distinct variety key, in stock order.
    pub fn representatives(&self) -> Vec<Variety> {
        let mut seen = HashSet::new();
        self.unused()
            .filter(|(_, v)| seen.insert(v.key()))
            .map(|(_, v)| v.clone())
            .collect()
    }

    /// First unused slot matching `key`, skipping `reserved`.
    pub fn find_key(&self, key: VarietyKey, reserved: &[usize]) -> Option<usize> {
        self.unused()
            .find(|(i, v)| v.key() == key && !reserved.contains(i))
            .map(|(i, _)| i)
    }

    /// Same-signature instance if one is left, else any of the species.
    pub fn find_like(&self, variety: &Variety, reserved: &[usize]) -> Option<usize> {
        self.find_key(variety.key(), reserved).or_else(|| {
            self.unused()
                .find(|(i, v)| v.species == variety.species && !reserved.contains(i))
                .map(|(i, _)| i)
        })
    }

    pub fn variety(&self, slot: usize) -> Option<&Variety> {
        self.slots.get(slot)
    }

    /// Marks `slot` used and returns its variety.
    pub fn take(&mut self, slot: usize) -> Option<Variety> {
        if !self.is_available(slot) {
            return None;
        }
        self.used[slot] = true;
        Some(self.slots[slot].clone())
    }

    pub fn take_key(&mut self, key: VarietyKey) -> Option<(usize, Variety)> {
        let slot = self.find_key(key, &[])?;
        self.take(slot).map(|v| (slot, v))
    }

    pub fn restore(&mut self, slot: usize) {
        if let Some(u) = self.used.get_mut(slot) {
            *u = false;
        }
    }

    fn unused(&self) -> impl Iterator<Item = (usize, &Variety)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(i, _)| !self.used[*i])
    }
}

fn random_variety(rng: &mut Pcg32, species: Species, kind: usize) -> Variety {
    let radius = rng.next_int(1, 3) as f64;
    let produce = rng.next_range(0.5, 2.0);
    let mut coeffs = [0.0; 3];
    for (i, c) in coeffs.iter_mut().enumerate() {
        *c = if i == species.index() {
            produce
        } else {
            -rng.next_range(0.1, produce)
        };
    }
    Variety::new(
        format!("{}-{}", species.letter(), kind),
        species,
        radius,
        NutrientProfile::new(coeffs[0], coeffs[1], coeffs[2]),
    )
}
