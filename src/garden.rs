//! The mutable garden: bounds, placed plants and the version counter.
//!
//! `placements` always equals the number of plants. Every removal also
//! bumps `epoch`, so a `GardenVersion` value is never reused for two
//! different plant sets and can key cached geometry.

use serde::{Deserialize, Serialize};

use crate::error::{FillError, Result};
use crate::types::{GridPos, PlacedPlant, Position, Species, Variety};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GardenVersion {
    pub placements: u64,
    pub epoch: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Plant {
    pub variety: Variety,
    pub position: Position,
    /// Inventory slot the plant was drawn from.
    pub slot: usize,
}

impl Plant {
    pub fn species(&self) -> Species {
        self.variety.species
    }

    pub fn radius(&self) -> f64 {
        self.variety.radius
    }

    pub fn to_placed(&self) -> PlacedPlant {
        PlacedPlant {
            name: self.variety.name.clone(),
            species: self.variety.species,
            radius: self.variety.radius,
            position: self.position,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Garden {
    width: f64,
    height: f64,
    cols: i32,
    rows: i32,
    plants: Vec<Plant>,
    version: GardenVersion,
}

impl Garden {
    pub fn new(width: f64, height: f64) -> Result<Self> {
        let invalid = || FillError::InvalidBounds { width, height };
        let ok = |v: f64| v.is_finite() && v > 0.0;
        if !ok(width) || !ok(height) {
            return Err(invalid());
        }
        // Lattice indices are i32 and the point count a usize.
        let span = |v: f64| -> Option<i32> {
            i32::try_from(v.floor() as i64).ok()?.checked_add(1)
        };
        let (cols, rows) = span(width).zip(span(height)).ok_or_else(invalid)?;
        (cols as usize).checked_mul(rows as usize).ok_or_else(invalid)?;
        Ok(Self {
            width,
            height,
            cols,
            rows,
            plants: Vec::new(),
            version: GardenVersion::default(),
        })
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn plants(&self) -> &[Plant] {
        &self.plants
    }

    pub fn len(&self) -> usize {
        self.plants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plants.is_empty()
    }

    pub fn version(&self) -> GardenVersion {
        self.version
    }

    /// Lattice columns and rows: every integer point in `[0, W] x [0, H]`.
    pub fn lattice_dims(&self) -> (i32, i32) {
        (self.cols, self.rows)
    }

    /// Checked against overflow in `Garden::new`.
    pub fn lattice_points(&self) -> usize {
        self.cols as usize * self.rows as usize
    }

    pub fn center(&self) -> GridPos {
        GridPos::new(
            (self.width / 2.0).floor() as i32,
            (self.height / 2.0).floor() as i32,
        )
    }

    pub fn place(&mut self, plant: Plant) {
        self.plants.push(plant);
        self.version.placements += 1;
    }

    /// Commits several plants as one step.
    pub fn place_batch(&mut self, plants: Vec<Plant>) {
        self.version.placements += plants.len() as u64;
        self.plants.extend(plants);
    }

    pub fn remove(&mut self, index: usize) -> Plant {
        let plant = self.plants.remove(index);
        self.version.placements -= 1;
        self.version.epoch += 1;
        plant
    }

    /// Drops every plant from `len` onwards, returning them in order.
    pub fn truncate(&mut self, len: usize) -> Vec<Plant> {
        if len >= self.plants.len() {
            return Vec::new();
        }
        let removed = self.plants.split_off(len);
        self.version.placements -= removed.len() as u64;
        self.version.epoch += 1;
        removed
    }

    /// Hypothetical garden with one extra plant, for simulation only.
    pub fn with_plant(&self, variety: &Variety, position: Position) -> Garden {
        let mut next = self.clone();
        next.place(Plant {
            variety: variety.clone(),
            position,
            slot: usize::MAX,
        });
        next
    }

    /// Sum of each nutrient coefficient over the planted garden.
    pub fn nutrient_totals(&self) -> [f64; 3] {
        let mut totals = [0.0; 3];
        for p in &self.plants {
            for (t, c) in totals.iter_mut().zip(p.variety.nutrients.as_array()) {
                *t += c;
            }
        }
        totals
    }
}
