//! Circle geometry: spacing, interaction and overlap-area queries.
//!
//! Two plants collide when their centres sit closer than the larger
//! radius. They interact when they belong to different species and
//! their circles overlap. Everything else the search needs from
//! geometry is built on these two predicates and the lens area.

use std::f64::consts::PI;

use crate::garden::{Garden, Plant};
use crate::types::{Position, SpeciesSet, Variety};

/// Strips used to integrate the part of a disc outside the garden.
const OUTSIDE_STRIPS: usize = 64;

/// Geometric queries the search relies on. Implementations must be
/// pure functions of their arguments so results can be cached per
/// garden version and computed from worker threads.
pub trait GeometryOracle: Send + Sync {
    /// True if a plant of `variety` at `position` is too close to `other`.
    fn collides_with(&self, variety: &Variety, position: Position, other: &Plant) -> bool;

    fn interacts_with(&self, variety: &Variety, position: Position, other: &Plant) -> bool;

    /// Area shared between the candidate disc and `other`.
    fn overlap_with(&self, variety: &Variety, position: Position, other: &Plant) -> f64;

    /// Area of the candidate disc lying outside the garden rectangle.
    fn outside_area(&self, variety: &Variety, position: Position, garden: &Garden) -> f64;

    fn in_bounds(&self, position: Position, garden: &Garden) -> bool;

    fn collides(&self, variety: &Variety, position: Position, garden: &Garden) -> bool {
        garden
            .plants()
            .iter()
            .any(|p| self.collides_with(variety, position, p))
    }

    /// Distinct species among garden plants the candidate would interact with.
    fn interacting_species(
        &self,
        variety: &Variety,
        position: Position,
        garden: &Garden,
    ) -> SpeciesSet {
        garden
            .plants()
            .iter()
            .filter(|p| self.interacts_with(variety, position, p))
            .map(|p| p.species())
            .collect()
    }

    fn overlap_area(&self, variety: &Variety, position: Position, garden: &Garden) -> f64 {
        garden
            .plants()
            .iter()
            .map(|p| self.overlap_with(variety, position, p))
            .sum()
    }

    /// Distinct partner species of the plant already at `index`.
    fn partner_species(&self, garden: &Garden, index: usize) -> SpeciesSet {
        let plants = garden.plants();
        let Some(me) = plants.get(index) else {
            return SpeciesSet::default();
        };
        plants
            .iter()
            .enumerate()
            .filter(|&(j, p)| j != index && self.interacts_with(&me.variety, me.position, p))
            .map(|(_, p)| p.species())
            .collect()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CircleGeometry {
    pub tolerance: f64,
}

impl CircleGeometry {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }
}

impl Default for CircleGeometry {
    fn default() -> Self {
        Self::new(1e-6)
    }
}

impl GeometryOracle for CircleGeometry {
    fn collides_with(&self, variety: &Variety, position: Position, other: &Plant) -> bool {
        circles_collide(
            position,
            variety.radius,
            other.position,
            other.radius(),
            self.tolerance,
        )
    }

    fn interacts_with(&self, variety: &Variety, position: Position, other: &Plant) -> bool {
        variety.species != other.species()
            && circles_interact(position, variety.radius, other.position, other.radius())
    }

    fn overlap_with(&self, variety: &Variety, position: Position, other: &Plant) -> f64 {
        lens_area(
            position.distance(&other.position),
            variety.radius,
            other.radius(),
        )
    }

    fn outside_area(&self, variety: &Variety, position: Position, garden: &Garden) -> f64 {
        disc_area_outside(position, variety.radius, garden.width(), garden.height())
    }

    fn in_bounds(&self, position: Position, garden: &Garden) -> bool {
        in_rect(position, garden.width(), garden.height())
    }
}

pub fn circles_collide(a: Position, ra: f64, b: Position, rb: f64, tolerance: f64) -> bool {
    a.distance(&b) < ra.max(rb) - tolerance
}

/// Species are not checked here; see `GeometryOracle::interacts_with`.
pub fn circles_interact(a: Position, ra: f64, b: Position, rb: f64) -> bool {
    a.distance(&b) < ra + rb
}

pub fn in_rect(p: Position, width: f64, height: f64) -> bool {
    (0.0..=width).contains(&p.x) && (0.0..=height).contains(&p.y)
}

/// Intersection area of two circles whose centres are `d` apart.
pub fn lens_area(d: f64, r1: f64, r2: f64) -> f64 {
    if d >= r1 + r2 {
        return 0.0;
    }
    if d <= (r1 - r2).abs() {
        let r = r1.min(r2);
        return PI * r * r;
    }
    let a1 = ((d * d + r1 * r1 - r2 * r2) / (2.0 * d * r1)).clamp(-1.0, 1.0);
    let a2 = ((d * d + r2 * r2 - r1 * r1) / (2.0 * d * r2)).clamp(-1.0, 1.0);
    let k = (-d + r1 + r2) * (d + r1 - r2) * (d - r1 + r2) * (d + r1 + r2);
    r1 * r1 * a1.acos() + r2 * r2 * a2.acos() - 0.5 * k.max(0.0).sqrt()
}

/// Area of the disc outside `[0, width] x [0, height]`, integrated
/// over horizontal strips.
pub fn disc_area_outside(center: Position, r: f64, width: f64, height: f64) -> f64 {
    if center.x - r >= 0.0
        && center.x + r <= width
        && center.y - r >= 0.0
        && center.y + r <= height
    {
        return 0.0;
    }
    let h = 2.0 * r / OUTSIDE_STRIPS as f64;
    let mut outside = 0.0;
    for i in 0..OUTSIDE_STRIPS {
        let y = center.y - r + (i as f64 + 0.5) * h;
        let dy = y - center.y;
        let half = (r * r - dy * dy).max(0.0).sqrt();
        let chord = 2.0 * half;
        let inside = if (0.0..=height).contains(&y) {
            let lo = (center.x - half).max(0.0);
            let hi = (center.x + half).min(width);
            (hi - lo).max(0.0)
        } else {
            0.0
        };
        outside += (chord - inside) * h;
    }
    outside
}
