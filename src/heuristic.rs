//! Cheap analytic candidate score.
//!
//! Rewards nutrient production, weighted toward nutrients the garden is
//! short on, plus the exchange the candidate could strike with each
//! planted partner, all normalized by the candidate's effective area.

use crate::collision::GeometryOracle;
use crate::garden::Garden;
use crate::types::{NutrientProfile, Position, Variety};

/// Floor for the effective-area denominator.
pub const MIN_EFFECTIVE_AREA: f64 = 0.05;

/// `r^p` minus the area shared with planted circles and the area
/// spilling over the garden edge, each weighted by `0.5 * r`.
pub fn effective_area(
    geometry: &dyn GeometryOracle,
    garden: &Garden,
    variety: &Variety,
    position: Position,
    area_power: f64,
) -> f64 {
    let base = variety.radius.powf(area_power);
    let shared = geometry.overlap_area(variety, position, garden);
    let outside = geometry.outside_area(variety, position, garden);
    let penalty = 0.5 * variety.radius;
    (base - penalty * shared - penalty * outside).max(MIN_EFFECTIVE_AREA)
}

/// Amount of nutrient `a` can supply toward `b`'s demands.
pub fn nutrient_offer(a: &NutrientProfile, b: &NutrientProfile) -> f64 {
    a.as_array()
        .iter()
        .zip(b.as_array())
        .map(|(x, y)| x.max(0.0).min((-y).max(0.0)))
        .sum()
}

/// Scores candidates against one garden state. Build once per selection.
pub struct HeuristicScorer<'a> {
    garden: &'a Garden,
    geometry: &'a dyn GeometryOracle,
    deficit: [f64; 3],
    area_power: f64,
}

impl<'a> HeuristicScorer<'a> {
    pub fn new(garden: &'a Garden, geometry: &'a dyn GeometryOracle, area_power: f64) -> Self {
        let totals = garden.nutrient_totals();
        let max = totals.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mut deficit = [0.0; 3];
        for (d, t) in deficit.iter_mut().zip(totals) {
            *d = (max - t) / (max.abs() + 1.0);
        }
        Self {
            garden,
            geometry,
            deficit,
            area_power,
        }
    }

    pub fn score(&self, variety: &Variety, position: Position) -> f64 {
        let produce: f64 = variety
            .nutrients
            .as_array()
            .iter()
            .zip(self.deficit)
            .map(|(c, d)| c.max(0.0) * (1.0 + d))
            .sum();

        let exchange: f64 = self
            .garden
            .plants()
            .iter()
            .filter(|p| self.geometry.interacts_with(variety, position, p))
            .map(|p| {
                let give = nutrient_offer(&variety.nutrients, &p.variety.nutrients);
                let get = nutrient_offer(&p.variety.nutrients, &variety.nutrients);
                give.min(get)
            })
            .sum();

        let area = effective_area(self.geometry, self.garden, variety, position, self.area_power);
        (produce + exchange) / area
    }
}
