//! Simulation-based candidate scoring.
//!
//! A candidate's score is the change in weighted yield from adding it to
//! the garden, divided by its effective area. Depth shrinks as the garden
//! fills so early, formative decisions get the longest look ahead.

use crate::collision::GeometryOracle;
use crate::error::OracleError;
use crate::garden::Garden;
use crate::growth::GrowthOracle;
use crate::heuristic::effective_area;
use crate::types::{FillConfig, Position, Species, Variety, VarietyKey};

/// Simulation depth for a garden that is `progress` of the way full.
///
/// `T = T_max * (T_min / T_max)^(progress^alpha)`: a geometric decay from
/// `T_max` to `T_min`, rounded, with `progress` clamped to `[0, 1]`.
pub fn adaptive_turns(progress: f64, min_turns: u32, max_turns: u32, alpha: f64) -> u32 {
    if max_turns <= min_turns {
        return max_turns.max(1);
    }
    let p = if progress.is_finite() {
        progress.clamp(0.0, 1.0)
    } else {
        1.0
    };
    let ratio = min_turns as f64 / max_turns as f64;
    let t = max_turns as f64 * ratio.powf(p.powf(alpha));
    (t.round() as u32).clamp(min_turns.max(1), max_turns)
}

/// Short-term yields are summed, the rest averaged.
#[derive(Debug, Clone, Copy)]
pub struct YieldWeights {
    pub short_term_turns: usize,
    pub short_term_weight: f64,
    pub long_term_weight: f64,
}

impl YieldWeights {
    pub fn from_config(config: &FillConfig) -> Self {
        Self {
            short_term_turns: config.short_term_turns,
            short_term_weight: config.short_term_weight,
            long_term_weight: config.long_term_weight,
        }
    }

    pub fn weigh(&self, yields: &[f64]) -> f64 {
        let split = self.short_term_turns.min(yields.len());
        let (short, long) = yields.split_at(split);
        let short_sum: f64 = short.iter().sum();
        let long_mean = if long.is_empty() {
            0.0
        } else {
            long.iter().sum::<f64>() / long.len() as f64
        };
        self.short_term_weight * short_sum + self.long_term_weight * long_mean
    }
}

pub struct SimulationEvaluator<'a> {
    geometry: &'a dyn GeometryOracle,
    growth: &'a dyn GrowthOracle,
    weights: YieldWeights,
    area_power: f64,
}

impl<'a> SimulationEvaluator<'a> {
    pub fn new(
        geometry: &'a dyn GeometryOracle,
        growth: &'a dyn GrowthOracle,
        config: &FillConfig,
    ) -> Self {
        Self {
            geometry,
            growth,
            weights: YieldWeights::from_config(config),
            area_power: config.area_power,
        }
    }

    /// Weighted yield of the garden as it stands.
    pub fn baseline(&self, garden: &Garden, turns: u32) -> Result<f64, OracleError> {
        let yields = self.growth.simulate(garden, turns)?;
        Ok(self.weights.weigh(&yields))
    }

    /// Marginal weighted yield per unit of effective area.
    pub fn score(
        &self,
        garden: &Garden,
        variety: &Variety,
        position: Position,
        turns: u32,
        baseline: f64,
    ) -> Result<f64, OracleError> {
        let with = garden.with_plant(variety, position);
        let yields = self.growth.simulate(&with, turns)?;
        let gain = self.weights.weigh(&yields) - baseline;
        let area = effective_area(self.geometry, garden, variety, position, self.area_power);
        let score = gain / area;
        if !score.is_finite() {
            return Err(OracleError(format!("non-finite score {score}")));
        }
        Ok(score)
    }
}

/// Bucket key for pattern grouping. Candidates sharing a pattern are
/// treated as interchangeable and only the heuristic leader of each
/// bucket is simulated. This is an approximation: members can differ in
/// overlap, edge spill and second-order neighbours, and those differences
/// go unexamined.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InteractionPattern {
    pub variety: VarietyKey,
    pub partners: Vec<(Species, VarietyKey)>,
}

pub fn interaction_pattern(
    geometry: &dyn GeometryOracle,
    garden: &Garden,
    variety: &Variety,
    position: Position,
) -> InteractionPattern {
    let mut partners: Vec<(Species, VarietyKey)> = garden
        .plants()
        .iter()
        .filter(|p| geometry.interacts_with(variety, position, p))
        .map(|p| (p.species(), p.variety.key()))
        .collect();
    partners.sort();
    InteractionPattern {
        variety: variety.key(),
        partners,
    }
}
