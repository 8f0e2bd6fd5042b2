//! Growth oracle: turn-by-turn yield of a garden.
//!
//! The reference model is a three-nutrient exchange economy. Each turn
//! every plant produces the nutrients it has positive coefficients for,
//! hands part of its stock to interacting partners that demand them,
//! and grows by its radius when its stock covers every demand.

use crate::collision::circles_interact;
use crate::error::OracleError;
use crate::garden::Garden;

pub trait GrowthOracle: Send + Sync {
    /// Per-turn yields for `turns` turns, index 0 being turn 1.
    fn simulate(&self, garden: &Garden, turns: u32) -> Result<Vec<f64>, OracleError>;
}

#[derive(Debug, Clone, Copy)]
pub struct NutrientModel {
    /// Fraction of a plant's stock offered to its partners each turn.
    pub exchange_fraction: f64,
    pub storage_factor: f64,
    pub max_size_factor: f64,
}

impl Default for NutrientModel {
    fn default() -> Self {
        Self {
            exchange_fraction: 0.5,
            storage_factor: 10.0,
            max_size_factor: 100.0,
        }
    }
}

struct PlantState {
    coeffs: [f64; 3],
    stock: [f64; 3],
    capacity: f64,
    size: f64,
    max_size: f64,
    step: f64,
}

impl GrowthOracle for NutrientModel {
    fn simulate(&self, garden: &Garden, turns: u32) -> Result<Vec<f64>, OracleError> {
        let plants = garden.plants();
        let n = plants.len();
        let mut states: Vec<PlantState> = plants
            .iter()
            .map(|p| {
                let r = p.radius();
                PlantState {
                    coeffs: p.variety.nutrients.as_array(),
                    stock: [0.0; 3],
                    capacity: self.storage_factor * r * r,
                    size: 0.0,
                    max_size: self.max_size_factor * r * r,
                    step: r,
                }
            })
            .collect();

        let mut partners: Vec<Vec<usize>> = vec![Vec::new(); n];
        for i in 0..n {
            for j in (i + 1)..n {
                let (a, b) = (&plants[i], &plants[j]);
                if a.species() != b.species()
                    && circles_interact(a.position, a.radius(), b.position, b.radius())
                {
                    partners[i].push(j);
                    partners[j].push(i);
                }
            }
        }

        let mut yields = Vec::with_capacity(turns as usize);
        let mut delta = vec![[0.0; 3]; n];
        for turn in 0..turns {
            for s in states.iter_mut() {
                for k in 0..3 {
                    if s.coeffs[k] > 0.0 {
                        s.stock[k] = (s.stock[k] + s.coeffs[k]).min(s.capacity);
                    }
                }
            }

            // Offers are computed from the stock before any transfer.
            for d in delta.iter_mut() {
                *d = [0.0; 3];
            }
            for i in 0..n {
                let degree = partners[i].len();
                if degree == 0 {
                    continue;
                }
                for &j in &partners[i] {
                    for k in 0..3 {
                        if states[i].coeffs[k] > 0.0 && states[j].coeffs[k] < 0.0 {
                            let amount =
                                states[i].stock[k] * self.exchange_fraction / degree as f64;
                            delta[i][k] -= amount;
                            delta[j][k] += amount;
                        }
                    }
                }
            }
            for (s, d) in states.iter_mut().zip(&delta) {
                for k in 0..3 {
                    s.stock[k] = (s.stock[k] + d[k]).clamp(0.0, s.capacity);
                }
            }

            let mut total = 0.0;
            for s in states.iter_mut() {
                if s.size >= s.max_size {
                    continue;
                }
                let fed = (0..3).all(|k| s.coeffs[k] >= 0.0 || s.stock[k] >= -s.coeffs[k]);
                if !fed {
                    continue;
                }
                for k in 0..3 {
                    if s.coeffs[k] < 0.0 {
                        s.stock[k] += s.coeffs[k];
                    }
                }
                let g = s.step.min(s.max_size - s.size);
                s.size += g;
                total += g;
            }
            if !total.is_finite() {
                return Err(OracleError(format!(
                    "non-finite yield {total} on turn {}",
                    turn + 1
                )));
            }
            yields.push(total);
        }
        Ok(yields)
    }
}
