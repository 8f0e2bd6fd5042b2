//! Data types for the garden placement engine.
//!
//! Everything that crosses the JSON boundary derives Serialize +
//! Deserialize so it can round-trip through the interchange format.
//! The mutable garden itself lives in `garden.rs`.

use serde::{Deserialize, Serialize};

use crate::error::FillError;
use crate::garden::GardenVersion;

// -- Species / nutrients -------------------------------------------

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Species {
    Rhododendron,
    Geranium,
    Begonia,
}

impl Species {
    pub const ALL: [Species; 3] = [Species::Rhododendron, Species::Geranium, Species::Begonia];

    /// Index of the micronutrient this species natively produces.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn letter(self) -> char {
        match self {
            Species::Rhododendron => 'R',
            Species::Geranium => 'G',
            Species::Begonia => 'B',
        }
    }
}

/// Per-turn micronutrient coefficients. Positive values are produced,
/// negative values are demanded.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NutrientProfile {
    #[serde(default)]
    pub r: f64,
    #[serde(default)]
    pub g: f64,
    #[serde(default)]
    pub b: f64,
}

impl NutrientProfile {
    pub fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    pub fn as_array(&self) -> [f64; 3] {
        [self.r, self.g, self.b]
    }
}

/// Small set of species stored as a bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SpeciesSet(u8);

impl SpeciesSet {
    pub fn insert(&mut self, species: Species) {
        self.0 |= 1 << species.index();
    }

    pub fn contains(&self, species: Species) -> bool {
        self.0 & (1 << species.index()) != 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Species> + '_ {
        Species::ALL.into_iter().filter(|s| self.contains(*s))
    }
}

impl FromIterator<Species> for SpeciesSet {
    fn from_iter<I: IntoIterator<Item = Species>>(iter: I) -> Self {
        let mut set = SpeciesSet::default();
        for s in iter {
            set.insert(s);
        }
        set
    }
}

// -- Positions -----------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn offset(&self, dx: f64, dy: f64) -> Position {
        Position::new(self.x + dx, self.y + dy)
    }
}

/// Integer lattice point. Candidates only ever live on the lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

impl GridPos {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn to_position(self) -> Position {
        Position::new(self.x as f64, self.y as f64)
    }
}

// -- Varieties -----------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variety {
    pub name: String,
    pub species: Species,
    pub radius: f64,
    #[serde(default)]
    pub nutrients: NutrientProfile,
}

impl Variety {
    pub fn new(
        name: impl Into<String>,
        species: Species,
        radius: f64,
        nutrients: NutrientProfile,
    ) -> Self {
        Self {
            name: name.into(),
            species,
            radius,
            nutrients,
        }
    }

    /// Signature under which two varieties are interchangeable.
    pub fn key(&self) -> VarietyKey {
        let n = self.nutrients.as_array();
        VarietyKey {
            species: self.species,
            radius_bits: self.radius.to_bits(),
            nutrient_bits: [n[0].to_bits(), n[1].to_bits(), n[2].to_bits()],
        }
    }

    pub fn validate(&self) -> Result<(), FillError> {
        if !self.radius.is_finite() || self.radius <= 0.0 {
            return Err(FillError::InvalidVariety {
                name: self.name.clone(),
                reason: format!("radius must be positive and finite, got {}", self.radius),
            });
        }
        if self.nutrients.as_array().iter().any(|c| !c.is_finite()) {
            return Err(FillError::InvalidVariety {
                name: self.name.clone(),
                reason: "nutrient coefficients must be finite".into(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarietyKey {
    pub species: Species,
    radius_bits: u64,
    nutrient_bits: [u64; 3],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogVariety {
    pub item: Variety,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
}

// -- Tuning --------------------------------------------------------

/// How many heuristic survivors move on to simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopK {
    Count(usize),
    Fraction(f64),
}

impl TopK {
    pub fn resolve(&self, total: usize) -> usize {
        match *self {
            TopK::Count(n) => n.min(total),
            TopK::Fraction(f) => {
                // 100 * 0.3 lands a hair above 30 in f64
                let n = (total as f64 * f - 1e-9).ceil().max(1.0) as usize;
                n.min(total)
            }
        }
    }
}

fn default_max_turns() -> u32 {
    100
}
fn default_min_turns() -> u32 {
    10
}
fn default_depth_decay() -> f64 {
    0.7
}
fn default_heuristic_top_k() -> TopK {
    TopK::Count(30)
}
fn default_finegrained_top_k() -> usize {
    4
}
fn default_finegrained_turns() -> u32 {
    500
}
fn default_epsilon() -> f64 {
    -10.0
}
fn default_tolerance() -> f64 {
    1e-6
}
fn default_area_power() -> f64 {
    1.5
}
fn default_workers() -> usize {
    4
}
fn default_parallel_threshold() -> usize {
    8
}
fn default_true() -> bool {
    true
}
fn default_max_group_size() -> usize {
    7
}
fn default_min_group_size() -> usize {
    3
}
fn default_min_partner_species() -> usize {
    2
}
fn default_short_term_turns() -> usize {
    5
}
fn default_short_term_weight() -> f64 {
    0.2
}
fn default_long_term_weight() -> f64 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillConfig {
    /// Simulation depth at the start of the fill (`T_max`).
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,
    /// Simulation depth once the garden is considered full (`T_min`).
    #[serde(default = "default_min_turns")]
    pub min_turns: u32,
    /// Exponent applied to progress in the depth schedule (`alpha`).
    #[serde(default = "default_depth_decay")]
    pub depth_decay: f64,
    #[serde(default = "default_heuristic_top_k")]
    pub heuristic_top_k: TopK,
    #[serde(default = "default_finegrained_top_k")]
    pub finegrained_top_k: usize,
    #[serde(default = "default_finegrained_turns")]
    pub finegrained_turns: u32,
    /// Placements scoring at or below this stop a group or the greedy fill.
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
    /// Allowed slack in the collision test.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    #[serde(default = "default_area_power")]
    pub area_power: f64,
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Stages with fewer jobs than this are evaluated on the caller thread.
    #[serde(default = "default_parallel_threshold")]
    pub parallel_threshold: usize,
    #[serde(default = "default_true")]
    pub pattern_grouping: bool,
    #[serde(default = "default_max_group_size")]
    pub max_group_size: usize,
    /// Groups smaller than this are neither replicated nor kept as extra groups.
    #[serde(default = "default_min_group_size")]
    pub min_group_size: usize,
    #[serde(default = "default_min_partner_species")]
    pub min_partner_species: usize,
    #[serde(default = "default_short_term_turns")]
    pub short_term_turns: usize,
    #[serde(default = "default_short_term_weight")]
    pub short_term_weight: f64,
    #[serde(default = "default_long_term_weight")]
    pub long_term_weight: f64,
}

impl Default for FillConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            min_turns: default_min_turns(),
            depth_decay: default_depth_decay(),
            heuristic_top_k: default_heuristic_top_k(),
            finegrained_top_k: default_finegrained_top_k(),
            finegrained_turns: default_finegrained_turns(),
            epsilon: default_epsilon(),
            tolerance: default_tolerance(),
            area_power: default_area_power(),
            workers: default_workers(),
            parallel_threshold: default_parallel_threshold(),
            pattern_grouping: default_true(),
            max_group_size: default_max_group_size(),
            min_group_size: default_min_group_size(),
            min_partner_species: default_min_partner_species(),
            short_term_turns: default_short_term_turns(),
            short_term_weight: default_short_term_weight(),
            long_term_weight: default_long_term_weight(),
        }
    }
}

impl FillConfig {
    pub fn validate(&self) -> Result<(), FillError> {
        let bad = |msg: String| Err(FillError::InvalidConfig(msg));
        if self.min_turns == 0 || self.min_turns > self.max_turns {
            return bad(format!(
                "turn bounds must satisfy 1 <= min_turns <= max_turns, got {}..{}",
                self.min_turns, self.max_turns
            ));
        }
        if !(self.depth_decay > 0.0 && self.depth_decay.is_finite()) {
            return bad(format!("depth_decay must be positive, got {}", self.depth_decay));
        }
        if !(self.area_power > 0.0 && self.area_power < 2.0) {
            return bad(format!("area_power must lie in (0, 2), got {}", self.area_power));
        }
        match self.heuristic_top_k {
            TopK::Count(0) => return bad("heuristic_top_k count must be at least 1".into()),
            TopK::Fraction(f) if !(f > 0.0 && f <= 1.0) => {
                return bad(format!("heuristic_top_k fraction must lie in (0, 1], got {f}"));
            }
            _ => {}
        }
        if self.workers == 0 {
            return bad("workers must be at least 1".into());
        }
        if self.max_group_size == 0 {
            return bad("max_group_size must be at least 1".into());
        }
        if self.min_partner_species == 0 {
            return bad("min_partner_species must be at least 1".into());
        }
        if !(self.tolerance >= 0.0 && self.tolerance.is_finite()) {
            return bad(format!("tolerance must be non-negative, got {}", self.tolerance));
        }
        if self.epsilon.is_nan() {
            return bad("epsilon must be a number".into());
        }
        Ok(())
    }
}

// -- Engine I/O ----------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillParams {
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub catalog: Vec<CatalogVariety>,
    #[serde(default)]
    pub config: FillConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedPlant {
    pub name: String,
    pub species: Species,
    pub radius: f64,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Starter,
    StarterValidation,
    Replication,
    ExtraGroups,
    Greedy,
    FinalValidation,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Starter => "starter group",
            Phase::StarterValidation => "starter validation",
            Phase::Replication => "replication",
            Phase::ExtraGroups => "extra groups",
            Phase::Greedy => "greedy fill",
            Phase::FinalValidation => "final validation",
        };
        f.write_str(name)
    }
}

/// Why a phase stopped. None of these abort the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Halt {
    Completed,
    NoValidCandidate,
    InventoryExhausted,
    BelowEpsilon,
    GroupCeiling,
    NoResidualSpace,
    GroupTooSmall,
    RelaxationRolledBack,
}

/// Candidate counts accumulated over the selections of one phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StageCounts {
    pub generated: usize,
    pub admissible: usize,
    pub heuristic_kept: usize,
    pub buckets: usize,
    pub simulated: usize,
    pub refined: usize,
}

impl StageCounts {
    pub fn absorb(&mut self, other: &StageCounts) {
        self.generated += other.generated;
        self.admissible += other.admissible;
        self.heuristic_kept += other.heuristic_kept;
        self.buckets += other.buckets;
        self.simulated += other.simulated;
        self.refined += other.refined;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseReport {
    pub phase: Phase,
    pub halt: Halt,
    #[serde(default)]
    pub plants_added: usize,
    #[serde(default)]
    pub plants_removed: usize,
    #[serde(default)]
    pub selections: usize,
    #[serde(default)]
    pub relaxations: usize,
    #[serde(default)]
    pub rollbacks: usize,
    #[serde(default)]
    pub copies: usize,
    #[serde(default)]
    pub groups: usize,
    #[serde(default)]
    pub counts: StageCounts,
    #[serde(default)]
    pub elapsed_ms: u64,
}

impl PhaseReport {
    pub fn new(phase: Phase) -> Self {
        Self {
            phase,
            halt: Halt::Completed,
            plants_added: 0,
            plants_removed: 0,
            selections: 0,
            relaxations: 0,
            rollbacks: 0,
            copies: 0,
            groups: 0,
            counts: StageCounts::default(),
            elapsed_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillResult {
    pub width: f64,
    pub height: f64,
    pub plants: Vec<PlacedPlant>,
    pub version: GardenVersion,
    #[serde(default)]
    pub phases: Vec<PhaseReport>,
    #[serde(default)]
    pub cache_hits: u64,
    #[serde(default)]
    pub cache_misses: u64,
}

// -- Tests ---------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_fill_in_config_defaults() {
        let json = r#"{
            "width": 16.0,
            "height": 10.0,
            "catalog": [{
                "item": {
                    "name": "azalea",
                    "species": "rhododendron",
                    "radius": 2.0,
                    "nutrients": {"r": 1.0, "g": -0.5, "b": -0.5}
                },
                "quantity": 3
            }],
            "config": {"workers": 2, "heuristic_top_k": {"fraction": 0.3}}
        }"#;

        let params: FillParams = serde_json::from_str(json).expect("deserialize");
        assert_eq!(params.catalog.len(), 1);
        assert_eq!(params.catalog[0].quantity, Some(3));
        assert_eq!(params.catalog[0].item.species, Species::Rhododendron);
        assert_eq!(params.config.workers, 2);
        assert_eq!(params.config.heuristic_top_k, TopK::Fraction(0.3));
        assert_eq!(params.config.max_turns, 100);
        assert_eq!(params.config.finegrained_turns, 500);
        assert_eq!(params.config.epsilon, -10.0);
        assert!(params.config.validate().is_ok());
    }

    #[test]
    fn empty_config_matches_default() {
        let json = r#"{"width": 5.0, "height": 5.0}"#;
        let params: FillParams = serde_json::from_str(json).expect("deserialize");
        let d = FillConfig::default();
        assert!(params.catalog.is_empty());
        assert_eq!(params.config.max_turns, d.max_turns);
        assert_eq!(params.config.min_turns, d.min_turns);
        assert_eq!(params.config.heuristic_top_k, d.heuristic_top_k);
        assert_eq!(params.config.max_group_size, d.max_group_size);
    }

    #[test]
    fn serde_and_default_agree_on_every_field() {
        let from_json: FillConfig = serde_json::from_str("{}").expect("deserialize");
        assert_eq!(
            serde_json::to_value(&from_json).unwrap(),
            serde_json::to_value(FillConfig::default()).unwrap()
        );
    }

    #[test]
    fn config_rejects_inverted_turn_bounds() {
        let config = FillConfig {
            min_turns: 50,
            max_turns: 10,
            ..FillConfig::default()
        };
        assert!(matches!(config.validate(), Err(FillError::InvalidConfig(_))));
    }

    #[test]
    fn config_rejects_quadratic_area_power() {
        let config = FillConfig {
            area_power: 2.0,
            ..FillConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn top_k_resolution() {
        assert_eq!(TopK::Count(30).resolve(100), 30);
        assert_eq!(TopK::Count(30).resolve(7), 7);
        assert_eq!(TopK::Fraction(0.3).resolve(100), 30);
        assert_eq!(TopK::Fraction(0.3).resolve(1), 1);
        assert_eq!(TopK::Fraction(0.3).resolve(0), 0);
    }

    #[test]
    fn variety_key_ignores_name() {
        let a = Variety::new("a", Species::Geranium, 1.0, NutrientProfile::new(-1.0, 2.0, 0.0));
        let b = Variety::new("b", Species::Geranium, 1.0, NutrientProfile::new(-1.0, 2.0, 0.0));
        let c = Variety::new("c", Species::Geranium, 2.0, NutrientProfile::new(-1.0, 2.0, 0.0));
        assert_eq!(a.key(), b.key());
        assert_ne!(a.key(), c.key());
    }

    #[test]
    fn variety_rejects_bad_radius() {
        let v = Variety::new("x", Species::Begonia, 0.0, NutrientProfile::default());
        assert!(matches!(v.validate(), Err(FillError::InvalidVariety { .. })));
        let v = Variety::new("x", Species::Begonia, f64::NAN, NutrientProfile::default());
        assert!(v.validate().is_err());
    }

    #[test]
    fn species_set_counts_distinct() {
        let set: SpeciesSet = [Species::Begonia, Species::Begonia, Species::Geranium]
            .into_iter()
            .collect();
        assert_eq!(set.len(), 2);
        assert!(set.contains(Species::Begonia));
        assert!(!set.contains(Species::Rhododendron));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![Species::Geranium, Species::Begonia]);
    }
}
