//! Group construction.
//!
//! A group grows around an anchor: the first plant goes as close to the
//! anchor as it fits, the second must interact with the first and be of
//! another species, and every later plant must interact with enough
//! distinct partner species. Once per group the diversity requirement may
//! be relaxed to a single partner species; if the plant after the relaxed
//! one cannot be placed under the full requirement, the relaxed plant is
//! taken back out and the group stops.
//!
//! The greedy fill reuses the same machinery with no anchor, no size
//! ceiling and no relaxation.

use tracing::{debug, info};

use crate::candidates::open_cells;
use crate::error::Result;
use crate::garden::{Garden, Plant};
use crate::inventory::Inventory;
use crate::pipeline::{select_best, Constraint, SearchContext, Selection};
use crate::types::{GridPos, Halt, Phase, StageCounts, Variety};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupState {
    Empty,
    Seeded,
    Growing,
    Stopped,
    Failed,
}

#[derive(Debug, Clone, Copy)]
pub enum GroupMode {
    Anchored { anchor: GridPos, max_size: usize },
    Greedy,
}

#[derive(Debug, Clone)]
pub struct GroupOutcome {
    /// Garden index of the group's first plant.
    pub start: usize,
    pub len: usize,
    pub state: GroupState,
    pub halt: Halt,
    pub selections: usize,
    pub relaxations: usize,
    pub rollbacks: usize,
    pub counts: StageCounts,
}

pub struct GroupBuilder<'c, 'a> {
    ctx: &'c SearchContext<'a>,
    mode: GroupMode,
    phase: Phase,
    state: GroupState,
    relaxation_token: bool,
    /// Set while the most recent plant was placed under relaxation.
    pending_relaxed: bool,
    start: usize,
    selections: usize,
    relaxations: usize,
    rollbacks: usize,
    counts: StageCounts,
}

impl<'c, 'a> GroupBuilder<'c, 'a> {
    pub fn new(ctx: &'c SearchContext<'a>, mode: GroupMode, phase: Phase) -> Self {
        let (state, token) = match mode {
            GroupMode::Anchored { .. } => (GroupState::Empty, true),
            GroupMode::Greedy => (GroupState::Growing, false),
        };
        Self {
            ctx,
            mode,
            phase,
            state,
            relaxation_token: token,
            pending_relaxed: false,
            start: 0,
            selections: 0,
            relaxations: 0,
            rollbacks: 0,
            counts: StageCounts::default(),
        }
    }

    pub fn build(mut self, garden: &mut Garden, inventory: &mut Inventory) -> Result<GroupOutcome> {
        self.start = garden.len();
        let halt = loop {
            let step = match self.state {
                GroupState::Empty => self.seed(garden, inventory)?,
                GroupState::Seeded => self.second(garden, inventory)?,
                GroupState::Growing => self.grow(garden, inventory)?,
                GroupState::Stopped | GroupState::Failed => None,
            };
            if let Some(halt) = step {
                break halt;
            }
        };
        let outcome = GroupOutcome {
            start: self.start,
            len: garden.len() - self.start,
            state: self.state,
            halt,
            selections: self.selections,
            relaxations: self.relaxations,
            rollbacks: self.rollbacks,
            counts: self.counts,
        };
        debug!(
            phase = ?self.phase,
            start = outcome.start,
            len = outcome.len,
            state = ?outcome.state,
            halt = ?outcome.halt,
            "group finished"
        );
        Ok(outcome)
    }

    fn group_len(&self, garden: &Garden) -> usize {
        garden.len() - self.start
    }

    fn max_size(&self) -> usize {
        match self.mode {
            GroupMode::Anchored { max_size, .. } => max_size,
            GroupMode::Greedy => usize::MAX,
        }
    }

    fn select(
        &mut self,
        garden: &Garden,
        inventory: &Inventory,
        constraint: Constraint,
    ) -> Result<Option<Selection>> {
        let (sel, counts) = select_best(self.ctx, garden, inventory, &constraint, self.phase)?;
        self.counts.absorb(&counts);
        Ok(sel)
    }

    /// Halt to report when a selection came back empty.
    fn empty_halt(inventory: &Inventory) -> Halt {
        if inventory.remaining() == 0 {
            Halt::InventoryExhausted
        } else {
            Halt::NoValidCandidate
        }
    }

    fn commit(&mut self, garden: &mut Garden, inventory: &mut Inventory, sel: &Selection) -> bool {
        let Some((slot, variety)) = inventory.take_key(sel.candidate.variety.key()) else {
            return false;
        };
        garden.place(Plant {
            variety,
            position: sel.candidate.position(),
            slot,
        });
        self.selections += 1;
        true
    }

    fn fail(&mut self, halt: Halt) -> Option<Halt> {
        self.state = GroupState::Failed;
        Some(halt)
    }

    fn stop(&mut self, halt: Halt) -> Option<Halt> {
        self.state = GroupState::Stopped;
        Some(halt)
    }

    fn seed(&mut self, garden: &mut Garden, inventory: &mut Inventory) -> Result<Option<Halt>> {
        let GroupMode::Anchored { anchor, .. } = self.mode else {
            self.state = GroupState::Growing;
            return Ok(None);
        };
        let reps = inventory.representatives();
        if reps.is_empty() {
            return Ok(self.fail(Halt::InventoryExhausted));
        }
        let Some(cell) = nearest_open_cell(garden, self.ctx, &reps, anchor) else {
            return Ok(self.fail(Halt::NoResidualSpace));
        };
        let constraint = Constraint {
            at: Some(cell),
            ..Constraint::default()
        };
        match self.select(garden, inventory, constraint)? {
            Some(sel) if self.commit(garden, inventory, &sel) => {
                self.state = GroupState::Seeded;
                Ok(None)
            }
            _ => Ok(self.fail(Self::empty_halt(inventory))),
        }
    }

    fn second(&mut self, garden: &mut Garden, inventory: &mut Inventory) -> Result<Option<Halt>> {
        if self.group_len(garden) >= self.max_size() {
            return Ok(self.stop(Halt::GroupCeiling));
        }
        let first = &garden.plants()[self.start];
        let constraint = Constraint {
            exclude_species: Some(first.species()),
            partner_of: Some(self.start),
            ..Constraint::default()
        };
        match self.select(garden, inventory, constraint)? {
            Some(sel) if self.commit(garden, inventory, &sel) => {
                self.state = GroupState::Growing;
                Ok(None)
            }
            _ => Ok(self.fail(Self::empty_halt(inventory))),
        }
    }

    fn grow(&mut self, garden: &mut Garden, inventory: &mut Inventory) -> Result<Option<Halt>> {
        let len = self.group_len(garden);
        if len >= self.max_size() {
            return Ok(self.stop(Halt::GroupCeiling));
        }
        let required = self.ctx.required_species;
        let epsilon = self.ctx.config.epsilon;
        let full = Constraint {
            min_partner_species: required,
            ..Constraint::default()
        };
        let sel = self.select(garden, inventory, full)?;

        match sel {
            Some(sel) if sel.score > epsilon => {
                if self.commit(garden, inventory, &sel) {
                    self.pending_relaxed = false;
                    return Ok(None);
                }
                Ok(self.after_failure(garden, inventory, Halt::InventoryExhausted))
            }
            Some(_) => Ok(self.after_failure(garden, inventory, Halt::BelowEpsilon)),
            None => {
                let halt = Self::empty_halt(inventory);
                let can_relax = self.relaxation_token
                    && !self.pending_relaxed
                    && required > 1
                    && len + 2 <= self.max_size()
                    && halt == Halt::NoValidCandidate;
                if !can_relax {
                    return Ok(self.after_failure(garden, inventory, halt));
                }
                self.relaxation_token = false;
                let relaxed = Constraint {
                    min_partner_species: 1,
                    ..Constraint::default()
                };
                match self.select(garden, inventory, relaxed)? {
                    Some(sel) if sel.score > epsilon && self.commit(garden, inventory, &sel) => {
                        self.relaxations += 1;
                        self.pending_relaxed = true;
                        debug!(
                            candidate = %sel.candidate.describe(),
                            "placed under relaxed diversity"
                        );
                        Ok(None)
                    }
                    Some(_) => Ok(self.stop(Halt::BelowEpsilon)),
                    None => Ok(self.stop(Self::empty_halt(inventory))),
                }
            }
        }
    }

    /// Ends the group. A relaxed plant that was not followed by a
    /// fully-qualified one is removed first.
    fn after_failure(&mut self, garden: &mut Garden, inventory: &mut Inventory, halt: Halt) -> Option<Halt> {
        if self.pending_relaxed {
            self.pending_relaxed = false;
            for plant in garden.truncate(garden.len() - 1) {
                inventory.restore(plant.slot);
            }
            self.rollbacks += 1;
            info!(phase = ?self.phase, "rolled back relaxed placement");
            return self.stop(Halt::RelaxationRolledBack);
        }
        self.stop(halt)
    }
}

/// Free lattice point closest to `anchor`; ties go to the first in
/// row-major order.
pub fn nearest_open_cell(
    garden: &Garden,
    ctx: &SearchContext<'_>,
    reps: &[Variety],
    anchor: GridPos,
) -> Option<GridPos> {
    let target = anchor.to_position();
    open_cells(garden, ctx.geometry, reps)
        .into_iter()
        .min_by(|a, b| {
            a.to_position()
                .distance(&target)
                .total_cmp(&b.to_position().distance(&target))
        })
}

/// Free lattice point farthest from every planted circle; ties go to
/// the first in row-major order. Empty gardens anchor at the centre.
pub fn residual_anchor(
    garden: &Garden,
    ctx: &SearchContext<'_>,
    reps: &[Variety],
) -> Option<GridPos> {
    let cells = open_cells(garden, ctx.geometry, reps);
    if garden.is_empty() {
        let center = garden.center();
        return cells.contains(&center).then_some(center).or(cells.first().copied());
    }
    let clearance = |c: &GridPos| {
        let p = c.to_position();
        garden
            .plants()
            .iter()
            .map(|plant| p.distance(&plant.position) - plant.radius())
            .fold(f64::INFINITY, f64::min)
    };
    let mut best: Option<(GridPos, f64)> = None;
    for c in cells {
        let d = clearance(&c);
        if best.map_or(true, |(_, bd)| d > bd) {
            best = Some((c, d));
        }
    }
    best.map(|(c, _)| c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InteractionCache;
    use crate::collision::{CircleGeometry, GeometryOracle};
    use crate::error::OracleError;
    use crate::growth::{GrowthOracle, NutrientModel};
    use crate::scheduler::Scheduler;
    use crate::types::{FillConfig, NutrientProfile, Position, Species, SpeciesSet, TopK, Variety};

    fn config() -> FillConfig {
        FillConfig {
            max_turns: 30,
            min_turns: 5,
            finegrained_turns: 40,
            heuristic_top_k: TopK::Count(12),
            epsilon: -1e6,
            workers: 1,
            ..FillConfig::default()
        }
    }

    struct Fixture {
        config: FillConfig,
        geometry: CircleGeometry,
        growth: NutrientModel,
        cache: InteractionCache,
        scheduler: Scheduler,
    }

    impl Fixture {
        fn new(config: FillConfig) -> Self {
            Self {
                geometry: CircleGeometry::new(config.tolerance),
                growth: NutrientModel::default(),
                cache: InteractionCache::new(),
                scheduler: Scheduler::serial(),
                config,
            }
        }

        fn ctx(&self, required_species: usize) -> SearchContext<'_> {
            SearchContext {
                config: &self.config,
                geometry: &self.geometry,
                growth: &self.growth,
                cache: &self.cache,
                scheduler: &self.scheduler,
                required_species,
                capacity: 60.0,
            }
        }
    }

    fn stock(counts: [usize; 3]) -> Inventory {
        let profiles = [
            (Species::Rhododendron, 1.0, NutrientProfile::new(1.0, -0.3, -0.3)),
            (Species::Geranium, 2.0, NutrientProfile::new(-0.3, 1.0, -0.3)),
            (Species::Begonia, 1.0, NutrientProfile::new(-0.3, -0.3, 1.0)),
        ];
        let mut v = Vec::new();
        for ((species, r, n), count) in profiles.into_iter().zip(counts) {
            for _ in 0..count {
                v.push(Variety::new(format!("{}", species.letter()), species, r, n));
            }
        }
        Inventory::new(v).unwrap()
    }

    #[test]
    fn anchored_group_respects_rules() {
        let fx = Fixture::new(config());
        let ctx = fx.ctx(2);
        let mut garden = Garden::new(20.0, 20.0).unwrap();
        let mut inventory = stock([10, 10, 10]);
        let mode = GroupMode::Anchored {
            anchor: garden.center(),
            max_size: 7,
        };
        let out = GroupBuilder::new(&ctx, mode, Phase::Starter)
            .build(&mut garden, &mut inventory)
            .unwrap();

        assert!(out.len >= 3, "{out:?}");
        assert!(out.len <= 7);
        let plants = garden.plants();
        assert_eq!(plants[0].position, Position::new(10.0, 10.0));
        assert_ne!(plants[0].species(), plants[1].species());
        assert!(fx.geometry.interacts_with(&plants[1].variety, plants[1].position, &plants[0]));
        assert_eq!(inventory.remaining(), 30 - garden.len());
        assert_eq!(garden.version().placements as usize, garden.len());
    }

    #[test]
    fn ceiling_stops_group() {
        let fx = Fixture::new(config());
        let ctx = fx.ctx(1);
        let mut garden = Garden::new(20.0, 20.0).unwrap();
        let mut inventory = stock([10, 10, 0]);
        let mode = GroupMode::Anchored {
            anchor: garden.center(),
            max_size: 3,
        };
        let out = GroupBuilder::new(&ctx, mode, Phase::Starter)
            .build(&mut garden, &mut inventory)
            .unwrap();
        assert_eq!(out.len, 3);
        assert_eq!(out.halt, Halt::GroupCeiling);
        assert_eq!(out.state, GroupState::Stopped);
    }

    #[test]
    fn single_species_fails_at_second_plant() {
        let fx = Fixture::new(config());
        let ctx = fx.ctx(1);
        let mut garden = Garden::new(20.0, 20.0).unwrap();
        let mut inventory = stock([5, 0, 0]);
        let mode = GroupMode::Anchored {
            anchor: garden.center(),
            max_size: 7,
        };
        let out = GroupBuilder::new(&ctx, mode, Phase::Starter)
            .build(&mut garden, &mut inventory)
            .unwrap();
        assert_eq!(out.len, 1);
        assert_eq!(out.state, GroupState::Failed);
        assert_eq!(out.halt, Halt::NoValidCandidate);
    }

    #[test]
    fn relaxed_plant_rolled_back_when_next_fails() {
        // Two species only: the full two-partner-species rule can never
        // be met, so the third plant goes in relaxed and is then removed.
        let fx = Fixture::new(config());
        let ctx = fx.ctx(2);
        let mut garden = Garden::new(20.0, 20.0).unwrap();
        let mut inventory = stock([10, 10, 0]);
        let mode = GroupMode::Anchored {
            anchor: garden.center(),
            max_size: 7,
        };
        let out = GroupBuilder::new(&ctx, mode, Phase::Starter)
            .build(&mut garden, &mut inventory)
            .unwrap();
        assert_eq!(out.relaxations, 1);
        assert_eq!(out.rollbacks, 1);
        assert_eq!(out.halt, Halt::RelaxationRolledBack);
        assert_eq!(out.len, 2);
        assert_eq!(garden.len(), 2);
        assert_eq!(inventory.remaining(), 18);
        assert_eq!(garden.version().placements, 2);
    }

    /// Circle geometry in which begonias and geraniums never interact, so a
    /// third plant can never see two partner species until a begonia has
    /// gone in next to the rhododendron.
    struct Segregated(CircleGeometry);

    fn segregated(a: Species, b: Species) -> bool {
        matches!(
            (a, b),
            (Species::Begonia, Species::Geranium) | (Species::Geranium, Species::Begonia)
        )
    }

    impl GeometryOracle for Segregated {
        fn collides_with(&self, variety: &Variety, position: Position, other: &Plant) -> bool {
            self.0.collides_with(variety, position, other)
        }

        fn interacts_with(&self, variety: &Variety, position: Position, other: &Plant) -> bool {
            !segregated(variety.species, other.species())
                && self.0.interacts_with(variety, position, other)
        }

        fn overlap_with(&self, variety: &Variety, position: Position, other: &Plant) -> f64 {
            self.0.overlap_with(variety, position, other)
        }

        fn outside_area(&self, variety: &Variety, position: Position, garden: &Garden) -> f64 {
            self.0.outside_area(variety, position, garden)
        }

        fn in_bounds(&self, position: Position, garden: &Garden) -> bool {
            self.0.in_bounds(position, garden)
        }
    }

    /// Yield rewards species diversity first, then rhododendron count.
    struct DiversityYield;

    impl GrowthOracle for DiversityYield {
        fn simulate(&self, garden: &Garden, turns: u32) -> std::result::Result<Vec<f64>, OracleError> {
            let species: SpeciesSet = garden.plants().iter().map(|p| p.species()).collect();
            let rhodos = garden
                .plants()
                .iter()
                .filter(|p| p.species() == Species::Rhododendron)
                .count();
            Ok(vec![100.0 * species.len() as f64 + rhodos as f64; turns as usize])
        }
    }

    #[test]
    fn relaxed_plant_kept_when_next_meets_full_rule() {
        let config = config();
        let geometry = Segregated(CircleGeometry::new(config.tolerance));
        let cache = InteractionCache::new();
        let scheduler = Scheduler::serial();
        let ctx = SearchContext {
            config: &config,
            geometry: &geometry,
            growth: &DiversityYield,
            cache: &cache,
            scheduler: &scheduler,
            required_species: 2,
            capacity: 60.0,
        };
        let v = |s: Species| Variety::new(format!("{}", s.letter()), s, 1.0, NutrientProfile::default());
        let mut inventory = Inventory::new(vec![
            v(Species::Rhododendron),
            v(Species::Geranium),
            v(Species::Begonia),
            v(Species::Rhododendron),
            v(Species::Geranium),
        ])
        .unwrap();
        let mut garden = Garden::new(20.0, 20.0).unwrap();
        let mode = GroupMode::Anchored {
            anchor: garden.center(),
            max_size: 7,
        };
        let out = GroupBuilder::new(&ctx, mode, Phase::Starter)
            .build(&mut garden, &mut inventory)
            .unwrap();

        let species: Vec<Species> = garden.plants().iter().map(|p| p.species()).collect();
        assert_eq!(
            species,
            vec![
                Species::Rhododendron,
                Species::Geranium,
                Species::Begonia,
                Species::Rhododendron
            ]
        );
        assert_eq!(out.relaxations, 1);
        assert_eq!(out.rollbacks, 0);
        assert_eq!(out.len, 4);
        // The fourth plant meets the full rule without help.
        assert_eq!(geometry.partner_species(&garden, 3).len(), 2);
        // The leftover geranium can only ever see one partner species, and
        // the spent token means no second relaxation is granted for it.
        assert_eq!(out.halt, Halt::NoValidCandidate);
        assert_eq!(out.state, GroupState::Stopped);
        assert_eq!(inventory.remaining(), 1);
        assert_eq!(garden.version().epoch, 0);
    }

    #[test]
    fn epsilon_stops_growth() {
        let mut cfg = config();
        cfg.epsilon = 1e9;
        let fx = Fixture::new(cfg);
        let ctx = fx.ctx(1);
        let mut garden = Garden::new(20.0, 20.0).unwrap();
        let mut inventory = stock([10, 10, 0]);
        let mode = GroupMode::Anchored {
            anchor: garden.center(),
            max_size: 7,
        };
        let out = GroupBuilder::new(&ctx, mode, Phase::Starter)
            .build(&mut garden, &mut inventory)
            .unwrap();
        // The first two plants are exempt from the epsilon test.
        assert_eq!(out.len, 2);
        assert_eq!(out.halt, Halt::BelowEpsilon);
    }

    #[test]
    fn greedy_runs_until_inventory_or_space_exhausted() {
        let fx = Fixture::new(config());
        let ctx = fx.ctx(1);
        let mut garden = Garden::new(8.0, 8.0).unwrap();
        let mut inventory = stock([3, 3, 0]);
        // Seed two interacting plants so the partner requirement can be met.
        let r = inventory.take(0).unwrap();
        garden.place(Plant { variety: r, position: Position::new(4.0, 4.0), slot: 0 });
        let g = inventory.take(3).unwrap();
        garden.place(Plant { variety: g, position: Position::new(6.0, 4.0), slot: 3 });

        let out = GroupBuilder::new(&ctx, GroupMode::Greedy, Phase::Greedy)
            .build(&mut garden, &mut inventory)
            .unwrap();
        assert_eq!(out.relaxations, 0);
        assert!(matches!(out.halt, Halt::InventoryExhausted | Halt::NoValidCandidate));
        for i in 2..garden.len() {
            assert!(!fx.geometry.partner_species(&garden, i).is_empty());
        }
    }

    #[test]
    fn residual_anchor_prefers_clearance() {
        let fx = Fixture::new(config());
        let ctx = fx.ctx(1);
        let mut garden = Garden::new(10.0, 10.0).unwrap();
        let reps = vec![Variety::new("b", Species::Begonia, 1.0, NutrientProfile::default())];
        assert_eq!(residual_anchor(&garden, &ctx, &reps), Some(GridPos::new(5, 5)));
        garden.place(Plant {
            variety: reps[0].clone(),
            position: Position::new(1.0, 1.0),
            slot: 0,
        });
        assert_eq!(residual_anchor(&garden, &ctx, &reps), Some(GridPos::new(10, 10)));
    }
}
