//! Multi-stage selection of the next plant.
//!
//! generate -> admissibility filter -> heuristic top-k -> pattern
//! buckets -> adaptive-depth simulation -> fine-grained re-simulation of
//! the leaders. Each stage narrows the field before the next, more
//! expensive one; every tie is broken by enumeration order.
//!
//! Pattern buckets are an approximation: candidates with the same
//! interaction pattern are assumed interchangeable, and only the
//! heuristic leader of each bucket is simulated. Turn grouping off for
//! an exhaustive simulation stage.

use std::collections::HashSet;

use tracing::{debug, trace};

use crate::cache::InteractionCache;
use crate::candidates::{Candidate, CandidateGenerator};
use crate::collision::GeometryOracle;
use crate::error::{FillError, Result};
use crate::evaluate::{adaptive_turns, interaction_pattern, SimulationEvaluator};
use crate::garden::Garden;
use crate::growth::GrowthOracle;
use crate::heuristic::HeuristicScorer;
use crate::inventory::Inventory;
use crate::scheduler::{best, rank, Scheduler, Scored};
use crate::types::{FillConfig, GridPos, Phase, Species, StageCounts};

/// Shared, read-only collaborators for a fill run.
pub struct SearchContext<'a> {
    pub config: &'a FillConfig,
    pub geometry: &'a dyn GeometryOracle,
    pub growth: &'a dyn GrowthOracle,
    pub cache: &'a InteractionCache,
    pub scheduler: &'a Scheduler,
    /// Distinct partner species every plant past the first two must reach.
    pub required_species: usize,
    /// Plants the garden is expected to hold when full.
    pub capacity: f64,
}

impl SearchContext<'_> {
    pub fn progress(&self, garden: &Garden) -> f64 {
        if self.capacity <= 0.0 {
            return 1.0;
        }
        garden.len() as f64 / self.capacity
    }
}

/// Filters applied before any scoring.
#[derive(Debug, Clone, Copy, Default)]
pub struct Constraint {
    pub at: Option<GridPos>,
    pub exclude_species: Option<Species>,
    /// Candidate must interact with the plant at this garden index.
    pub partner_of: Option<usize>,
    pub min_partner_species: usize,
}

#[derive(Debug, Clone)]
pub struct Selection {
    pub candidate: Candidate,
    pub score: f64,
}

pub fn select_best(
    ctx: &SearchContext<'_>,
    garden: &Garden,
    inventory: &Inventory,
    constraint: &Constraint,
    phase: Phase,
) -> Result<(Option<Selection>, StageCounts)> {
    let config = ctx.config;
    let mut counts = StageCounts::default();
    let reps = inventory.representatives();
    if reps.is_empty() {
        return Ok((None, counts));
    }

    let mut generator = CandidateGenerator::new(garden, ctx.geometry, &reps);
    if let Some(cell) = constraint.at {
        generator = generator.at(cell);
    }
    let generated: Vec<Candidate> = generator.collect();
    counts.generated = generated.len();

    let scorer = HeuristicScorer::new(garden, ctx.geometry, config.area_power);
    let heuristic = ctx.scheduler.map(&generated, |c| {
        admissible(ctx, garden, constraint, c).then(|| scorer.score(&c.variety, c.position()))
    });
    let mut ranked: Vec<Scored<Candidate>> = generated
        .into_iter()
        .zip(heuristic)
        .filter_map(|(c, h)| {
            h.map(|score| Scored {
                order: c.order,
                score,
                item: c,
            })
        })
        .collect();
    counts.admissible = ranked.len();
    if ranked.is_empty() {
        return Ok((None, counts));
    }

    rank(&mut ranked);
    ranked.truncate(config.heuristic_top_k.resolve(counts.admissible));
    counts.heuristic_kept = ranked.len();

    let shortlist: Vec<Candidate> = if config.pattern_grouping {
        let mut seen = HashSet::new();
        ranked
            .into_iter()
            .filter(|s| {
                seen.insert(interaction_pattern(
                    ctx.geometry,
                    garden,
                    &s.item.variety,
                    s.item.position(),
                ))
            })
            .map(|s| s.item)
            .collect()
    } else {
        ranked.into_iter().map(|s| s.item).collect()
    };
    counts.buckets = shortlist.len();

    let evaluator = SimulationEvaluator::new(ctx.geometry, ctx.growth, config);
    let turns = adaptive_turns(
        ctx.progress(garden),
        config.min_turns,
        config.max_turns,
        config.depth_decay,
    );
    let mut simulated = simulate(&evaluator, ctx.scheduler, garden, shortlist, turns, phase)?;
    counts.simulated = simulated.len();
    rank(&mut simulated);

    if config.finegrained_top_k > 0 && config.finegrained_turns > 0 {
        simulated.truncate(config.finegrained_top_k);
        let leaders: Vec<Candidate> = simulated.into_iter().map(|s| s.item).collect();
        simulated = simulate(
            &evaluator,
            ctx.scheduler,
            garden,
            leaders,
            config.finegrained_turns,
            phase,
        )?;
        counts.refined = simulated.len();
        rank(&mut simulated);
    }

    let chosen = best(simulated).map(|s| Selection {
        candidate: s.item,
        score: s.score,
    });
    if let Some(sel) = &chosen {
        debug!(
            ?phase,
            candidate = %sel.candidate.describe(),
            score = sel.score,
            turns,
            generated = counts.generated,
            admissible = counts.admissible,
            simulated = counts.simulated,
            "selected"
        );
    }
    Ok((chosen, counts))
}

fn admissible(
    ctx: &SearchContext<'_>,
    garden: &Garden,
    constraint: &Constraint,
    c: &Candidate,
) -> bool {
    if constraint.exclude_species == Some(c.variety.species) {
        return false;
    }
    if let Some(i) = constraint.partner_of {
        let Some(partner) = garden.plants().get(i) else {
            return false;
        };
        if !ctx.geometry.interacts_with(&c.variety, c.position(), partner) {
            return false;
        }
    }
    if constraint.min_partner_species > 0 {
        let species = ctx
            .cache
            .interacting_species(ctx.geometry, garden, &c.variety, c.cell);
        if species.len() < constraint.min_partner_species {
            return false;
        }
    }
    true
}

fn simulate(
    evaluator: &SimulationEvaluator<'_>,
    scheduler: &Scheduler,
    garden: &Garden,
    candidates: Vec<Candidate>,
    turns: u32,
    phase: Phase,
) -> Result<Vec<Scored<Candidate>>> {
    if candidates.is_empty() {
        return Ok(Vec::new());
    }
    let baseline = evaluator.baseline(garden, turns).map_err(|source| {
        FillError::OracleFailure {
            phase,
            candidate: "current garden".into(),
            source,
        }
    })?;
    trace!(turns, jobs = candidates.len(), baseline, "simulating");
    let scores = scheduler.map(&candidates, |c| {
        evaluator.score(garden, &c.variety, c.position(), turns, baseline)
    });
    candidates
        .into_iter()
        .zip(scores)
        .map(|(c, s)| match s {
            Ok(score) => Ok(Scored {
                order: c.order,
                score,
                item: c,
            }),
            Err(source) => Err(FillError::OracleFailure {
                phase,
                candidate: c.describe(),
                source,
            }),
        })
        .collect()
}
