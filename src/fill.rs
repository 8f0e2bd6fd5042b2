//! Garden fill controller.
//!
//! Runs the phases in order: starter group at the centre, starter
//! validation, replication of the starter pattern, extra groups anchored
//! in the emptiest remaining space, greedy fill, and a final validation
//! over the whole garden. Phases end on their own halt conditions; only
//! oracle failures and invalid input abort the run.

use std::time::Instant;

use tracing::info;

use crate::cache::{CacheStats, InteractionCache};
use crate::collision::{CircleGeometry, GeometryOracle};
use crate::error::Result;
use crate::garden::Garden;
use crate::group::{residual_anchor, GroupBuilder, GroupMode, GroupOutcome};
use crate::growth::{GrowthOracle, NutrientModel};
use crate::inventory::Inventory;
use crate::pipeline::SearchContext;
use crate::replicate::replicate;
use crate::scheduler::Scheduler;
use crate::types::{FillConfig, FillParams, FillResult, Halt, Phase, PhaseReport, Species};
use crate::validate::prune;

pub struct FillOutcome {
    pub garden: Garden,
    pub inventory: Inventory,
    pub phases: Vec<PhaseReport>,
    pub cache: CacheStats,
}

/// Fills the garden described by `params` with the reference circle
/// geometry and nutrient growth model.
pub fn fill(params: &FillParams) -> Result<FillResult> {
    params.config.validate()?;
    let garden = Garden::new(params.width, params.height)?;
    let inventory = Inventory::from_catalog(&params.catalog)?;
    let geometry = CircleGeometry::new(params.config.tolerance);
    let growth = NutrientModel::default();

    let outcome = fill_garden(garden, inventory, &params.config, &geometry, &growth)?;
    Ok(FillResult {
        width: outcome.garden.width(),
        height: outcome.garden.height(),
        plants: outcome.garden.plants().iter().map(|p| p.to_placed()).collect(),
        version: outcome.garden.version(),
        phases: outcome.phases,
        cache_hits: outcome.cache.hits,
        cache_misses: outcome.cache.misses,
    })
}

/// Distinct partner species required of every plant past the first two.
/// Capped by what the stock can ever provide so a two-species stock can
/// still form groups.
pub fn required_species(inventory: &Inventory, config: &FillConfig) -> usize {
    let in_stock = inventory.species_in_stock().len();
    in_stock
        .saturating_sub(1)
        .clamp(1, config.min_partner_species.max(1))
}

/// Plants the garden can be expected to hold; drives simulation depth.
pub fn estimate_capacity(garden: &Garden, inventory: &Inventory) -> f64 {
    let r = inventory.mean_radius();
    let by_space = if r > 0.0 {
        garden.lattice_points() as f64 / (r * r)
    } else {
        f64::INFINITY
    };
    (inventory.len() as f64).min(by_space).max(1.0)
}

pub fn fill_garden(
    mut garden: Garden,
    mut inventory: Inventory,
    config: &FillConfig,
    geometry: &dyn GeometryOracle,
    growth: &dyn GrowthOracle,
) -> Result<FillOutcome> {
    config.validate()?;
    let cache = InteractionCache::new();
    let scheduler = Scheduler::new(config.workers, config.parallel_threshold)?;
    let required = required_species(&inventory, config);
    let ctx = SearchContext {
        config,
        geometry,
        growth,
        cache: &cache,
        scheduler: &scheduler,
        required_species: required,
        capacity: estimate_capacity(&garden, &inventory),
    };
    info!(
        width = garden.width(),
        height = garden.height(),
        inventory = inventory.len(),
        required_species = required,
        capacity = ctx.capacity,
        workers = scheduler.workers(),
        "starting fill"
    );

    let mut phases = Vec::new();

    // Starter group.
    let t = Instant::now();
    let anchored = GroupMode::Anchored {
        anchor: garden.center(),
        max_size: config.max_group_size,
    };
    let starter = GroupBuilder::new(&ctx, anchored, Phase::Starter).build(&mut garden, &mut inventory)?;
    let mut report = PhaseReport::new(Phase::Starter);
    absorb_group(&mut report, &starter);
    report.halt = starter.halt;
    phases.push(finish(report, t));

    // Starter validation.
    let t = Instant::now();
    let pruned = prune(
        &mut garden,
        &mut inventory,
        geometry,
        starter.start,
        starter.start + starter.len,
        required,
    );
    let starter_len = pruned.end - starter.start;
    let mut report = PhaseReport::new(Phase::StarterValidation);
    report.plants_removed = pruned.removed.len();
    phases.push(finish(report, t));

    // Replication.
    let t = Instant::now();
    let mut report = PhaseReport::new(Phase::Replication);
    if starter_len >= config.min_group_size {
        let rep = replicate(&mut garden, &mut inventory, geometry, starter.start, pruned.end);
        report.copies = rep.copies;
        report.plants_added = rep.plants_added;
        report.halt = rep.halt;
    } else {
        report.halt = Halt::GroupTooSmall;
    }
    phases.push(finish(report, t));

    // Extra groups.
    let t = Instant::now();
    let mut report = PhaseReport::new(Phase::ExtraGroups);
    report.halt = loop {
        if inventory.remaining() == 0 {
            break Halt::InventoryExhausted;
        }
        let reps = inventory.representatives();
        let Some(anchor) = residual_anchor(&garden, &ctx, &reps) else {
            break Halt::NoResidualSpace;
        };
        let mode = GroupMode::Anchored {
            anchor,
            max_size: config.max_group_size,
        };
        let group = GroupBuilder::new(&ctx, mode, Phase::ExtraGroups).build(&mut garden, &mut inventory)?;
        absorb_group(&mut report, &group);
        let pruned = prune(
            &mut garden,
            &mut inventory,
            geometry,
            group.start,
            group.start + group.len,
            required,
        );
        report.plants_removed += pruned.removed.len();
        let kept = pruned.end - group.start;
        if kept < config.min_group_size {
            let discarded = garden.truncate(group.start);
            report.plants_removed += discarded.len();
            for plant in discarded {
                inventory.restore(plant.slot);
            }
            break Halt::GroupTooSmall;
        }
        report.groups += 1;
    };
    phases.push(finish(report, t));

    // Greedy fill.
    let t = Instant::now();
    let greedy = GroupBuilder::new(&ctx, GroupMode::Greedy, Phase::Greedy).build(&mut garden, &mut inventory)?;
    let mut report = PhaseReport::new(Phase::Greedy);
    absorb_group(&mut report, &greedy);
    report.halt = greedy.halt;
    phases.push(finish(report, t));

    // Final validation over the whole garden.
    let t = Instant::now();
    let len = garden.len();
    let pruned = prune(&mut garden, &mut inventory, geometry, 0, len, required);
    let mut report = PhaseReport::new(Phase::FinalValidation);
    report.plants_removed = pruned.removed.len();
    phases.push(finish(report, t));

    log_summary(&garden, geometry);
    let stats = cache.stats();
    info!(
        plants = garden.len(),
        remaining = inventory.remaining(),
        cache_hits = stats.hits,
        cache_misses = stats.misses,
        "fill complete"
    );

    Ok(FillOutcome {
        garden,
        inventory,
        phases,
        cache: stats,
    })
}

fn absorb_group(report: &mut PhaseReport, group: &GroupOutcome) {
    report.plants_added += group.len;
    report.selections += group.selections;
    report.relaxations += group.relaxations;
    report.rollbacks += group.rollbacks;
    report.counts.absorb(&group.counts);
}

fn finish(mut report: PhaseReport, started: Instant) -> PhaseReport {
    report.elapsed_ms = started.elapsed().as_millis() as u64;
    info!(
        phase = %report.phase,
        added = report.plants_added,
        removed = report.plants_removed,
        halt = ?report.halt,
        elapsed_ms = report.elapsed_ms,
        "phase complete"
    );
    report
}

fn log_summary(garden: &Garden, geometry: &dyn GeometryOracle) {
    for species in Species::ALL {
        let indices: Vec<usize> = (0..garden.len())
            .filter(|&i| garden.plants()[i].species() == species)
            .collect();
        if indices.is_empty() {
            continue;
        }
        let partners: usize = indices
            .iter()
            .map(|&i| geometry.partner_species(garden, i).len())
            .sum();
        info!(
            species = ?species,
            count = indices.len(),
            mean_partner_species = partners as f64 / indices.len() as f64,
            "species summary"
        );
    }
}

// -----------------------------------------------------------------
// Tests
// -----------------------------------------------------------------
