//! Partner-diversity validation and pruning.
//!
//! Every plant in a range, except the first two, must interact with at
//! least the required number of distinct partner species. Offenders are
//! removed and the range re-checked, since a removal can strand plants
//! that relied on it; the loop ends on the first pass with no removals.
//! Every pass but the last removes at least one plant, so a range of `n`
//! plants takes at most `n + 1` passes.

use tracing::debug;

use crate::collision::GeometryOracle;
use crate::garden::{Garden, Plant};
use crate::inventory::Inventory;

#[derive(Debug, Default)]
pub struct PruneReport {
    pub removed: Vec<Plant>,
    pub passes: usize,
    /// Range end after removals.
    pub end: usize,
}

/// Prunes `garden[start..end]` in place. Removed plants go back to the
/// inventory.
pub fn prune(
    garden: &mut Garden,
    inventory: &mut Inventory,
    geometry: &dyn GeometryOracle,
    start: usize,
    end: usize,
    required: usize,
) -> PruneReport {
    let mut report = PruneReport {
        end: end.min(garden.len()),
        ..PruneReport::default()
    };
    let max_passes = report.end.saturating_sub(start) + 1;
    while report.passes < max_passes {
        report.passes += 1;
        let mut removed_any = false;
        let mut i = start + 2;
        while i < report.end {
            let partners = geometry.partner_species(garden, i);
            if partners.len() < required {
                let plant = garden.remove(i);
                debug!(
                    index = i,
                    name = %plant.variety.name,
                    partners = partners.len(),
                    "pruned plant lacking partner diversity"
                );
                inventory.restore(plant.slot);
                report.removed.push(plant);
                report.end -= 1;
                removed_any = true;
            } else {
                i += 1;
            }
        }
        if !removed_any {
            break;
        }
    }
    report
}

/// Indices past the first two of the range that fail the requirement.
#[cfg(test)]
fn violations(
    garden: &Garden,
    geometry: &dyn GeometryOracle,
    start: usize,
    end: usize,
    required: usize,
) -> Vec<usize> {
    (start + 2..end.min(garden.len()))
        .filter(|&i| geometry.partner_species(garden, i).len() < required)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::CircleGeometry;
    use crate::types::{NutrientProfile, Position, Species, Variety};

    fn place(garden: &mut Garden, inventory: &mut Inventory, slot: usize, x: f64, y: f64) {
        let variety = inventory.take(slot).unwrap();
        garden.place(Plant {
            variety,
            position: Position::new(x, y),
            slot,
        });
    }

    fn stock() -> Inventory {
        let v = |s: Species| Variety::new("v", s, 1.0, NutrientProfile::default());
        Inventory::new(vec![
            v(Species::Rhododendron),
            v(Species::Geranium),
            v(Species::Begonia),
            v(Species::Rhododendron),
            v(Species::Geranium),
            v(Species::Begonia),
        ])
        .unwrap()
    }

    #[test]
    fn first_two_are_exempt() {
        let geometry = CircleGeometry::default();
        let mut inventory = stock();
        let mut garden = Garden::new(30.0, 30.0).unwrap();
        place(&mut garden, &mut inventory, 0, 2.0, 2.0);
        place(&mut garden, &mut inventory, 1, 20.0, 20.0);
        let report = prune(&mut garden, &mut inventory, &geometry, 0, 2, 2);
        assert!(report.removed.is_empty());
        assert_eq!(report.passes, 1);
        assert_eq!(garden.len(), 2);
    }

    #[test]
    fn isolated_plant_removed_and_restored() {
        let geometry = CircleGeometry::default();
        let mut inventory = stock();
        let mut garden = Garden::new(30.0, 30.0).unwrap();
        place(&mut garden, &mut inventory, 0, 10.0, 10.0);
        place(&mut garden, &mut inventory, 1, 11.5, 10.0);
        place(&mut garden, &mut inventory, 2, 10.5, 11.3);
        place(&mut garden, &mut inventory, 5, 25.0, 25.0);
        assert_eq!(violations(&garden, &geometry, 0, 4, 2), vec![3]);

        let report = prune(&mut garden, &mut inventory, &geometry, 0, 4, 2);
        assert_eq!(report.removed.len(), 1);
        assert_eq!(report.end, 3);
        assert_eq!(garden.len(), 3);
        assert!(inventory.is_available(5));
        assert!(violations(&garden, &geometry, 0, report.end, 2).is_empty());
    }

    #[test]
    fn cascading_removal_needs_another_pass() {
        let geometry = CircleGeometry::default();
        let mut inventory = stock();
        let mut garden = Garden::new(30.0, 30.0).unwrap();
        place(&mut garden, &mut inventory, 0, 10.0, 10.0); // rhododendron
        place(&mut garden, &mut inventory, 1, 11.5, 10.0); // geranium
        // Begonia touches the rhododendron and the far geranium, which in
        // turn touches nothing else.
        place(&mut garden, &mut inventory, 2, 8.5, 10.0);
        place(&mut garden, &mut inventory, 4, 7.0, 10.0);

        let report = prune(&mut garden, &mut inventory, &geometry, 0, 4, 2);
        assert_eq!(report.removed.len(), 2);
        assert_eq!(report.passes, 3);
        assert!(report.passes <= 4 + 1);
        assert_eq!(report.end, 2);
        assert_eq!(garden.len(), 2);
        assert_eq!(garden.version().placements, 2);
        assert!(inventory.is_available(2));
        assert!(inventory.is_available(4));
    }

    #[test]
    fn long_chain_unravels_within_pass_bound() {
        let geometry = CircleGeometry::default();
        let v = |s: Species| Variety::new("v", s, 1.0, NutrientProfile::default());
        let mut inventory = Inventory::new(vec![
            v(Species::Rhododendron),
            v(Species::Geranium),
            v(Species::Begonia),
            v(Species::Geranium),
            v(Species::Rhododendron),
            v(Species::Geranium),
        ])
        .unwrap();
        let mut garden = Garden::new(30.0, 30.0).unwrap();
        // A line running left from the exempt pair; each plant leans on its
        // neighbours, so removals at the far end ripple back one per pass.
        for (slot, x) in [(0, 10.0), (1, 11.5), (2, 8.5), (3, 7.0), (4, 5.5), (5, 4.0)] {
            place(&mut garden, &mut inventory, slot, x, 10.0);
        }
        assert_eq!(violations(&garden, &geometry, 0, 6, 2), vec![4, 5]);

        let report = prune(&mut garden, &mut inventory, &geometry, 0, 6, 2);
        assert_eq!(report.removed.len(), 4);
        assert_eq!(report.passes, 4);
        assert!(report.passes <= 6 + 1);
        assert_eq!(garden.len(), 2);
        assert_eq!(inventory.remaining(), 4);
    }

    #[test]
    fn empty_range_takes_one_pass() {
        let geometry = CircleGeometry::default();
        let mut inventory = stock();
        let mut garden = Garden::new(10.0, 10.0).unwrap();
        let report = prune(&mut garden, &mut inventory, &geometry, 0, 0, 2);
        assert_eq!(report.passes, 1);
        assert!(report.removed.is_empty());
    }
}
