//! Tiling copies of a finished group across the garden.
//!
//! The group's bounding box is moved to the origin and slid over every
//! integer offset, row-major. A copy is placed wherever every translated
//! plant lies in bounds, collides with nothing already planted (nor with
//! the rest of the copy), and the inventory can supply a matching
//! instance. Each copy is committed as one step.

use tracing::debug;

use crate::collision::GeometryOracle;
use crate::garden::{Garden, Plant};
use crate::inventory::Inventory;
use crate::types::{Halt, Position, Variety};

#[derive(Debug, Clone)]
pub struct ReplicationReport {
    pub copies: usize,
    pub plants_added: usize,
    pub offsets_tried: usize,
    pub halt: Halt,
}

/// Group plants with positions relative to their bounding box corner.
struct Template {
    plants: Vec<(Variety, Position)>,
}

impl Template {
    fn from_group(group: &[Plant]) -> Self {
        let min_x = group
            .iter()
            .map(|p| p.position.x - p.radius())
            .fold(f64::INFINITY, f64::min);
        let min_y = group
            .iter()
            .map(|p| p.position.y - p.radius())
            .fold(f64::INFINITY, f64::min);
        let plants = group
            .iter()
            .map(|p| (p.variety.clone(), p.position.offset(-min_x, -min_y)))
            .collect();
        Self { plants }
    }
}

pub fn replicate(
    garden: &mut Garden,
    inventory: &mut Inventory,
    geometry: &dyn GeometryOracle,
    start: usize,
    end: usize,
) -> ReplicationReport {
    let mut report = ReplicationReport {
        copies: 0,
        plants_added: 0,
        offsets_tried: 0,
        halt: Halt::Completed,
    };
    let end = end.min(garden.len());
    if start >= end {
        report.halt = Halt::GroupTooSmall;
        return report;
    }
    let template = Template::from_group(&garden.plants()[start..end]);
    let (cols, rows) = garden.lattice_dims();

    let mut slots = match plan_slots(inventory, &template) {
        Some(s) => s,
        None => {
            report.halt = Halt::InventoryExhausted;
            return report;
        }
    };

    'scan: for oy in 0..rows {
        for ox in 0..cols {
            report.offsets_tried += 1;
            let copy: Vec<Plant> = template
                .plants
                .iter()
                .zip(&slots)
                .filter_map(|((_, p), &slot)| {
                    Some(Plant {
                        variety: inventory.variety(slot)?.clone(),
                        position: p.offset(ox as f64, oy as f64),
                        slot,
                    })
                })
                .collect();
            if copy.len() != slots.len()
                || !copy.iter().all(|p| geometry.in_bounds(p.position, garden))
                || !fits(garden, geometry, &copy)
            {
                continue;
            }
            for p in &copy {
                inventory.take(p.slot);
            }
            debug!(ox, oy, plants = copy.len(), "placed group copy");
            report.copies += 1;
            report.plants_added += copy.len();
            garden.place_batch(copy);

            slots = match plan_slots(inventory, &template) {
                Some(s) => s,
                None => {
                    report.halt = Halt::InventoryExhausted;
                    break 'scan;
                }
            };
        }
    }
    report
}

/// One unused inventory slot per template plant.
fn plan_slots(inventory: &Inventory, template: &Template) -> Option<Vec<usize>> {
    let mut slots = Vec::with_capacity(template.plants.len());
    for (variety, _) in &template.plants {
        let slot = inventory.find_like(variety, &slots)?;
        slots.push(slot);
    }
    Some(slots)
}

/// True if no copy plant collides with the garden or an earlier copy plant.
fn fits(garden: &Garden, geometry: &dyn GeometryOracle, copy: &[Plant]) -> bool {
    copy.iter().enumerate().all(|(i, p)| {
        !geometry.collides(&p.variety, p.position, garden)
            && !copy[..i]
                .iter()
                .any(|q| geometry.collides_with(&p.variety, p.position, q))
    })
}
