//! Lazy enumeration of placement candidates.
//!
//! Candidates are (variety representative, lattice point) pairs. Points
//! are visited row-major and representatives in inventory order; pairs
//! whose circle would collide with a planted circle are skipped. The
//! visiting order is the tie-break order for every later stage.

use crate::collision::GeometryOracle;
use crate::garden::Garden;
use crate::types::{GridPos, Position, Variety};

#[derive(Debug, Clone)]
pub struct Candidate {
    /// Position in enumeration order; lower wins ties.
    pub order: usize,
    pub variety: Variety,
    pub cell: GridPos,
}

impl Candidate {
    pub fn position(&self) -> Position {
        self.cell.to_position()
    }

    pub fn describe(&self) -> String {
        format!("{} at ({}, {})", self.variety.name, self.cell.x, self.cell.y)
    }
}

pub struct CandidateGenerator<'a> {
    garden: &'a Garden,
    geometry: &'a dyn GeometryOracle,
    reps: &'a [Variety],
    cols: i32,
    cells: usize,
    next_cell: usize,
    next_rep: usize,
    only: Option<GridPos>,
}

impl<'a> CandidateGenerator<'a> {
    pub fn new(garden: &'a Garden, geometry: &'a dyn GeometryOracle, reps: &'a [Variety]) -> Self {
        let (cols, _) = garden.lattice_dims();
        Self {
            garden,
            geometry,
            reps,
            cols,
            cells: garden.lattice_points(),
            next_cell: 0,
            next_rep: 0,
            only: None,
        }
    }

    /// Restricts enumeration to a single lattice point.
    pub fn at(mut self, cell: GridPos) -> Self {
        self.only = Some(cell);
        let (_, rows) = self.garden.lattice_dims();
        if cell.x < 0 || cell.y < 0 || cell.x >= self.cols || cell.y >= rows {
            self.next_cell = self.cells;
        } else {
            self.next_cell = cell.y as usize * self.cols as usize + cell.x as usize;
        }
        self
    }

    fn cell(&self, index: usize) -> GridPos {
        let cols = self.cols as usize;
        GridPos::new((index % cols) as i32, (index / cols) as i32)
    }
}

impl Iterator for CandidateGenerator<'_> {
    type Item = Candidate;

    fn next(&mut self) -> Option<Candidate> {
        while self.next_cell < self.cells {
            let cell = self.cell(self.next_cell);
            if self.only.is_some_and(|only| only != cell) {
                self.next_cell = self.cells;
                break;
            }
            while self.next_rep < self.reps.len() {
                let rep = self.next_rep;
                self.next_rep += 1;
                let variety = &self.reps[rep];
                if self.geometry.collides(variety, cell.to_position(), self.garden) {
                    continue;
                }
                return Some(Candidate {
                    order: self.next_cell * self.reps.len() + rep,
                    variety: variety.clone(),
                    cell,
                });
            }
            self.next_rep = 0;
            self.next_cell += 1;
        }
        None
    }
}

/// Lattice points where at least one representative fits, row-major.
pub fn open_cells(garden: &Garden, geometry: &dyn GeometryOracle, reps: &[Variety]) -> Vec<GridPos> {
    let mut cells: Vec<GridPos> = Vec::new();
    for c in CandidateGenerator::new(garden, geometry, reps) {
        if cells.last() != Some(&c.cell) {
            cells.push(c.cell);
        }
    }
    cells
}
