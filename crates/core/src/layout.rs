//! Screen geometry for grid cells.
//!
//! The animator only needs to know where a cell sits on screen. That mapping
//! belongs to whoever renders the grid, so it is expressed as the
//! [`CellGeometry`] trait; [`TableLayout`] is the uniform table used by the
//! daemon and the tests.

use serde::{Deserialize, Serialize};

use crate::grid::{CellId, Grid};

/// A rectangle in screen coordinates (pixels).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    /// Create a new rectangle.
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Offset that moves this rectangle's top-left corner onto `other`'s.
    pub fn delta_to(&self, other: &Rect) -> Offset {
        Offset::new(f64::from(other.x - self.x), f64::from(other.y - self.y))
    }
}

/// A visual translation applied to an item while it is in transit.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Offset {
    pub dx: f64,
    pub dy: f64,
}

impl Offset {
    pub const ZERO: Offset = Offset { dx: 0.0, dy: 0.0 };

    pub fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }

    pub fn is_zero(&self) -> bool {
        self.dx == 0.0 && self.dy == 0.0
    }

    /// Scale both components by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self::new(self.dx * factor, self.dy * factor)
    }
}

/// Maps a cell to the rectangle it occupies on screen.
///
/// Returns `None` when the cell is not currently part of the grid (for
/// example, its row was detached).
pub trait CellGeometry {
    fn cell_rect(&self, grid: &Grid, cell: CellId) -> Option<Rect>;
}

/// Uniform table: every cell has the same size, rows stack top to bottom in
/// their current order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableLayout {
    pub origin_x: i32,
    pub origin_y: i32,
    pub cell_width: i32,
    pub cell_height: i32,
    pub gap: i32,
}

impl Default for TableLayout {
    fn default() -> Self {
        Self {
            origin_x: 0,
            origin_y: 0,
            cell_width: 100,
            cell_height: 100,
            gap: 10,
        }
    }
}

impl CellGeometry for TableLayout {
    fn cell_rect(&self, grid: &Grid, cell: CellId) -> Option<Rect> {
        let row_index = grid.row_index(cell.row)?;
        grid.cell(cell)?;

        let x = self.origin_x + cell.column as i32 * (self.cell_width + self.gap);
        let y = self.origin_y + row_index as i32 * (self.cell_height + self.gap);
        Some(Rect::new(x, y, self.cell_width, self.cell_height))
    }
}
