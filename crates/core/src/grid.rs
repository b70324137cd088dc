//! Cell/item model.
//!
//! The grid is an ordered list of rows. Each row is identified by a stable
//! [`RowId`] that never changes while the row exists, even when rows above it
//! are removed. Cells hold at most one item by id; item data lives in a single
//! table on the grid so an item can be briefly un-homed while it is in transit
//! without losing its label or color.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

/// Unique identifier for an item.
pub type ItemId = u64;

/// Stable identifier for a row.
pub type RowId = u64;

/// Errors that can occur during grid operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("Row {0} is not attached to the grid")]
    RowNotFound(RowId),

    #[error("Cell ({}, {}) does not exist", .0.row, .0.column)]
    CellNotFound(CellId),

    #[error("Item {0} not found")]
    ItemNotFound(ItemId),
}

/// Identity of a cell: the row it belongs to and its column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellId {
    pub row: RowId,
    pub column: usize,
}

impl CellId {
    pub fn new(row: RowId, column: usize) -> Self {
        Self { row, column }
    }
}

/// A movable item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    /// Display label.
    pub label: String,
    /// Background color, `#RRGGBB`.
    pub color: String,
    /// Whether the item can be picked up.
    pub draggable: bool,
}

/// Data for an item that has not been given an id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub label: String,
    pub color: String,
    pub draggable: bool,
}

impl NewItem {
    pub fn new(label: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            color: color.into(),
            draggable: true,
        }
    }

    /// Mark the item as fixed in place.
    pub fn pinned(mut self) -> Self {
        self.draggable = false;
        self
    }
}

/// A single grid cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub id: CellId,
    /// The item this cell currently holds.
    pub item: Option<ItemId>,
}

/// A row of cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub id: RowId,
    pub cells: Vec<Cell>,
}

impl Row {
    /// Number of cells in this row.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// A row that is not part of the grid, together with the items it holds.
///
/// Produced by [`Grid::build_row`] and [`Grid::detach_row`]; consumed by
/// [`Grid::attach_row`]. Attaching the same detached row again restores the
/// exact same row and item ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetachedRow {
    row: Row,
    items: Vec<Item>,
}

impl DetachedRow {
    pub fn id(&self) -> RowId {
        self.row.id
    }

    pub fn row(&self) -> &Row {
        &self.row
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }
}

/// The grid of cells.
#[derive(Debug, Clone, Default)]
pub struct Grid {
    rows: Vec<Row>,
    items: HashMap<ItemId, Item>,
    next_row_id: RowId,
    next_item_id: ItemId,
}

impl Grid {
    /// Create an empty grid.
    pub fn new() -> Self {
        Self {
            next_row_id: 1,
            next_item_id: 1,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of attached rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Attached rows, top to bottom.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Current position of a row, counted from the top.
    pub fn row_index(&self, row: RowId) -> Option<usize> {
        self.rows.iter().position(|r| r.id == row)
    }

    pub fn row(&self, row: RowId) -> Option<&Row> {
        self.rows.iter().find(|r| r.id == row)
    }

    pub fn cell(&self, id: CellId) -> Option<&Cell> {
        self.row(id.row).and_then(|r| r.cells.get(id.column))
    }

    fn cell_mut(&mut self, id: CellId) -> Option<&mut Cell> {
        self.rows
            .iter_mut()
            .find(|r| r.id == id.row)
            .and_then(|r| r.cells.get_mut(id.column))
    }

    /// Look up an item that is currently attached.
    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    /// The item held by a cell, if any.
    pub fn item_at(&self, cell: CellId) -> Option<ItemId> {
        self.cell(cell).and_then(|c| c.item)
    }

    /// The cell currently holding an item.
    ///
    /// Returns `None` for unknown items and for items that are mid-swap and
    /// have been displaced from their origin before reaching their target.
    pub fn cell_of(&self, item: ItemId) -> Option<CellId> {
        self.rows
            .iter()
            .flat_map(|r| r.cells.iter())
            .find(|c| c.item == Some(item))
            .map(|c| c.id)
    }

    /// Snapshot of every cell and its occupant, top-left to bottom-right.
    pub fn occupancy(&self) -> Vec<(CellId, Option<ItemId>)> {
        self.rows
            .iter()
            .flat_map(|r| r.cells.iter())
            .map(|c| (c.id, c.item))
            .collect()
    }

    /// Total number of attached items.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Allocate a new row and its items without attaching it.
    ///
    /// Each entry becomes one cell; `None` leaves the cell empty.
    pub fn build_row<I>(&mut self, cells: I) -> DetachedRow
    where
        I: IntoIterator<Item = Option<NewItem>>,
    {
        let row_id = self.next_row_id;
        self.next_row_id += 1;

        let mut row = Row {
            id: row_id,
            cells: Vec::new(),
        };
        let mut items = Vec::new();

        for (column, new_item) in cells.into_iter().enumerate() {
            let item = new_item.map(|new_item| {
                let id = self.next_item_id;
                self.next_item_id += 1;
                items.push(Item {
                    id,
                    label: new_item.label,
                    color: new_item.color,
                    draggable: new_item.draggable,
                });
                id
            });
            row.cells.push(Cell {
                id: CellId::new(row_id, column),
                item,
            });
        }

        DetachedRow { row, items }
    }

    /// Append a detached row at the bottom of the grid.
    pub fn attach_row(&mut self, detached: DetachedRow) -> RowId {
        let DetachedRow { row, items } = detached;
        let id = row.id;
        debug_assert!(self.row_index(id).is_none(), "row {id} attached twice");

        for item in items {
            self.items.insert(item.id, item);
        }
        self.rows.push(row);
        debug!(row = id, rows = self.rows.len(), "Row attached");
        id
    }

    /// Build a row and attach it immediately.
    pub fn push_row<I>(&mut self, cells: I) -> RowId
    where
        I: IntoIterator<Item = Option<NewItem>>,
    {
        let row = self.build_row(cells);
        self.attach_row(row)
    }

    /// Remove a row by id, wherever it currently sits, taking its items with it.
    pub fn detach_row(&mut self, row: RowId) -> Result<DetachedRow, GridError> {
        let index = self.row_index(row).ok_or(GridError::RowNotFound(row))?;
        let row = self.rows.remove(index);
        let items = row
            .cells
            .iter()
            .filter_map(|c| c.item)
            .filter_map(|id| self.items.remove(&id))
            .collect();
        debug!(row = row.id, index, "Row detached");
        Ok(DetachedRow { row, items })
    }

    /// Commit one half of a swap: move `item` from `from` into `to`.
    ///
    /// The item leaves whichever cell currently holds it, normally `from`. If
    /// `from` was taken over by the other half of the same swap, or is gone,
    /// nothing else is cleared there. If `to` still holds another
    /// item, that item is in transit towards the cell `item` is leaving and
    /// will be re-homed when its own transition lands.
    pub fn commit_move(&mut self, item: ItemId, from: CellId, to: CellId) -> Result<(), GridError> {
        if !self.items.contains_key(&item) {
            return Err(GridError::ItemNotFound(item));
        }
        if self.cell(to).is_none() {
            return Err(GridError::CellNotFound(to));
        }

        let holder = match self.cell(from) {
            Some(origin) if origin.item == Some(item) => Some(from),
            _ => {
                trace!(item, ?from, "Origin no longer holds item");
                self.cell_of(item)
            }
        };
        if let Some(origin) = holder.and_then(|id| self.cell_mut(id)) {
            origin.item = None;
        }

        if let Some(target) = self.cell_mut(to) {
            if let Some(previous) = target.item.replace(item) {
                if previous != item {
                    trace!(item, displaced = previous, "Displaced in-transit occupant");
                }
            }
        }
        Ok(())
    }
}
