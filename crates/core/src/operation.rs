//! Reversible operations.
//!
//! An [`Operation`] is a tagged variant over the two kinds of change the grid
//! supports. Swaps move items through the animator and only touch occupancy
//! when their transitions land; row insertions attach and detach a row
//! synchronously.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::animator::{Animator, Motion};
use crate::grid::{CellId, DetachedRow, Grid, ItemId, RowId};
use crate::layout::CellGeometry;

/// Unique identifier for an operation, assigned by the history.
pub type OperationId = u64;

/// Everything an operation may touch while it runs.
pub struct Stage<'a> {
    pub grid: &'a mut Grid,
    pub animator: &'a mut Animator,
    pub geometry: &'a dyn CellGeometry,
}

/// Lifecycle of a swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapPhase {
    /// Built but never applied.
    #[default]
    Pending,
    /// Transitions are in flight; occupancy is not final yet.
    Animating,
    /// Every transition has landed.
    Committed,
}

/// Exchange the dragged item with whatever occupies the target cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Swap {
    dragged: ItemId,
    origin: CellId,
    displaced: Option<ItemId>,
    target: CellId,
    phase: SwapPhase,
}

impl Swap {
    /// Capture a swap from occupancy read at drop time.
    pub fn new(dragged: ItemId, origin: CellId, displaced: Option<ItemId>, target: CellId) -> Self {
        Self {
            dragged,
            origin,
            displaced,
            target,
            phase: SwapPhase::Pending,
        }
    }

    pub fn dragged(&self) -> ItemId {
        self.dragged
    }

    pub fn origin(&self) -> CellId {
        self.origin
    }

    /// The item that was sitting in the target cell, if any.
    pub fn displaced(&self) -> Option<ItemId> {
        self.displaced
    }

    pub fn target(&self) -> CellId {
        self.target
    }

    pub fn phase(&self) -> SwapPhase {
        self.phase
    }

    /// The one or two motions that realise this swap.
    ///
    /// Forward moves the dragged item onto the target and the displaced item
    /// back to the origin; backward is the mirror image.
    pub fn motions(&self, op: OperationId, forward: bool) -> Vec<Motion> {
        let (dragged_from, dragged_to) = if forward {
            (self.origin, self.target)
        } else {
            (self.target, self.origin)
        };

        let mut motions = vec![Motion {
            op,
            item: self.dragged,
            from: dragged_from,
            to: dragged_to,
        }];
        if let Some(displaced) = self.displaced {
            motions.push(Motion {
                op,
                item: displaced,
                from: dragged_to,
                to: dragged_from,
            });
        }
        motions
    }

    fn apply(&mut self, op: OperationId, forward: bool, stage: &mut Stage<'_>) {
        for motion in self.motions(op, forward) {
            let start = stage.geometry.cell_rect(stage.grid, motion.from);
            let end = stage.geometry.cell_rect(stage.grid, motion.to);
            stage.animator.animate(motion, start, end);
        }
        self.phase = SwapPhase::Animating;
    }
}

/// Append a pre-built row.
///
/// The row is parked here whenever it is not attached to the grid, so undo
/// and redo move the very same row (same row and item ids) in and out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowInsertion {
    row: RowId,
    parked: Option<DetachedRow>,
}

impl RowInsertion {
    pub fn new(row: DetachedRow) -> Self {
        Self {
            row: row.id(),
            parked: Some(row),
        }
    }

    pub fn row(&self) -> RowId {
        self.row
    }

    /// Whether the row currently lives in the grid.
    pub fn is_attached(&self) -> bool {
        self.parked.is_none()
    }

    fn attach(&mut self, grid: &mut Grid) {
        match self.parked.take() {
            Some(row) => {
                grid.attach_row(row);
            }
            None => warn!(row = self.row, "Row insertion re-applied while attached"),
        }
    }

    fn detach(&mut self, grid: &mut Grid) {
        if self.parked.is_some() {
            warn!(row = self.row, "Row insertion undone while detached");
            return;
        }
        match grid.detach_row(self.row) {
            Ok(row) => self.parked = Some(row),
            Err(e) => warn!("Failed to undo row insertion: {}", e),
        }
    }
}

/// The kinds of reversible change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationKind {
    Swap(Swap),
    RowInsertion(RowInsertion),
}

impl OperationKind {
    /// Short machine-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            OperationKind::Swap(_) => "swap",
            OperationKind::RowInsertion(_) => "row_insertion",
        }
    }
}

/// A recorded operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    id: OperationId,
    kind: OperationKind,
}

impl Operation {
    pub fn new(id: OperationId, kind: OperationKind) -> Self {
        Self { id, kind }
    }

    pub fn id(&self) -> OperationId {
        self.id
    }

    pub fn kind(&self) -> &OperationKind {
        &self.kind
    }

    /// Apply the operation for the first time.
    pub fn execute(&mut self, stage: &mut Stage<'_>) {
        debug!(op = self.id, kind = self.kind.name(), "Execute");
        self.forward(stage);
    }

    /// Revert the operation.
    pub fn undo(&mut self, stage: &mut Stage<'_>) {
        debug!(op = self.id, kind = self.kind.name(), "Undo");
        match &mut self.kind {
            OperationKind::Swap(swap) => swap.apply(self.id, false, stage),
            OperationKind::RowInsertion(insertion) => insertion.detach(stage.grid),
        }
    }

    /// Re-apply after an undo. Same effect as [`Operation::execute`].
    pub fn redo(&mut self, stage: &mut Stage<'_>) {
        debug!(op = self.id, kind = self.kind.name(), "Redo");
        self.forward(stage);
    }

    fn forward(&mut self, stage: &mut Stage<'_>) {
        match &mut self.kind {
            OperationKind::Swap(swap) => swap.apply(self.id, true, stage),
            OperationKind::RowInsertion(insertion) => insertion.attach(stage.grid),
        }
    }

    /// Record that every transition started by this operation has landed.
    pub(crate) fn settle(&mut self) {
        if let OperationKind::Swap(swap) = &mut self.kind {
            swap.phase = SwapPhase::Committed;
        }
    }
}
