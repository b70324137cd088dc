//! Drag interaction controller.
//!
//! Turns drag-start / drag-end / drop signals into swaps. All interaction
//! state lives in an [`InteractionSession`] owned by the controller, so several
//! independent grids can be driven side by side.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::grid::{CellId, ItemId};
use crate::history::History;
use crate::operation::{OperationId, OperationKind, Stage, Swap};

/// Where a drop landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DropTarget {
    /// Directly on a cell.
    Cell { cell: CellId },
    /// On an item; resolves to the cell that holds it.
    Item { item: ItemId },
    /// Outside any cell.
    Outside,
}

/// Why a drop did not produce an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    NoActiveDrag,
    OutsideGrid,
    SameCell,
    Animating,
    SourceMissing,
}

impl std::fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            IgnoreReason::NoActiveDrag => "no drag in progress",
            IgnoreReason::OutsideGrid => "drop outside any cell",
            IgnoreReason::SameCell => "dropped onto its own cell",
            IgnoreReason::Animating => "a transition is still running",
            IgnoreReason::SourceMissing => "dragged item is no longer in the grid",
        };
        f.write_str(text)
    }
}

/// Outcome of a drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropOutcome {
    Submitted(OperationId),
    Ignored(IgnoreReason),
}

/// Transient state of the current drag gesture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InteractionSession {
    /// The item being dragged.
    pub source: Option<ItemId>,
    /// Whether the source is currently hidden from its cell.
    pub hidden: bool,
    /// Hide requested for the next scheduling tick.
    pub hide_pending: bool,
}

/// Translates raw drag signals into swaps.
#[derive(Debug, Clone, Default)]
pub struct DragController {
    session: InteractionSession,
    block_while_animating: bool,
}

impl DragController {
    pub fn new(block_while_animating: bool) -> Self {
        Self {
            session: InteractionSession::default(),
            block_while_animating,
        }
    }

    pub fn session(&self) -> &InteractionSession {
        &self.session
    }

    pub fn set_block_while_animating(&mut self, block: bool) {
        self.block_while_animating = block;
    }

    /// Begin dragging `item`.
    ///
    /// The item is not hidden right away; hiding it during the same tick
    /// would blank the drag image. Call [`DragController::flush_deferred`] on
    /// the next tick.
    pub fn drag_start(&mut self, item: ItemId) {
        self.session = InteractionSession {
            source: Some(item),
            hidden: false,
            hide_pending: true,
        };
        debug!(item, "Drag started");
    }

    /// Apply the hide deferred by `drag_start(item)`. Returns true if something changed.
    ///
    /// A flush scheduled for an earlier drag is ignored.
    pub fn flush_deferred(&mut self, item: ItemId) -> bool {
        if !self.session.hide_pending || self.session.source != Some(item) {
            return false;
        }
        self.session.hide_pending = false;
        self.session.hidden = true;
        true
    }

    /// End of the gesture, whether or not a drop happened.
    pub fn drag_end(&mut self) {
        if let Some(item) = self.session.source {
            debug!(item, "Drag ended");
        }
        self.session = InteractionSession::default();
    }

    /// Resolve a drop and submit the resulting swap.
    pub fn drop_on(&mut self, target: DropTarget, history: &mut History, stage: &mut Stage<'_>) -> DropOutcome {
        match self.resolve(target, stage) {
            Ok(swap) => {
                let id = history.execute(OperationKind::Swap(swap), stage);
                DropOutcome::Submitted(id)
            }
            Err(reason) => {
                debug!(?target, %reason, "Drop ignored");
                DropOutcome::Ignored(reason)
            }
        }
    }

    /// Build the swap a drop would produce, reading occupancy now.
    pub fn resolve(&self, target: DropTarget, stage: &Stage<'_>) -> Result<Swap, IgnoreReason> {
        let source = self.session.source.ok_or(IgnoreReason::NoActiveDrag)?;

        if self.block_while_animating && stage.animator.is_animating() {
            return Err(IgnoreReason::Animating);
        }

        let target_cell = match target {
            DropTarget::Cell { cell } => stage.grid.cell(cell).map(|c| c.id),
            DropTarget::Item { item } => stage.grid.cell_of(item),
            DropTarget::Outside => None,
        }
        .ok_or(IgnoreReason::OutsideGrid)?;

        let origin = stage.grid.cell_of(source).ok_or(IgnoreReason::SourceMissing)?;
        if origin == target_cell {
            return Err(IgnoreReason::SameCell);
        }

        // Occupancy of a cell with a transition in flight is not final yet.
        if stage.animator.touches(origin) || stage.animator.touches(target_cell) {
            return Err(IgnoreReason::Animating);
        }

        let displaced = stage.grid.item_at(target_cell);
        Ok(Swap::new(source, origin, displaced, target_cell))
    }
}
