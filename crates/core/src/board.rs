//! A single interactive grid.
//!
//! [`Board`] owns the grid, its animator, history and drag controller, and is
//! the surface hosts talk to. Landed transitions are committed into the grid
//! here, and callers that need to wait for motion to finish can await
//! [`Board::settled`].

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::animator::{Animator, Easing, Landed, TransitionId, DEFAULT_DURATION_MS};
use crate::drag::{DragController, DropOutcome, DropTarget, InteractionSession};
use crate::grid::{Grid, ItemId, NewItem};
use crate::history::{History, Step};
use crate::layout::{CellGeometry, TableLayout};
use crate::operation::{OperationId, OperationKind, RowInsertion, Stage};

/// Which history controls should be enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Affordances {
    pub can_undo: bool,
    pub can_redo: bool,
}

/// Tunables for a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardSettings {
    pub duration_ms: u64,
    pub easing: Easing,
    /// Reject drops while any transition is in flight.
    pub block_drops_while_animating: bool,
}

impl Default for BoardSettings {
    fn default() -> Self {
        Self {
            duration_ms: DEFAULT_DURATION_MS,
            easing: Easing::default(),
            block_drops_while_animating: true,
        }
    }
}

/// One grid and everything needed to rearrange it.
#[derive(Debug)]
pub struct Board<G = TableLayout> {
    grid: Grid,
    animator: Animator,
    history: History,
    drag: DragController,
    geometry: G,
    waiters: Vec<oneshot::Sender<Affordances>>,
}

impl Default for Board {
    fn default() -> Self {
        Self::new(BoardSettings::default(), TableLayout::default())
    }
}

impl<G: CellGeometry> Board<G> {
    pub fn new(settings: BoardSettings, geometry: G) -> Self {
        Self {
            grid: Grid::new(),
            animator: Animator::new(settings.duration_ms, settings.easing),
            history: History::new(),
            drag: DragController::new(settings.block_drops_while_animating),
            geometry,
            waiters: Vec::new(),
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn animator(&self) -> &Animator {
        &self.animator
    }

    pub fn geometry(&self) -> &G {
        &self.geometry
    }

    pub fn session(&self) -> &InteractionSession {
        self.drag.session()
    }

    pub fn is_animating(&self) -> bool {
        self.animator.is_animating()
    }

    pub fn affordances(&self) -> Affordances {
        Affordances {
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
        }
    }

    /// Apply new settings; timing changes affect transitions started later.
    pub fn apply_settings(&mut self, settings: BoardSettings) {
        self.animator.set_timing(settings.duration_ms, settings.easing);
        self.drag
            .set_block_while_animating(settings.block_drops_while_animating);
    }

    /// Replace the geometry, e.g. after a config reload.
    pub fn set_geometry(&mut self, geometry: G) {
        self.geometry = geometry;
    }

    fn parts(&mut self) -> (&mut History, &mut DragController, Stage<'_>) {
        (
            &mut self.history,
            &mut self.drag,
            Stage {
                grid: &mut self.grid,
                animator: &mut self.animator,
                geometry: &self.geometry,
            },
        )
    }

    /// Forget all recorded operations, keeping the grid as it is.
    pub fn reset_history(&mut self) {
        self.history.clear();
    }

    /// Build a row and append it through the history.
    pub fn add_row<I>(&mut self, cells: I) -> OperationId
    where
        I: IntoIterator<Item = Option<NewItem>>,
    {
        let row = self.grid.build_row(cells);
        let row_id = row.id();
        let (history, _, mut stage) = self.parts();
        let op = history.execute(OperationKind::RowInsertion(RowInsertion::new(row)), &mut stage);
        info!(row = row_id, op, "Row added");
        op
    }

    /// Begin dragging an item. Unknown or pinned items are ignored.
    pub fn drag_start(&mut self, item: ItemId) -> bool {
        match self.grid.item(item) {
            Some(found) if found.draggable => {
                self.drag.drag_start(item);
                true
            }
            Some(_) => {
                debug!(item, "Item is not draggable");
                false
            }
            None => {
                debug!(item, "Drag started on unknown item");
                false
            }
        }
    }

    /// Run the hide deferred by `drag_start(item)`.
    pub fn flush_deferred(&mut self, item: ItemId) -> bool {
        self.drag.flush_deferred(item)
    }

    pub fn drag_end(&mut self) {
        self.drag.drag_end();
    }

    /// Drop the active drag source onto `target`.
    pub fn drop_on(&mut self, target: DropTarget) -> DropOutcome {
        let (history, drag, mut stage) = self.parts();
        let outcome = drag.drop_on(target, history, &mut stage);
        if let DropOutcome::Submitted(op) = outcome {
            info!(op, "Swap submitted");
        }
        outcome
    }

    pub fn undo(&mut self) -> Step {
        let (history, _, mut stage) = self.parts();
        let step = history.undo(&mut stage);
        debug!(?step, "Undo requested");
        step
    }

    pub fn redo(&mut self) -> Step {
        let (history, _, mut stage) = self.parts();
        let step = history.redo(&mut stage);
        debug!(?step, "Redo requested");
        step
    }

    /// Advance transitions and commit the ones that landed.
    pub fn tick(&mut self, delta_ms: u64) -> Vec<Landed> {
        let landed = self.animator.tick(delta_ms);
        self.commit(&landed);
        landed
    }

    /// The renderer reports that a transition finished.
    ///
    /// Returns false for unknown or already-completed transitions.
    pub fn transition_end(&mut self, id: TransitionId) -> bool {
        match self.animator.signal_end(id) {
            Some(landed) => {
                self.commit(&[landed]);
                true
            }
            None => false,
        }
    }

    /// Resolves with the current affordances once no transition is running.
    pub fn settled(&mut self) -> oneshot::Receiver<Affordances> {
        let (tx, rx) = oneshot::channel();
        if self.is_animating() {
            self.waiters.push(tx);
        } else {
            let _ = tx.send(self.affordances());
        }
        rx
    }

    fn commit(&mut self, landed: &[Landed]) {
        for done in landed {
            let m = done.motion;
            if let Err(e) = self.grid.commit_move(m.item, m.from, m.to) {
                warn!("Failed to commit transition {}: {}", done.transition, e);
            }
        }

        let mut ops: Vec<OperationId> = landed.iter().map(|l| l.motion.op).collect();
        ops.dedup();
        for op in ops {
            if !self.animator.in_flight(op) {
                debug!(op, "Operation committed");
                self.history.settle(op);
            }
        }

        if !self.animator.is_animating() && !self.waiters.is_empty() {
            let affordances = self.affordances();
            for waiter in self.waiters.drain(..) {
                let _ = waiter.send(affordances);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drag::IgnoreReason;
    use crate::grid::{CellId, RowId};
    use crate::operation::SwapPhase;

    fn item(label: &str) -> Option<NewItem> {
        Some(NewItem::new(label, "#abcdef"))
    }

    /// Add a row that cannot be undone, the way hosts populate a new board.
    fn seed_row(board: &mut Board, cells: Vec<Option<NewItem>>) -> RowId {
        board.add_row(cells);
        board.reset_history();
        board.grid().rows().last().unwrap().id
    }

    fn board_with_row() -> (Board, CellId, CellId) {
        let mut board = Board::default();
        let row = seed_row(&mut board, vec![item("100"), item("200"), item("300")]);
        (board, CellId::new(row, 0), CellId::new(row, 1))
    }

    fn label_at(board: &Board, cell: CellId) -> String {
        let id = board.grid().item_at(cell).unwrap();
        board.grid().item(id).unwrap().label.clone()
    }

    fn drag(board: &mut Board, from: CellId, to: CellId) -> DropOutcome {
        let source = board.grid().item_at(from).unwrap();
        board.drag_start(source);
        board.flush_deferred(source);
        let outcome = board.drop_on(DropTarget::Cell { cell: to });
        board.drag_end();
        outcome
    }

    fn finish(board: &mut Board) {
        board.tick(DEFAULT_DURATION_MS);
        assert!(!board.is_animating());
    }

    #[test]
    fn test_swap_scenario() {
        let (mut board, a, b) = board_with_row();

        assert!(matches!(drag(&mut board, a, b), DropOutcome::Submitted(_)));
        // Structure is unchanged until the transitions land.
        assert_eq!(label_at(&board, a), "100");
        assert!(board.is_animating());
        finish(&mut board);

        assert_eq!(label_at(&board, a), "200");
        assert_eq!(label_at(&board, b), "100");
        assert_eq!(
            board.affordances(),
            Affordances {
                can_undo: true,
                can_redo: false
            }
        );

        assert!(board.undo().applied());
        finish(&mut board);
        assert_eq!(label_at(&board, a), "100");
        assert_eq!(label_at(&board, b), "200");
        assert!(board.affordances().can_redo);

        assert!(board.redo().applied());
        finish(&mut board);
        assert_eq!(label_at(&board, a), "200");
        assert_eq!(label_at(&board, b), "100");
    }

    #[test]
    fn test_undo_redo_gated_by_animation() {
        let (mut board, a, b) = board_with_row();
        drag(&mut board, a, b);

        assert_eq!(board.undo(), Step::Busy);
        finish(&mut board);
        assert!(board.undo().applied());
        assert_eq!(board.redo(), Step::Busy);
        finish(&mut board);
        assert!(board.redo().applied());
    }

    #[test]
    fn test_swap_phase_reaches_committed() {
        let (mut board, a, b) = board_with_row();
        drag(&mut board, a, b);

        let phase = |board: &Board| match board.history().entries()[0].kind() {
            OperationKind::Swap(swap) => swap.phase(),
            other => panic!("unexpected operation {other:?}"),
        };
        assert_eq!(phase(&board), SwapPhase::Animating);
        board.tick(100);
        assert_eq!(phase(&board), SwapPhase::Animating);
        finish(&mut board);
        assert_eq!(phase(&board), SwapPhase::Committed);
    }

    #[test]
    fn test_renderer_signals_commit_each_half_once() {
        let (mut board, a, b) = board_with_row();
        drag(&mut board, a, b);

        let ids: Vec<_> = board.animator().transitions().iter().map(|t| t.id()).collect();
        assert_eq!(ids.len(), 2);

        // Displaced half first, then the dragged half, with duplicates.
        assert!(board.transition_end(ids[1]));
        assert!(!board.transition_end(ids[1]));
        assert!(board.is_animating());
        assert!(board.transition_end(ids[0]));
        assert!(!board.transition_end(ids[0]));

        assert!(!board.is_animating());
        assert_eq!(label_at(&board, a), "200");
        assert_eq!(label_at(&board, b), "100");
    }

    #[test]
    fn test_row_scenario_discards_future() {
        let mut board = Board::default();
        board.add_row([item("100")]);
        let r1 = board.grid().rows()[0].id;
        assert_eq!(board.history().cursor(), Some(0));

        assert!(board.undo().applied());
        assert!(board.grid().is_empty());
        assert_eq!(board.history().cursor(), None);

        board.add_row([item("200")]);
        assert_eq!(board.history().len(), 1);
        assert!(!board.affordances().can_redo);
        assert_ne!(board.grid().rows()[0].id, r1);
    }

    #[test]
    fn test_row_identity_survives_undo_redo() {
        let mut board = Board::default();
        seed_row(&mut board, vec![item("100")]);
        board.add_row([item("200")]);
        let inserted = board.grid().rows()[1].id;

        board.undo();
        board.redo();
        assert_eq!(board.grid().row_index(inserted), Some(1));
        board.undo();
        assert!(board.grid().row(inserted).is_none());
        assert_eq!(board.grid().row_count(), 1);
    }

    #[test]
    fn test_pinned_and_unknown_items_cannot_be_dragged() {
        let mut board = Board::default();
        let row = seed_row(&mut board, vec![Some(NewItem::new("1", "#000000").pinned()), None]);
        let pinned = board.grid().item_at(CellId::new(row, 0)).unwrap();

        assert!(!board.drag_start(pinned));
        assert!(!board.drag_start(9999));
        assert_eq!(board.session().source, None);
    }

    #[test]
    fn test_reset_history_after_seeding() {
        let mut board = Board::default();
        board.add_row([item("100")]);
        board.add_row([item("200")]);
        board.reset_history();
        assert_eq!(board.affordances(), Affordances::default());
        assert_eq!(board.grid().row_count(), 2);
    }

    #[tokio::test]
    async fn test_settled_resolves_after_landing() {
        let (mut board, a, b) = board_with_row();
        drag(&mut board, a, b);

        let mut waiter = board.settled();
        assert!(waiter.try_recv().is_err());
        finish(&mut board);

        let affordances = waiter.await.unwrap();
        assert!(affordances.can_undo);
        assert!(!affordances.can_redo);
    }

    #[tokio::test]
    async fn test_settled_resolves_immediately_when_idle() {
        let mut board = Board::default();
        let affordances = board.settled().await.unwrap();
        assert_eq!(affordances, Affordances::default());
    }

    #[test]
    fn test_independent_boards() {
        let (mut first, a, b) = board_with_row();
        let (mut second, _, _) = board_with_row();

        drag(&mut first, a, b);
        assert!(first.is_animating());
        assert!(!second.is_animating());
        assert_eq!(second.undo(), Step::Exhausted);
    }

    #[test]
    fn test_unblocked_drops_never_orphan_items() {
        let mut board = Board::new(
            BoardSettings {
                block_drops_while_animating: false,
                ..BoardSettings::default()
            },
            TableLayout::default(),
        );
        let row = seed_row(&mut board, vec![item("100"), item("200"), None]);
        let (a, b, c) = (CellId::new(row, 0), CellId::new(row, 1), CellId::new(row, 2));

        assert!(matches!(drag(&mut board, a, c), DropOutcome::Submitted(_)));
        assert_eq!(drag(&mut board, b, c), DropOutcome::Ignored(IgnoreReason::Animating));
        finish(&mut board);

        let grid = board.grid();
        let held: Vec<_> = grid.occupancy().into_iter().filter_map(|(_, item)| item).collect();
        assert_eq!(held.len(), grid.item_count());
        assert_eq!(label_at(&board, c), "100");
        assert_eq!(label_at(&board, b), "200");
        assert_eq!(board.grid().item_at(a), None);
    }
}
