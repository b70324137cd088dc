//! Linear undo/redo history.
//!
//! The history is an ordered list of operations and a cursor. Entries before
//! the cursor have been applied; entries after it form an undone future that
//! [`History::redo`] can replay. Executing a new operation discards that
//! future.

use tracing::debug;

use crate::operation::{Operation, OperationId, OperationKind, Stage};

/// Result of an undo/redo request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The operation was replayed.
    Applied(OperationId),
    /// Nothing left to undo or redo.
    Exhausted,
    /// A transition is still in flight.
    Busy,
}

impl Step {
    pub fn applied(&self) -> bool {
        matches!(self, Step::Applied(_))
    }
}

/// Ordered operations plus a cursor.
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<Operation>,
    /// Number of applied entries; the cursor `p` is `applied - 1`.
    applied: usize,
    next_id: OperationId,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            applied: 0,
            next_id: 1,
        }
    }

    /// Index of the most recently applied operation, `None` before the first.
    pub fn cursor(&self) -> Option<usize> {
        self.applied.checked_sub(1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Operation] {
        &self.entries
    }

    pub fn can_undo(&self) -> bool {
        self.applied > 0
    }

    pub fn can_redo(&self) -> bool {
        self.applied < self.entries.len()
    }

    /// Drop the undone future, run `kind` and record it as the newest entry.
    pub fn execute(&mut self, kind: OperationKind, stage: &mut Stage<'_>) -> OperationId {
        let discarded = self.entries.len() - self.applied;
        if discarded > 0 {
            debug!(discarded, "Discarding undone operations");
            self.entries.truncate(self.applied);
        }

        let id = self.next_id;
        self.next_id += 1;

        let mut op = Operation::new(id, kind);
        op.execute(stage);
        self.entries.push(op);
        self.applied += 1;
        id
    }

    /// Revert the most recently applied operation.
    pub fn undo(&mut self, stage: &mut Stage<'_>) -> Step {
        if stage.animator.is_animating() {
            return Step::Busy;
        }
        let Some(index) = self.cursor() else {
            return Step::Exhausted;
        };

        let op = &mut self.entries[index];
        op.undo(stage);
        self.applied -= 1;
        Step::Applied(op.id())
    }

    /// Replay the first undone operation.
    pub fn redo(&mut self, stage: &mut Stage<'_>) -> Step {
        if stage.animator.is_animating() {
            return Step::Busy;
        }
        if !self.can_redo() {
            return Step::Exhausted;
        }

        let op = &mut self.entries[self.applied];
        op.redo(stage);
        self.applied += 1;
        Step::Applied(op.id())
    }

    /// Mark an operation whose transitions have all landed.
    pub fn settle(&mut self, id: OperationId) {
        if let Some(op) = self.entries.iter_mut().find(|op| op.id() == id) {
            op.settle();
        }
    }

    /// Forget every entry without touching the grid.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.applied = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animator::Animator;
    use crate::grid::{Grid, NewItem};
    use crate::layout::TableLayout;
    use crate::operation::RowInsertion;

    struct Fixture {
        grid: Grid,
        animator: Animator,
        layout: TableLayout,
        history: History,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                grid: Grid::new(),
                animator: Animator::default(),
                layout: TableLayout::default(),
                history: History::new(),
            }
        }

        fn add_row(&mut self, label: &str) -> OperationId {
            let row = self.grid.build_row([Some(NewItem::new(label, "#000000"))]);
            let mut stage = Stage {
                grid: &mut self.grid,
                animator: &mut self.animator,
                geometry: &self.layout,
            };
            self.history
                .execute(OperationKind::RowInsertion(RowInsertion::new(row)), &mut stage)
        }

        fn undo(&mut self) -> Step {
            let mut stage = Stage {
                grid: &mut self.grid,
                animator: &mut self.animator,
                geometry: &self.layout,
            };
            self.history.undo(&mut stage)
        }

        fn redo(&mut self) -> Step {
            let mut stage = Stage {
                grid: &mut self.grid,
                animator: &mut self.animator,
                geometry: &self.layout,
            };
            self.history.redo(&mut stage)
        }
    }

    #[test]
    fn test_empty_history() {
        let mut fx = Fixture::new();
        assert!(fx.history.is_empty());
        assert_eq!(fx.history.cursor(), None);
        assert!(!fx.history.can_undo());
        assert!(!fx.history.can_redo());
        assert_eq!(fx.undo(), Step::Exhausted);
        assert_eq!(fx.redo(), Step::Exhausted);
    }

    #[test]
    fn test_execute_advances_cursor() {
        let mut fx = Fixture::new();
        fx.add_row("100");
        fx.add_row("200");
        assert_eq!(fx.history.len(), 2);
        assert_eq!(fx.history.cursor(), Some(1));
        assert!(fx.history.can_undo());
        assert!(!fx.history.can_redo());
    }

    #[test]
    fn test_undo_redo_boundaries() {
        let mut fx = Fixture::new();
        let id = fx.add_row("100");

        assert_eq!(fx.redo(), Step::Exhausted);
        assert_eq!(fx.undo(), Step::Applied(id));
        assert_eq!(fx.history.cursor(), None);
        assert_eq!(fx.undo(), Step::Exhausted);
        assert_eq!(fx.history.len(), 1);

        assert_eq!(fx.redo(), Step::Applied(id));
        assert_eq!(fx.history.cursor(), Some(0));
        assert_eq!(fx.redo(), Step::Exhausted);
    }

    #[test]
    fn test_execute_after_undo_discards_future() {
        let mut fx = Fixture::new();
        let r1 = fx.add_row("100");
        assert_eq!(fx.undo(), Step::Applied(r1));
        assert!(fx.history.can_redo());
        assert!(fx.grid.is_empty());

        let r2 = fx.add_row("200");
        assert_eq!(fx.history.len(), 1);
        assert_eq!(fx.history.entries()[0].id(), r2);
        assert!(!fx.history.can_redo());
        assert_eq!(fx.grid.row_count(), 1);
    }

    #[test]
    fn test_undo_redo_never_change_entries() {
        let mut fx = Fixture::new();
        fx.add_row("100");
        fx.add_row("200");
        fx.add_row("300");
        let ids: Vec<_> = fx.history.entries().iter().map(|op| op.id()).collect();

        fx.undo();
        fx.undo();
        fx.redo();
        let after: Vec<_> = fx.history.entries().iter().map(|op| op.id()).collect();
        assert_eq!(ids, after);
        assert_eq!(fx.history.cursor(), Some(1));
    }

    #[test]
    fn test_undo_blocked_while_animating() {
        let mut fx = Fixture::new();
        fx.add_row("100");
        fx.animator.animate(
            crate::animator::Motion {
                op: 99,
                item: 1,
                from: crate::grid::CellId::new(1, 0),
                to: crate::grid::CellId::new(1, 0),
            },
            None,
            None,
        );

        assert_eq!(fx.undo(), Step::Busy);
        assert_eq!(fx.history.cursor(), Some(0));

        fx.animator.tick(0);
        assert!(fx.undo().applied());
        assert_eq!(fx.redo(), Step::Applied(1));
    }

    #[test]
    fn test_clear() {
        let mut fx = Fixture::new();
        fx.add_row("100");
        fx.add_row("200");
        fx.history.clear();
        assert!(fx.history.is_empty());
        assert!(!fx.history.can_undo());
        // The grid is untouched.
        assert_eq!(fx.grid.row_count(), 2);
    }
}
