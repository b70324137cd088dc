//! Cellswap Core
//!
//! Platform-agnostic engine for rearranging items in a grid by drag-and-drop.
//!
//! This crate implements the model behind the interaction:
//! - Items live in cells, cells in rows; rows keep a stable identity
//! - Every mutation is a reversible operation recorded in a linear history
//! - Moves are shown as transitions and only committed to the grid once they land

pub mod animator;
pub mod board;
pub mod drag;
pub mod grid;
pub mod history;
pub mod layout;
pub mod operation;

pub use animator::{Animator, Easing, Landed, Motion, Transition, TransitionId, DEFAULT_DURATION_MS};
pub use board::{Affordances, Board, BoardSettings};
pub use drag::{DragController, DropOutcome, DropTarget, IgnoreReason, InteractionSession};
pub use grid::{Cell, CellId, DetachedRow, Grid, GridError, Item, ItemId, NewItem, Row, RowId};
pub use history::{History, Step};
pub use layout::{CellGeometry, Offset, Rect, TableLayout};
pub use operation::{Operation, OperationId, OperationKind, RowInsertion, Stage, Swap, SwapPhase};
