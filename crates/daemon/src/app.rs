//! Daemon application state and command handling.

use cellswap_core::{
    Affordances, Board, CellId, DropOutcome, DropTarget, NewItem, OperationKind, Step,
};
use cellswap_ipc::{
    CellInfo, DropPoint, HistoryEntryInfo, IpcCommand, IpcResponse, ItemInfo, RowInfo,
};
use rand::prelude::*;
use tracing::{debug, info, warn};

use crate::config::Config;

/// Produces the contents of newly added rows.
///
/// Row `n` (1-based, counted after insertion) holds items labelled
/// `n*100`, `n*100 + 100`, ... each with a random color.
#[derive(Debug)]
pub struct RowFactory {
    items_per_row: usize,
    rng: StdRng,
}

impl RowFactory {
    pub fn new(items_per_row: usize) -> Self {
        Self {
            items_per_row,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Deterministic colors, for tests.
    pub fn seeded(items_per_row: usize, seed: u64) -> Self {
        Self {
            items_per_row,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn items_per_row(&self) -> usize {
        self.items_per_row
    }

    pub fn set_items_per_row(&mut self, items_per_row: usize) {
        self.items_per_row = items_per_row;
    }

    /// Items for the row that will become row number `row_number`.
    pub fn items(&mut self, row_number: usize) -> Vec<Option<NewItem>> {
        let base = row_number * 100;
        (0..self.items_per_row)
            .map(|i| Some(NewItem::new((base + i * 100).to_string(), self.random_color())))
            .collect()
    }

    fn random_color(&mut self) -> String {
        format!("#{:06X}", self.rng.random_range(0..=0xFF_FFFFu32))
    }
}

/// Everything the event loop owns.
pub struct AppState {
    pub board: Board,
    pub config: Config,
    rows: RowFactory,
}

impl AppState {
    pub fn new_with_config(config: Config) -> Self {
        let rows = RowFactory::new(config.grid.items_per_row);
        Self::with_factory(config, rows)
    }

    /// Build the board and seed its initial rows. Seeding is not undoable.
    pub fn with_factory(config: Config, rows: RowFactory) -> Self {
        let board = Board::new(config.board_settings(), config.table_layout());
        let mut state = Self { board, config, rows };

        for _ in 0..state.config.grid.initial_rows {
            state.add_row();
        }
        state.board.reset_history();
        info!(
            "Seeded {} rows of {} items",
            state.board.grid().row_count(),
            state.rows.items_per_row()
        );
        state
    }

    /// Apply the outcome of a config reload. A failed load keeps the current config.
    pub fn reload(&mut self, loaded: anyhow::Result<Config>) -> IpcResponse {
        match loaded {
            Ok(mut config) => {
                for w in config.validate() {
                    warn!("Config: {} - {}", w.field, w.message);
                }
                self.apply_config(config);
                info!("Configuration reloaded");
                self.ok()
            }
            Err(e) => IpcResponse::error(format!("Failed to reload config: {:#}", e)),
        }
    }

    /// Apply a reloaded configuration. Existing rows are kept.
    pub fn apply_config(&mut self, config: Config) {
        self.board.apply_settings(config.board_settings());
        self.board.set_geometry(config.table_layout());
        self.rows.set_items_per_row(config.grid.items_per_row);
        self.config = config;
    }

    pub fn is_animating(&self) -> bool {
        self.board.is_animating()
    }

    /// Tick all active transitions by the given delta time.
    /// Returns true if any transition is still running.
    pub fn tick_animations(&mut self, delta_ms: u64) -> bool {
        let landed = self.board.tick(delta_ms);
        if !landed.is_empty() {
            debug!("{} transition(s) landed", landed.len());
        }
        self.board.is_animating()
    }

    /// Hide the drag source one tick after its drag started.
    pub fn flush_deferred(&mut self, item: u64) -> bool {
        self.board.flush_deferred(item)
    }

    fn add_row(&mut self) -> u64 {
        let items = self.rows.items(self.board.grid().row_count() + 1);
        self.board.add_row(items)
    }

    fn ok(&self) -> IpcResponse {
        let Affordances { can_undo, can_redo } = self.board.affordances();
        IpcResponse::Ok { can_undo, can_redo }
    }

    fn ignored(&self, reason: impl Into<String>) -> IpcResponse {
        let Affordances { can_undo, can_redo } = self.board.affordances();
        IpcResponse::Ignored {
            reason: reason.into(),
            can_undo,
            can_redo,
        }
    }

    pub fn handle_command(&mut self, cmd: IpcCommand) -> IpcResponse {
        match cmd {
            IpcCommand::DragStart { item } => {
                if self.board.drag_start(item) {
                    self.ok()
                } else if self.board.grid().item(item).is_some() {
                    self.ignored(format!("item {} is not draggable", item))
                } else {
                    IpcResponse::error(format!("Item {} not found", item))
                }
            }
            IpcCommand::DragEnd => {
                self.board.drag_end();
                self.ok()
            }
            IpcCommand::Drop { target } => {
                let target = match target {
                    DropPoint::Cell { row, column } => DropTarget::Cell {
                        cell: CellId::new(row, column),
                    },
                    DropPoint::Item { item } => DropTarget::Item { item },
                    DropPoint::Outside => DropTarget::Outside,
                };
                match self.board.drop_on(target) {
                    DropOutcome::Submitted(_) => self.ok(),
                    DropOutcome::Ignored(reason) => self.ignored(reason.to_string()),
                }
            }
            IpcCommand::TransitionEnd { transition } => {
                if self.board.transition_end(transition) {
                    self.ok()
                } else {
                    self.ignored(format!("transition {} is not running", transition))
                }
            }
            IpcCommand::Undo => match self.board.undo() {
                Step::Applied(_) => self.ok(),
                Step::Exhausted => self.ignored("nothing to undo"),
                Step::Busy => self.ignored("a transition is still running"),
            },
            IpcCommand::Redo => match self.board.redo() {
                Step::Applied(_) => self.ok(),
                Step::Exhausted => self.ignored("nothing to redo"),
                Step::Busy => self.ignored("a transition is still running"),
            },
            IpcCommand::AddRow => {
                self.add_row();
                self.ok()
            }
            IpcCommand::QueryGrid => self.grid_state(),
            IpcCommand::QueryHistory => self.history_state(),
            IpcCommand::WaitSettled => {
                // The event loop defers this while animating; answer directly when idle.
                if self.is_animating() {
                    self.ignored("a transition is still running")
                } else {
                    let Affordances { can_undo, can_redo } = self.board.affordances();
                    IpcResponse::Settled { can_undo, can_redo }
                }
            }
            IpcCommand::Reload => self.reload(Config::load()),
            IpcCommand::Stop => {
                info!("Stop command received");
                self.ok()
            }
        }
    }

    fn grid_state(&self) -> IpcResponse {
        let grid = self.board.grid();
        let session = self.board.session();
        let transitions = self.board.animator().transitions();

        let rows = grid
            .rows()
            .iter()
            .map(|row| RowInfo {
                id: row.id,
                cells: row
                    .cells
                    .iter()
                    .map(|cell| CellInfo {
                        column: cell.id.column,
                        item: cell.item.and_then(|id| grid.item(id)).map(|item| ItemInfo {
                            id: item.id,
                            label: item.label.clone(),
                            color: item.color.clone(),
                            draggable: item.draggable,
                            hidden: session.hidden && session.source == Some(item.id),
                            offset: self.board.animator().offset_of(item.id).map(|o| (o.dx, o.dy)),
                            transition: transitions
                                .iter()
                                .find(|t| t.motion().item == item.id)
                                .map(|t| t.id()),
                        }),
                    })
                    .collect(),
            })
            .collect();

        IpcResponse::GridState {
            rows,
            animating: self.is_animating(),
        }
    }

    fn history_state(&self) -> IpcResponse {
        let history = self.board.history();
        let entries = history
            .entries()
            .iter()
            .map(|op| {
                let summary = match op.kind() {
                    OperationKind::Swap(swap) => format!(
                        "item {} ({}, {}) -> ({}, {})",
                        swap.dragged(),
                        swap.origin().row,
                        swap.origin().column,
                        swap.target().row,
                        swap.target().column
                    ),
                    OperationKind::RowInsertion(insertion) => format!("row {}", insertion.row()),
                };
                HistoryEntryInfo {
                    id: op.id(),
                    kind: op.kind().name().to_string(),
                    summary,
                }
            })
            .collect();

        IpcResponse::HistoryState {
            entries,
            cursor: history.cursor(),
            can_undo: history.can_undo(),
            can_redo: history.can_redo(),
        }
    }
}
