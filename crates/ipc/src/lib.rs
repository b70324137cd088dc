//! Cellswap IPC Protocol
//!
//! Shared types for daemon-CLI communication over a local TCP socket.
//! Each message is a single JSON object terminated by a newline.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default address the daemon listens on.
pub const DEFAULT_ADDRESS: &str = "127.0.0.1:7878";

/// Maximum size of a single IPC message in bytes (64KB).
pub const MAX_IPC_MESSAGE_SIZE: usize = 64 * 1024;

/// Commands that can be sent from the CLI to the daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IpcCommand {
    /// Start dragging an item.
    DragStart {
        /// ID of the item being dragged.
        item: u64,
    },
    /// End the current drag gesture, dropped or not.
    DragEnd,
    /// Drop the dragged item.
    Drop {
        /// Where it was dropped.
        target: DropPoint,
    },
    /// A renderer reports that a transition finished.
    TransitionEnd {
        /// Transition ID as reported in the grid state.
        transition: u64,
    },

    /// Undo the most recent operation.
    Undo,
    /// Redo the most recently undone operation.
    Redo,
    /// Append a new row of items.
    AddRow,

    /// Query the grid contents.
    QueryGrid,
    /// Query the operation history.
    QueryHistory,
    /// Respond once no transition is running.
    WaitSettled,
    /// Reload configuration from disk.
    Reload,
    /// Stop the daemon.
    Stop,
}

/// Drop location on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DropPoint {
    /// A cell, addressed by row ID and column index.
    Cell { row: u64, column: usize },
    /// The cell currently holding an item.
    Item { item: u64 },
    /// Outside every cell.
    Outside,
}

/// Responses from the daemon to the CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IpcResponse {
    /// Command executed successfully.
    Ok { can_undo: bool, can_redo: bool },
    /// Command was valid but had no effect.
    Ignored {
        /// Why nothing happened.
        reason: String,
        can_undo: bool,
        can_redo: bool,
    },
    /// Command failed with an error.
    Error {
        /// Error message describing what went wrong.
        message: String,
    },
    /// Grid query response.
    GridState {
        /// Rows in display order.
        rows: Vec<RowInfo>,
        /// Whether any transition is in flight.
        animating: bool,
    },
    /// History query response.
    HistoryState {
        /// Recorded operations, oldest first.
        entries: Vec<HistoryEntryInfo>,
        /// Index of the most recently applied entry.
        cursor: Option<usize>,
        can_undo: bool,
        can_redo: bool,
    },
    /// All transitions have landed.
    Settled { can_undo: bool, can_redo: bool },
}

impl IpcResponse {
    /// Create an error response.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

/// One row in a grid query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowInfo {
    pub id: u64,
    pub cells: Vec<CellInfo>,
}

/// One cell in a grid query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellInfo {
    pub column: usize,
    pub item: Option<ItemInfo>,
}

/// An item as seen by a renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemInfo {
    pub id: u64,
    pub label: String,
    pub color: String,
    pub draggable: bool,
    /// Hidden while being dragged.
    pub hidden: bool,
    /// Current visual offset while in transit.
    pub offset: Option<(f64, f64)>,
    /// Transition carrying this item, if any.
    pub transition: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntryInfo {
    pub id: u64,
    /// `swap` or `row_insertion`.
    pub kind: String,
    pub summary: String,
}

/// Failure to decode an incoming line.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Message exceeds {MAX_IPC_MESSAGE_SIZE} bytes")]
    TooLarge,

    #[error("Empty command")]
    Empty,

    #[error("Invalid command: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Parse a single wire line into a command.
pub fn decode_command(line: &str) -> Result<IpcCommand, ProtocolError> {
    if line.len() > MAX_IPC_MESSAGE_SIZE {
        return Err(ProtocolError::TooLarge);
    }
    let line = line.trim();
    if line.is_empty() {
        return Err(ProtocolError::Empty);
    }
    Ok(serde_json::from_str(line)?)
}

/// Serialize a message followed by the line terminator.
pub fn encode_line<T: Serialize>(message: &T) -> Result<String, serde_json::Error> {
    let mut json = serde_json::to_string(message)?;
    json.push('\n');
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_serialization() {
        let cmd = IpcCommand::Undo;
        let json = serde_json::to_string(&cmd).unwrap();
        assert_eq!(json, r#"{"type":"undo"}"#);

        let cmd2: IpcCommand = serde_json::from_str(&json).unwrap();
        assert_eq!(cmd, cmd2);
    }

    #[test]
    fn test_reload_command_wire_format() {
        assert_eq!(decode_command(r#"{"type":"reload"}"#).unwrap(), IpcCommand::Reload);
    }

    #[test]
    fn test_drop_command_wire_format() {
        let cmd = IpcCommand::Drop {
            target: DropPoint::Cell { row: 2, column: 1 },
        };
        let json = serde_json::to_string(&cmd).unwrap();
        assert_eq!(
            json,
            r#"{"type":"drop","target":{"kind":"cell","row":2,"column":1}}"#
        );

        let parsed = decode_command(r#"{"type":"drop","target":{"kind":"outside"}}"#).unwrap();
        assert_eq!(
            parsed,
            IpcCommand::Drop {
                target: DropPoint::Outside
            }
        );
    }

    #[test]
    fn test_drag_start_requires_item() {
        assert!(decode_command(r#"{"type":"drag_start"}"#).is_err());
        assert_eq!(
            decode_command(r#"{"type":"drag_start","item":7}"#).unwrap(),
            IpcCommand::DragStart { item: 7 }
        );
    }

    #[test]
    fn test_response_serialization() {
        let resp = IpcResponse::Ok {
            can_undo: true,
            can_redo: false,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains(r#""status":"ok""#));
        assert!(json.contains(r#""can_undo":true"#));

        let resp2: IpcResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(resp, resp2);
    }

    #[test]
    fn test_grid_state_serialization() {
        let resp = IpcResponse::GridState {
            rows: vec![RowInfo {
                id: 1,
                cells: vec![
                    CellInfo {
                        column: 0,
                        item: Some(ItemInfo {
                            id: 4,
                            label: "100".to_string(),
                            color: "#1a2b3c".to_string(),
                            draggable: true,
                            hidden: false,
                            offset: Some((55.0, 0.0)),
                            transition: Some(9),
                        }),
                    },
                    CellInfo {
                        column: 1,
                        item: None,
                    },
                ],
            }],
            animating: true,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("grid_state"));
        assert!(json.contains(r#""label":"100""#));

        let resp2: IpcResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(resp, resp2);
    }

    #[test]
    fn test_error_response() {
        let resp = IpcResponse::error("Something went wrong");
        if let IpcResponse::Error { message } = resp {
            assert_eq!(message, "Something went wrong");
        } else {
            panic!("Expected Error response");
        }
    }

    #[test]
    fn test_line_delimited_protocol() {
        let cmd = IpcCommand::QueryHistory;
        let wire_format = encode_line(&cmd).unwrap();
        assert!(wire_format.ends_with('\n'));
        assert_eq!(decode_command(&wire_format).unwrap(), cmd);

        let resp = IpcResponse::HistoryState {
            entries: vec![HistoryEntryInfo {
                id: 1,
                kind: "row_insertion".to_string(),
                summary: "row 4".to_string(),
            }],
            cursor: Some(0),
            can_undo: true,
            can_redo: false,
        };
        let wire_format = encode_line(&resp).unwrap();
        let parsed: IpcResponse = serde_json::from_str(wire_format.trim()).unwrap();
        assert_eq!(resp, parsed);
    }

    #[test]
    fn test_invalid_input_handling() {
        assert!(matches!(decode_command("   \n"), Err(ProtocolError::Empty)));
        assert!(matches!(
            decode_command("not valid json"),
            Err(ProtocolError::Malformed(_))
        ));
        assert!(matches!(
            decode_command(r#"{"type": "unknown_command"}"#),
            Err(ProtocolError::Malformed(_))
        ));

        let oversized = format!(r#"{{"type":"undo","pad":"{}"}}"#, "x".repeat(MAX_IPC_MESSAGE_SIZE));
        assert!(matches!(decode_command(&oversized), Err(ProtocolError::TooLarge)));

        let result: Result<IpcResponse, _> = serde_json::from_str(r#"{"status": "invalid"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_default_address_is_loopback() {
        assert!(DEFAULT_ADDRESS.starts_with("127.0.0.1:"));
    }
}
