//! Cellswap Daemon
//!
//! Host process that owns a single board and exposes it over IPC.
//!
//! Responsibilities:
//! - Seed the grid and keep its state
//! - Handle IPC commands from the CLI or a renderer
//! - Drive transitions with a tick timer while anything is in flight

pub mod app;
pub mod config;
pub mod event_loop;
pub mod server;

use cellswap_ipc::{IpcCommand, IpcResponse};
use tokio::sync::oneshot;

/// Events that the daemon event loop processes.
pub enum DaemonEvent {
    /// An IPC command from a client.
    IpcCommand {
        cmd: IpcCommand,
        responder: oneshot::Sender<IpcResponse>,
    },
    /// Animation tick, sent only while transitions are running.
    AnimationTick,
    /// Hide the source of the drag started one tick earlier.
    FlushDeferred { item: u64 },
    /// Shutdown signal.
    Shutdown,
}
