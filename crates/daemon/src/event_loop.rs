//! The daemon's single event loop.

use cellswap_ipc::{IpcCommand, IpcResponse};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::app::AppState;
use crate::DaemonEvent;

/// Spawn the tick timer; it stops by itself once `animation_running` is cleared.
fn start_animation_timer(
    animation_tx: mpsc::Sender<DaemonEvent>,
    animation_running: Arc<AtomicBool>,
    tick_ms: u64,
) -> JoinHandle<()> {
    animation_running.store(true, Ordering::SeqCst);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(tick_ms));
        loop {
            interval.tick().await;
            if !animation_running.load(Ordering::SeqCst) {
                break;
            }
            if animation_tx.send(DaemonEvent::AnimationTick).await.is_err() {
                break; // Channel closed
            }
        }
    })
}

/// Process events until shutdown or until every sender is gone.
pub async fn run_event_loop(
    state: Arc<Mutex<AppState>>,
    event_tx: mpsc::Sender<DaemonEvent>,
    mut event_rx: mpsc::Receiver<DaemonEvent>,
) {
    let mut tick_ms = state.lock().await.config.animation.tick_ms;

    // Animation timer handle - spawned/cancelled as transitions start and finish
    let mut animation_timer_handle: Option<JoinHandle<()>> = None;
    let animation_running = Arc::new(AtomicBool::new(false));

    while let Some(event) = event_rx.recv().await {
        match event {
            DaemonEvent::IpcCommand {
                cmd: IpcCommand::WaitSettled,
                responder,
            } => {
                let waiter = state.lock().await.board.settled();
                tokio::spawn(async move {
                    let response = match waiter.await {
                        Ok(affordances) => IpcResponse::Settled {
                            can_undo: affordances.can_undo,
                            can_redo: affordances.can_redo,
                        },
                        Err(_) => IpcResponse::error("Daemon is shutting down"),
                    };
                    if responder.send(response).is_err() {
                        debug!("Client disconnected before transitions settled");
                    }
                });
            }
            DaemonEvent::IpcCommand { cmd, responder } => {
                let drag_item = match &cmd {
                    IpcCommand::DragStart { item } => Some(*item),
                    _ => None,
                };
                let is_reload = matches!(cmd, IpcCommand::Reload);

                let (response, should_animate) = {
                    let mut state = state.lock().await;
                    let response = state.handle_command(cmd);
                    if is_reload && matches!(response, IpcResponse::Ok { .. }) {
                        tick_ms = state.config.animation.tick_ms;
                    }
                    (response, state.is_animating())
                };

                if responder.send(response).is_err() {
                    debug!("Client disconnected before receiving IPC response");
                }

                // Hiding the drag source waits one tick
                if let Some(item) = drag_item {
                    let flush_tx = event_tx.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(Duration::from_millis(tick_ms)).await;
                        let _ = flush_tx.send(DaemonEvent::FlushDeferred { item }).await;
                    });
                }

                // A running timer keeps its old period; restart it at the reloaded tick
                if is_reload && animation_running.load(Ordering::SeqCst) {
                    if let Some(handle) = animation_timer_handle.take() {
                        handle.abort();
                    }
                    animation_running.store(false, Ordering::SeqCst);
                }

                if should_animate && !animation_running.load(Ordering::SeqCst) {
                    animation_timer_handle = Some(start_animation_timer(
                        event_tx.clone(),
                        animation_running.clone(),
                        tick_ms,
                    ));
                }
            }
            DaemonEvent::AnimationTick => {
                let still_animating = state.lock().await.tick_animations(tick_ms);

                // Stop animation timer if all transitions landed
                if !still_animating {
                    animation_running.store(false, Ordering::SeqCst);
                    if let Some(handle) = animation_timer_handle.take() {
                        handle.abort();
                    }
                    debug!("All transitions complete");
                }
            }
            DaemonEvent::FlushDeferred { item } => {
                if state.lock().await.flush_deferred(item) {
                    debug!("Drag source {} hidden", item);
                }
            }
            DaemonEvent::Shutdown => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    if let Some(handle) = animation_timer_handle.take() {
        handle.abort();
    }
}
