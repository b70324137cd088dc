//! TCP IPC server.
//!
//! Clients send newline-delimited JSON commands and receive one JSON response
//! line per command. A connection may carry several commands.

use anyhow::Result;
use cellswap_ipc::{decode_command, encode_line, IpcCommand, IpcResponse, MAX_IPC_MESSAGE_SIZE};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn};

use crate::DaemonEvent;

/// IPC read timeout - clients must send within this period.
pub const IPC_READ_TIMEOUT: Duration = Duration::from_secs(5);

const SERIALIZATION_FALLBACK: &str =
    "{\"status\":\"error\",\"message\":\"Internal serialization error\"}\n";

/// Accept clients forever, one task per connection.
pub async fn run_ipc_server(listener: TcpListener, event_tx: mpsc::Sender<DaemonEvent>) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!("Failed to accept client connection: {}", e);
                tokio::time::sleep(Duration::from_millis(100)).await;
                continue;
            }
        };

        debug!("Client connected from {}", peer);

        let event_tx = event_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_client(stream, event_tx).await {
                warn!("Client handler error: {}", e);
            }
        });
    }
}

fn response_line(response: &IpcResponse) -> String {
    match encode_line(response) {
        Ok(json) => json,
        Err(e) => {
            warn!("Failed to serialize IPC response: {}", e);
            SERIALIZATION_FALLBACK.to_string()
        }
    }
}

/// Handle a single client connection.
pub async fn handle_client(stream: TcpStream, event_tx: mpsc::Sender<DaemonEvent>) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    loop {
        let mut line = String::new();
        let limit = MAX_IPC_MESSAGE_SIZE as u64 + 1;

        // Read one command with timeout and size bound
        let read_result =
            tokio::time::timeout(IPC_READ_TIMEOUT, (&mut reader).take(limit).read_line(&mut line)).await;
        let bytes_read = match read_result {
            Ok(Ok(n)) => n,
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                // Timeout: idle client, silently close
                return Ok(());
            }
        };
        if bytes_read == 0 {
            return Ok(()); // Client disconnected
        }

        debug!("Received command: {}", line.trim());

        let cmd = match decode_command(&line) {
            Ok(cmd) => cmd,
            Err(e) => {
                let oversized = line.len() > MAX_IPC_MESSAGE_SIZE;
                writer
                    .write_all(response_line(&IpcResponse::error(e.to_string())).as_bytes())
                    .await?;
                if oversized {
                    // The rest of the line is still unread; drop the connection.
                    return Ok(());
                }
                continue;
            }
        };

        let is_stop = matches!(cmd, IpcCommand::Stop);

        let (resp_tx, resp_rx) = oneshot::channel();
        if event_tx
            .send(DaemonEvent::IpcCommand {
                cmd,
                responder: resp_tx,
            })
            .await
            .is_err()
        {
            let response = IpcResponse::error("Daemon is shutting down");
            writer.write_all(response_line(&response).as_bytes()).await?;
            return Ok(());
        }

        let response = match resp_rx.await {
            Ok(resp) => resp,
            Err(_) => IpcResponse::error("Failed to get response from daemon"),
        };
        writer.write_all(response_line(&response).as_bytes()).await?;

        // If this was a stop command, signal shutdown
        if is_stop {
            let _ = event_tx.send(DaemonEvent::Shutdown).await;
            return Ok(());
        }
    }
}
