//! Cellswap CLI
//!
//! Command-line interface for driving a cellswap daemon.
//!
//! Commands are sent to the daemon as JSON lines over TCP.

use anyhow::{bail, Context, Result};
use cellswap_ipc::{encode_line, DropPoint, IpcCommand, IpcResponse, DEFAULT_ADDRESS};
use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

#[derive(Parser)]
#[command(name = "cellswap-cli")]
#[command(author, version, about = "Drive a cellswap daemon")]
struct Cli {
    /// Daemon address
    #[arg(long, global = true, default_value = DEFAULT_ADDRESS)]
    address: String,

    /// Print raw JSON responses
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Drag an item and drop it somewhere
    Drag {
        /// ID of the item to drag
        item: u64,
        #[command(flatten)]
        target: TargetArgs,
        /// Wait for the transitions to land
        #[arg(short, long)]
        wait: bool,
    },
    /// Undo the last operation
    Undo,
    /// Redo the last undone operation
    Redo,
    /// Append a row of new items
    AddRow,
    /// Query daemon state
    Query {
        #[command(subcommand)]
        what: QueryType,
    },
    /// Block until no transition is running
    Wait,
    /// Reload daemon configuration
    Reload,
    /// Stop the daemon
    Stop,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct TargetArgs {
    /// Drop onto a cell, given as row ID and column
    #[arg(long, num_args = 2, value_names = ["ROW", "COLUMN"])]
    cell: Option<Vec<u64>>,
    /// Drop onto the cell holding this item
    #[arg(long = "item", value_name = "ID")]
    onto: Option<u64>,
    /// Drop outside the grid
    #[arg(long)]
    outside: bool,
}

impl TargetArgs {
    fn drop_point(&self) -> Result<DropPoint> {
        if let Some(cell) = &self.cell {
            let [row, column] = cell.as_slice() else {
                bail!("--cell takes a row ID and a column");
            };
            return Ok(DropPoint::Cell {
                row: *row,
                column: *column as usize,
            });
        }
        if let Some(item) = self.onto {
            return Ok(DropPoint::Item { item });
        }
        Ok(DropPoint::Outside)
    }
}

#[derive(Subcommand)]
enum QueryType {
    /// Rows, cells and items
    Grid,
    /// Recorded operations and the cursor
    History,
}

/// One connection to the daemon.
struct Connection {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl Connection {
    async fn open(address: &str) -> Result<Self> {
        let stream = TcpStream::connect(address)
            .await
            .with_context(|| format!("Failed to connect to daemon at {} (is it running?)", address))?;
        let (reader, writer) = stream.into_split();
        Ok(Self {
            lines: BufReader::new(reader).lines(),
            writer,
        })
    }

    async fn send(&mut self, cmd: &IpcCommand) -> Result<IpcResponse> {
        let line = encode_line(cmd).context("Failed to serialize command")?;
        self.writer.write_all(line.as_bytes()).await?;

        let reply = self
            .lines
            .next_line()
            .await?
            .context("Daemon closed the connection")?;
        serde_json::from_str(&reply).with_context(|| format!("Invalid response: {}", reply))
    }
}

fn print_response(response: &IpcResponse, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(response)?);
        return Ok(());
    }

    match response {
        IpcResponse::Ok { can_undo, can_redo } | IpcResponse::Settled { can_undo, can_redo } => {
            println!("ok (undo: {}, redo: {})", can_undo, can_redo);
        }
        IpcResponse::Ignored { reason, .. } => println!("ignored: {}", reason),
        IpcResponse::Error { message } => bail!("{}", message),
        IpcResponse::GridState { rows, animating } => {
            for row in rows {
                let cells: Vec<String> = row
                    .cells
                    .iter()
                    .map(|c| match &c.item {
                        Some(item) => format!("{}:{}", item.id, item.label),
                        None => "-".to_string(),
                    })
                    .collect();
                println!("row {:>3} | {}", row.id, cells.join("  "));
            }
            if *animating {
                println!("(transitions running)");
            }
        }
        IpcResponse::HistoryState {
            entries, cursor, ..
        } => {
            if entries.is_empty() {
                println!("(empty)");
            }
            for (index, entry) in entries.iter().enumerate() {
                let marker = if Some(index) == *cursor { ">" } else { " " };
                println!("{} {:>3} {:<14} {}", marker, entry.id, entry.kind, entry.summary);
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut conn = Connection::open(&cli.address).await?;

    let response = match cli.command {
        Commands::Drag { item, target, wait } => {
            let target = target.drop_point()?;
            let started = conn.send(&IpcCommand::DragStart { item }).await?;
            if !matches!(started, IpcResponse::Ok { .. }) {
                started
            } else {
                let dropped = conn.send(&IpcCommand::Drop { target }).await?;
                conn.send(&IpcCommand::DragEnd).await?;
                if wait && matches!(dropped, IpcResponse::Ok { .. }) {
                    conn.send(&IpcCommand::WaitSettled).await?
                } else {
                    dropped
                }
            }
        }
        Commands::Undo => conn.send(&IpcCommand::Undo).await?,
        Commands::Redo => conn.send(&IpcCommand::Redo).await?,
        Commands::AddRow => conn.send(&IpcCommand::AddRow).await?,
        Commands::Query { what } => {
            let cmd = match what {
                QueryType::Grid => IpcCommand::QueryGrid,
                QueryType::History => IpcCommand::QueryHistory,
            };
            conn.send(&cmd).await?
        }
        Commands::Wait => conn.send(&IpcCommand::WaitSettled).await?,
        Commands::Reload => conn.send(&IpcCommand::Reload).await?,
        Commands::Stop => conn.send(&IpcCommand::Stop).await?,
    };

    print_response(&response, cli.json)
}
