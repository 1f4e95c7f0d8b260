//! Showreel CLI
//!
//! Command-line interface for controlling the showreel daemon.
//!
//! Each invocation sends one command over the loopback IPC socket and prints
//! the daemon's response as pretty JSON.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use showreel_ipc::{decode_line, encode_line, IpcCommand, IpcResponse, IPC_ADDR};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

#[derive(Parser)]
#[command(name = "showreel-cli")]
#[command(author, version, about = "Control the showreel daemon")]
struct Cli {
    /// Daemon IPC address
    #[arg(long, global = true, default_value = IPC_ADDR)]
    addr: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send wheel input to the arc carousel
    Wheel {
        /// Vertical delta in pixels (negative scrolls the other way)
        #[arg(short, long, allow_hyphen_values = true)]
        delta: f64,
        /// Top edge of the arc section relative to the viewport
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        top: f64,
        /// Height of the arc section
        #[arg(long, default_value = "520")]
        height: f64,
    },
    /// Pointer events on marquee track items
    Pointer {
        #[command(subcommand)]
        event: PointerEvent,
    },
    /// Blur a marquee track item
    Blur {
        /// Track item id (clones included)
        item: usize,
    },
    /// Resize the host viewport
    Resize {
        #[arg(short = 'W', long)]
        width: f64,
        #[arg(short = 'H', long)]
        height: f64,
    },
    /// Activate an arc card and print its overlay
    Activate {
        /// Card index
        index: usize,
    },
    /// Query widget state
    Query {
        #[command(subcommand)]
        what: QueryType,
    },
    /// Reload configuration
    Reload,
    /// Stop the daemon
    Stop,
}

#[derive(Subcommand)]
enum PointerEvent {
    /// Pointer entered an item
    Enter { item: usize },
    /// Pointer left an item
    Leave { item: usize },
    /// Pointer pressed on an item
    Down { item: usize },
    /// Pointer interaction cancelled
    Cancel { item: usize },
}

#[derive(Subcommand)]
enum QueryType {
    /// Current arc layout
    Arc,
    /// Marquee position, pagination and playback
    Marquee,
    /// Daemon status
    Status,
}

impl From<Commands> for IpcCommand {
    fn from(command: Commands) -> Self {
        match command {
            Commands::Wheel { delta, top, height } => IpcCommand::Wheel {
                delta_y: delta,
                section_top: top,
                section_height: height,
            },
            Commands::Pointer { event } => match event {
                PointerEvent::Enter { item } => IpcCommand::PointerEnter { item },
                PointerEvent::Leave { item } => IpcCommand::PointerLeave { item },
                PointerEvent::Down { item } => IpcCommand::PointerDown { item },
                PointerEvent::Cancel { item } => IpcCommand::PointerCancel { item },
            },
            Commands::Blur { item } => IpcCommand::Blur { item },
            Commands::Resize { width, height } => IpcCommand::Resize { width, height },
            Commands::Activate { index } => IpcCommand::Activate { index },
            Commands::Query { what } => match what {
                QueryType::Arc => IpcCommand::QueryArc,
                QueryType::Marquee => IpcCommand::QueryMarquee,
                QueryType::Status => IpcCommand::QueryStatus,
            },
            Commands::Reload => IpcCommand::Reload,
            Commands::Stop => IpcCommand::Stop,
        }
    }
}

/// Send one command to the daemon and wait for its response.
async fn send_command(addr: &str, cmd: &IpcCommand) -> Result<IpcResponse> {
    let stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("Failed to connect to daemon at {}. Is showreel running?", addr))?;
    let (reader, mut writer) = stream.into_split();

    let line = encode_line(cmd).context("Failed to encode command")?;
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;

    let mut reader = BufReader::new(reader);
    let mut response = String::new();
    reader
        .read_line(&mut response)
        .await
        .context("Failed to read response from daemon")?;

    decode_line(&response).context("Daemon sent an invalid response")
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cmd = IpcCommand::from(cli.command);

    let response = send_command(&cli.addr, &cmd).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);

    if response.is_error() {
        std::process::exit(1);
    }
    Ok(())
}
