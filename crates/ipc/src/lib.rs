//! Showreel IPC Protocol
//!
//! Shared types for daemon-CLI communication over a loopback TCP socket.
//! Each connection carries one newline-terminated JSON command and gets one
//! newline-terminated JSON response back.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Loopback address the daemon listens on.
pub const IPC_ADDR: &str = "127.0.0.1:47615";

/// Upper bound on a single IPC message, newline included.
pub const MAX_IPC_MESSAGE_SIZE: usize = 64 * 1024;

/// Errors while framing or parsing a protocol line.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Empty message")]
    Empty,

    #[error("Message of {0} bytes exceeds the {max} byte limit", max = MAX_IPC_MESSAGE_SIZE)]
    TooLarge(usize),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serialize a message as one protocol line, trailing newline included.
pub fn encode_line<T: Serialize>(message: &T) -> Result<String, ProtocolError> {
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    if line.len() > MAX_IPC_MESSAGE_SIZE {
        return Err(ProtocolError::TooLarge(line.len()));
    }
    Ok(line)
}

/// Parse one protocol line. Surrounding whitespace is ignored.
pub fn decode_line<T: DeserializeOwned>(line: &str) -> Result<T, ProtocolError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(ProtocolError::Empty);
    }
    if line.len() > MAX_IPC_MESSAGE_SIZE {
        return Err(ProtocolError::TooLarge(line.len()));
    }
    Ok(serde_json::from_str(line)?)
}

/// Commands that can be sent from the CLI to the daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IpcCommand {
    /// Wheel input over the arc section.
    Wheel {
        /// Vertical wheel delta in pixels.
        delta_y: f64,
        /// Top edge of the arc section relative to the viewport.
        section_top: f64,
        /// Height of the arc section.
        section_height: f64,
    },

    /// Pointer entered a marquee track item.
    PointerEnter { item: usize },
    /// Pointer left a marquee track item.
    PointerLeave { item: usize },
    /// Pointer pressed on a marquee track item.
    PointerDown { item: usize },
    /// Pointer interaction cancelled on a marquee track item.
    PointerCancel { item: usize },
    /// A marquee track item lost focus.
    Blur { item: usize },

    /// The host viewport changed size.
    Resize { width: f64, height: f64 },

    /// Activate an arc card, opening its overlay.
    Activate { index: usize },

    /// Query the current arc layout.
    QueryArc,
    /// Query the marquee position, pagination and playback.
    QueryMarquee,
    /// Query daemon status.
    QueryStatus,

    /// Reload configuration from file and rebuild both widgets.
    Reload,
    /// Stop the daemon.
    Stop,
}

/// One card transform as sent over the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpcCardTransform {
    pub index: usize,
    pub x: f64,
    pub y: f64,
    pub rotation_deg: f64,
    pub scale: f64,
    pub z_index: i32,
    pub brightness: f64,
    pub depth: f64,
}

/// Responses from the daemon to the CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IpcResponse {
    /// Command executed successfully.
    Ok,
    /// Command failed with an error.
    Error {
        /// Error message describing what went wrong.
        message: String,
    },
    /// Outcome of a wheel command.
    Wheel {
        /// Whether the visibility gate let the delta through.
        accepted: bool,
        /// Smoother target after the command.
        target_offset: f64,
    },
    /// Arc layout query response.
    ArcState {
        /// Current (smoothed) offset.
        offset: f64,
        target_offset: f64,
        /// Whether the wide geometry is active.
        wide: bool,
        step: f64,
        cards: Vec<IpcCardTransform>,
    },
    /// Marquee query response.
    MarqueeState {
        /// Scroll position within the base set.
        position: f64,
        base_width: f64,
        /// Rendered items, clones included.
        track_items: usize,
        paused: bool,
        active_index: usize,
        dots: Vec<bool>,
        /// Items carrying the playing marker.
        playing: Vec<usize>,
        hovered: Vec<usize>,
    },
    /// Daemon status query response.
    Status {
        version: String,
        uptime_seconds: u64,
        viewport_width: f64,
        viewport_height: f64,
        reduced_motion: bool,
        arc_cards: usize,
        marquee_items: usize,
    },
    /// Overlay to open after a card activation.
    Overlay {
        title: String,
        text: String,
        image: Option<String>,
    },
}

impl IpcResponse {
    /// Create an error response.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}
