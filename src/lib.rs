//! QUsb2snes client - async access to SNES consoles and emulators.
//!
//! This library talks to a [QUsb2snes] server over WebSocket and exposes
//! its opcodes as a typed async API: device discovery and attachment,
//! console memory reads and writes, SD card file management, and console
//! control.
//!
//! # Architecture
//!
//! ```text
//! caller ──► Client ──request lock──► FrameSink ──► QUsb2snes
//!                ▲                                      │
//!                └── InboundQueue ◄── receive loop ◄────┘
//! ```
//!
//! - One connection per [`Client`]; clones share it
//! - One opcode exchange in flight at a time; replies are matched by order
//! - A background receive loop feeds every inbound frame to a queue
//! - Any transport fault resets the session to
//!   [`SessionState::Disconnected`] and replaces the queue
//!
//! # Quick Start
//!
//! ```no_run
//! use qusb2snes_client::{Client, Result, WriteOp};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = Client::builder().url("ws://localhost:8080").build()?;
//!     client.connect().await?;
//!
//!     let devices = client.device_list().await?;
//!     client.attach(&devices[0]).await?;
//!
//!     // Read two bytes of work RAM, then write them back incremented.
//!     let bytes = client.get_address(0xF50010, 2).await?;
//!     let next: Vec<u8> = bytes.iter().map(|b| b.wrapping_add(1)).collect();
//!     client.put_address(&[WriteOp::new(0xF50010, next)]).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`Client`], its builder and opcodes |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`protocol`] | Request/Reply envelopes and address constants |
//! | [`sd2snes`] | SD2SNES write compiler |
//! | [`session`] | Session state and inbound queue |
//! | [`transport`] | Transport traits and WebSocket connector |
//!
//! [QUsb2snes]: https://github.com/Skarsnik/QUsb2snes

// ============================================================================
// Modules
// ============================================================================

/// Client handle, configuration, and opcodes.
///
/// Use [`Client::builder()`] to create a configured client.
pub mod client;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// QUsb2snes wire protocol types.
pub mod protocol;

/// SD2SNES write compiler.
pub mod sd2snes;

/// Session state machine and inbound queue.
pub mod session;

/// Transport layer.
///
/// [`Connector`] is the seam for custom transports.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{Client, ClientBuilder, ClientConfig, TransferReport};

// Error types
pub use error::{Error, Result};

// Protocol types
pub use protocol::{
    DeviceInfo, DirEntry, EntryType, ROM_START, SRAM_START, WRAM_SIZE, WRAM_START, WriteOp,
};

// Session types
pub use session::{DeviceKind, SessionState};

// Transport types
pub use transport::{Connector, Frame, FrameSink, FrameStream, WsConnector};
