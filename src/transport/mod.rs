//! Transport layer.
//!
//! This module abstracts the duplex message stream between the client and
//! the QUsb2snes server.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Client (Rust)  │                              │  QUsb2snes      │
//! │                 │         WebSocket            │                 │
//! │  FrameSink   ───┼─────────────────────────────►│  Device bridge  │
//! │  FrameStream ◄──┼──────────────────────────────│                 │
//! └─────────────────┘      ws://localhost:8080     └─────────────────┘
//! ```
//!
//! A [`Connector`] opens a connection and hands back its two halves. The
//! sink is owned by the session; the stream is drained by the receive loop.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | WebSocket connector built on `tokio-tungstenite` |

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;

use crate::error::Result;

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket connector.
pub mod connection;

#[cfg(test)]
pub(crate) mod mock;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::WsConnector;

// ============================================================================
// Frame
// ============================================================================

/// One transport message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// UTF-8 text frame carrying a JSON envelope.
    Text(String),
    /// Raw binary payload.
    Binary(Vec<u8>),
}

impl Frame {
    /// Returns the payload length in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Binary(data) => data.len(),
        }
    }

    /// Returns `true` if the payload is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Sending half of a connection.
#[async_trait]
pub trait FrameSink: Send {
    /// Sends one frame.
    async fn send(&mut self, frame: Frame) -> Result<()>;

    /// Closes the connection. Closing twice is not an error.
    async fn close(&mut self) -> Result<()>;

    /// Returns `true` once the connection is known to be closed.
    fn is_closed(&self) -> bool;
}

/// Receiving half of a connection.
#[async_trait]
pub trait FrameStream: Send {
    /// Awaits the next data frame.
    ///
    /// Returns `None` when the peer closed the connection cleanly.
    async fn next_frame(&mut self) -> Option<Result<Frame>>;
}

/// Factory for connections.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Opens a connection to `url`.
    async fn connect(&self, url: &str) -> Result<(Box<dyn FrameSink>, Box<dyn FrameStream>)>;
}

// ============================================================================
// Tests
// ============================================================================
