//! Error types for the QUsb2snes client.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use qusb2snes_client::{Client, Result};
//!
//! async fn example(client: &Client) -> Result<()> {
//!     let bytes = client.get_address(0xF50010, 2).await?;
//!     println!("{bytes:02x?}");
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Precondition | [`Error::NotReady`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionClosed`], [`Error::Timeout`] |
//! | Protocol | [`Error::Protocol`], [`Error::ShortRead`] |
//! | Usage | [`Error::InvalidPath`], [`Error::InvalidSize`] |
//! | Device | [`Error::NotFound`], [`Error::OutOfRange`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`] |
//!
//! Transport faults are absorbed by the client before the error reaches
//! the caller: by the time a connection-category error is returned the
//! transport has been closed and the session is
//! [`SessionState::Disconnected`].

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::session::SessionState;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when client configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Precondition Errors
    // ========================================================================
    /// The session is not in the state the operation needs.
    ///
    /// Returned without touching the transport.
    #[error("Not ready: session is {state}, operation requires {required}")]
    NotReady {
        /// State observed when the operation started.
        state: SessionState,
        /// Minimum state the operation requires.
        required: SessionState,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// WebSocket connection failed.
    ///
    /// Returned when the connection cannot be established or a send fails.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Connection closed while an exchange was in flight.
    #[error("Connection closed")]
    ConnectionClosed,

    /// No reply arrived within the reply timeout.
    #[error("Timeout after {timeout_ms}ms: {operation}")]
    Timeout {
        /// Description of the operation that timed out.
        operation: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Protocol violation or unexpected reply.
    ///
    /// Returned when a reply is missing, empty, or of the wrong frame type.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// Fewer (or more) bytes arrived than were requested.
    #[error("Short read at {address:#x}: requested {requested} bytes, received {received}")]
    ShortRead {
        /// Address (or zero for file reads) of the failed read.
        address: u32,
        /// Bytes requested.
        requested: usize,
        /// Bytes actually received before the read gave up.
        received: usize,
    },

    // ========================================================================
    // Usage Errors
    // ========================================================================
    /// Malformed device path argument.
    ///
    /// Raised before any network interaction.
    #[error("Invalid path \"{path}\": {reason}")]
    InvalidPath {
        /// The rejected path.
        path: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Read size larger than the console address space.
    ///
    /// Raised before any network interaction.
    #[error("Invalid read size {size}: at most {max} bytes can be read")]
    InvalidSize {
        /// The rejected size.
        size: usize,
        /// Largest accepted size.
        max: usize,
    },

    // ========================================================================
    // Device Errors
    // ========================================================================
    /// Path does not exist on the device.
    #[error("Not found on device: {path}")]
    NotFound {
        /// The missing path.
        path: String,
    },

    /// Write falls outside the SD2SNES working-RAM window.
    ///
    /// The whole batch is rejected, nothing is sent.
    #[error("Write out of range: {address:#x} ({len} bytes)")]
    OutOfRange {
        /// Start address of the rejected write.
        address: u32,
        /// Length of the rejected write.
        len: usize,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a not-ready error.
    #[inline]
    pub fn not_ready(state: SessionState, required: SessionState) -> Self {
        Self::NotReady { state, required }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a timeout error.
    #[inline]
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates an invalid path error.
    #[inline]
    pub fn invalid_path(path: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason,
        }
    }

    /// Creates a not found error.
    #[inline]
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns `true` if this error tore down (or found torn down) the
    /// connection.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionClosed
                | Self::Timeout { .. }
                | Self::ShortRead { .. }
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if the caller passed a malformed argument.
    #[inline]
    #[must_use]
    pub fn is_usage_error(&self) -> bool {
        matches!(self, Self::InvalidPath { .. } | Self::InvalidSize { .. })
    }

    /// Returns `true` if a device path was missing.
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if this is a session precondition failure.
    #[inline]
    #[must_use]
    pub fn is_not_ready(&self) -> bool {
        matches!(self, Self::NotReady { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================
