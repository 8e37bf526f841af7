//! QUsb2snes client.
//!
//! [`Client`] owns one connection to a QUsb2snes server and exposes the
//! protocol opcodes as async methods.
//!
//! # Session
//!
//! ```text
//! Disconnected ──connect──► Connecting ──► Connected ──attach──► Attached
//!       ▲                        │              │                   │
//!       └──────── any transport fault, reply failure, disconnect ───┘
//! ```
//!
//! `device_list` needs at least `Connected`; every device-addressed opcode
//! needs exactly `Attached`. A call in the wrong state returns
//! [`Error::NotReady`](crate::Error::NotReady) without sending anything.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `builder` | [`ClientBuilder`] and [`ClientConfig`] |
//! | `core` | Connection lifecycle and exchange plumbing |
//! | `device` | DeviceList, Attach, Info, Name, Boot, Menu, Reset |
//! | `memory` | GetAddress, PutAddress |
//! | `files` | List, MakeDir, Remove, Rename, PutFile, GetFile |

// ============================================================================
// Submodules
// ============================================================================

/// Client configuration.
pub mod builder;

mod core;
mod device;
mod files;
mod memory;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::{
    ClientBuilder, ClientConfig, DEFAULT_CHUNK_SIZE, DEFAULT_LARGE_TRANSFER_THRESHOLD,
    DEFAULT_REPLY_TIMEOUT, DEFAULT_SETTLE_DELAY, DEFAULT_URL,
};
pub use core::Client;
pub use files::TransferReport;
pub use memory::MAX_READ_SIZE;
