//! QUsb2snes wire protocol types.
//!
//! This module defines the JSON envelopes exchanged with the QUsb2snes
//! server and the constants describing the console address space.
//!
//! # Protocol Overview
//!
//! | Message Type | Frame | Direction | Purpose |
//! |--------------|-------|-----------|---------|
//! | [`Request`] | text | Client → Server | Opcode with operands |
//! | [`Reply`] | text | Server → Client | `Results` string list |
//! | payload | binary | both | memory data, file chunks, compiled commands |
//!
//! Binary payloads carry no framing of their own; message boundaries are
//! the WebSocket frame boundaries.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `command` | Opcode and address space enums |
//! | `request` | Request and Reply envelopes |
//! | `types` | Address constants and decoded reply types |

// ============================================================================
// Submodules
// ============================================================================

/// Opcode and address space definitions.
pub mod command;

/// Request and Reply envelopes.
pub mod request;

/// Address space constants and decoded reply types.
pub mod types;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::{Opcode, Space};
pub use request::{Reply, Request, hex};
pub use types::{
    DeviceInfo, DirEntry, EntryType, ROM_START, SRAM_START, WRAM_SIZE, WRAM_START, WriteOp,
};
