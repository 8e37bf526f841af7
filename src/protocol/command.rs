//! Opcode and address space definitions.
//!
//! # Opcodes
//!
//! | Group | Opcodes | Reply |
//! |-------|---------|-------|
//! | Connection | `DeviceList`, `Attach`, `Info`, `Name` | `DeviceList`, `Info` |
//! | Control | `Boot`, `Menu`, `Reset` | none |
//! | Memory | `GetAddress`, `PutAddress` | binary for `GetAddress` |
//! | Filesystem | `List`, `MakeDir`, `Remove`, `Rename`, `PutFile`, `GetFile` | `List`, `GetFile` |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Opcode
// ============================================================================

/// Protocol opcodes understood by the QUsb2snes server.
///
/// Serialized as the bare variant name (`"GetAddress"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    /// List devices known to the server.
    DeviceList,
    /// Attach this connection to a device.
    Attach,
    /// Query firmware and running ROM.
    Info,
    /// Register a client name.
    Name,
    /// Boot a ROM file stored on the device.
    Boot,
    /// Return to the device menu.
    Menu,
    /// Reset the console.
    Reset,
    /// Read console memory.
    GetAddress,
    /// Write console memory.
    PutAddress,
    /// List a directory.
    List,
    /// Create a directory.
    MakeDir,
    /// Remove a file or directory.
    Remove,
    /// Rename a file or directory.
    Rename,
    /// Upload a file.
    PutFile,
    /// Download a file.
    GetFile,
}

impl Opcode {
    /// Returns `true` for filesystem opcodes, which carry a `Flags` field.
    #[inline]
    #[must_use]
    pub const fn is_filesystem(self) -> bool {
        matches!(
            self,
            Self::List | Self::MakeDir | Self::Remove | Self::Rename | Self::PutFile | Self::GetFile
        )
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// ============================================================================
// Space
// ============================================================================

/// Address space a request targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Space {
    /// Console address space (memory and filesystem opcodes).
    #[default]
    #[serde(rename = "SNES")]
    Snes,
    /// SD2SNES command space, used to run compiled code on the console.
    #[serde(rename = "CMD")]
    Cmd,
}

// ============================================================================
// Tests
// ============================================================================
