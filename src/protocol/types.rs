//! Address space constants and decoded reply types.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use super::Reply;

// ============================================================================
// Address Space
// ============================================================================

/// Start of cartridge ROM in the QUsb2snes address space.
pub const ROM_START: u32 = 0x000000;

/// Start of console work RAM in the QUsb2snes address space.
pub const WRAM_START: u32 = 0xF50000;

/// Size of console work RAM.
pub const WRAM_SIZE: u32 = 0x20000;

/// Start of cartridge save RAM in the QUsb2snes address space.
pub const SRAM_START: u32 = 0xE00000;

// ============================================================================
// WriteOp
// ============================================================================

/// One memory write: `data` stored starting at `address`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOp {
    /// Console-relative 24-bit start address.
    pub address: u32,
    /// Bytes to store.
    pub data: Vec<u8>,
}

impl WriteOp {
    /// Creates a write.
    #[inline]
    #[must_use]
    pub fn new(address: u32, data: impl Into<Vec<u8>>) -> Self {
        Self {
            address,
            data: data.into(),
        }
    }

    /// Returns the first address past the written range.
    #[inline]
    #[must_use]
    pub fn end(&self) -> u64 {
        u64::from(self.address) + self.data.len() as u64
    }
}

impl<D: Into<Vec<u8>>> From<(u32, D)> for WriteOp {
    fn from((address, data): (u32, D)) -> Self {
        Self::new(address, data)
    }
}

// ============================================================================
// DeviceInfo
// ============================================================================

/// Decoded `Info` reply.
///
/// Positions missing from the reply are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Firmware version.
    pub firmware_version: Option<String>,
    /// Device version string.
    pub version_string: Option<String>,
    /// ROM currently running.
    pub rom_running: Option<String>,
    /// First device flag.
    pub flag1: Option<String>,
    /// Second device flag.
    pub flag2: Option<String>,
}

impl From<&Reply> for DeviceInfo {
    fn from(reply: &Reply) -> Self {
        let at = |index| reply.get(index).map(str::to_string);
        Self {
            firmware_version: at(0),
            version_string: at(1),
            rom_running: at(2),
            flag1: at(3),
            flag2: at(4),
        }
    }
}

// ============================================================================
// DirEntry
// ============================================================================

/// Kind of a directory entry, as reported by `List`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntryType {
    /// Entry type `"0"`.
    Directory,
    /// Entry type `"1"`.
    File,
    /// Any other code the server sent.
    Other(String),
}

impl EntryType {
    /// Decodes the protocol entry type code.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code {
            "0" => Self::Directory,
            "1" => Self::File,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Directory => f.write_str("0"),
            Self::File => f.write_str("1"),
            Self::Other(code) => f.write_str(code),
        }
    }
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Entry kind.
    pub entry_type: EntryType,
    /// File or directory name.
    pub name: String,
}

impl DirEntry {
    /// Returns `true` for directories.
    #[inline]
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.entry_type == EntryType::Directory
    }

    /// Returns `true` for regular files.
    #[inline]
    #[must_use]
    pub fn is_file(&self) -> bool {
        self.entry_type == EntryType::File
    }

    /// Decodes the flat `[type, name, type, name, ...]` results of a `List`
    /// reply, dropping the `.` and `..` pseudo-entries.
    ///
    /// A trailing unpaired value is ignored.
    #[must_use]
    pub fn from_results(results: &[String]) -> Vec<Self> {
        results
            .chunks_exact(2)
            .filter(|pair| pair[1] != "." && pair[1] != "..")
            .map(|pair| Self {
                entry_type: EntryType::from_code(&pair[0]),
                name: pair[1].clone(),
            })
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
