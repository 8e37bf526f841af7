//! Request and Reply envelopes.
//!
//! Both travel as UTF-8 JSON in WebSocket text frames.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

use super::{Opcode, Space};

// ============================================================================
// Hex Operands
// ============================================================================

/// Encodes an address or size operand.
///
/// Lower-case hexadecimal without a `0x` prefix, as the server expects.
#[inline]
#[must_use]
pub fn hex(value: impl Into<u64>) -> String {
    format!("{:x}", value.into())
}

// ============================================================================
// Request
// ============================================================================

/// A request from client to server.
///
/// # Format
///
/// ```json
/// {
///   "Opcode": "GetAddress",
///   "Space": "SNES",
///   "Operands": ["f50010", "2"]
/// }
/// ```
///
/// Filesystem opcodes additionally carry `"Flags": null`. Requests without
/// operands omit the `Operands` key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Request {
    /// Operation to perform.
    pub opcode: Opcode,

    /// Target address space.
    pub space: Space,

    /// Opcode flags (only present for filesystem opcodes).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<Value>,

    /// Positional operands.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub operands: Vec<String>,
}

impl Request {
    /// Creates a request in the `SNES` space with no operands.
    ///
    /// Filesystem opcodes get a null `Flags` field.
    #[must_use]
    pub fn new(opcode: Opcode) -> Self {
        Self {
            opcode,
            space: Space::Snes,
            flags: opcode.is_filesystem().then_some(Value::Null),
            operands: Vec::new(),
        }
    }

    /// Sets the address space.
    #[inline]
    #[must_use]
    pub fn space(mut self, space: Space) -> Self {
        self.space = space;
        self
    }

    /// Appends one operand.
    #[inline]
    #[must_use]
    pub fn operand(mut self, operand: impl Into<String>) -> Self {
        self.operands.push(operand.into());
        self
    }

    /// Serializes the request for a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

// ============================================================================
// Reply
// ============================================================================

/// A text reply from server to client.
///
/// # Format
///
/// ```json
/// { "Results": ["SD2SNES COM3"] }
/// ```
///
/// An absent, null, or empty `Results` means "no data".
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Reply {
    /// Result strings.
    #[serde(default)]
    pub results: Option<Vec<String>>,
}

impl Reply {
    /// Parses a reply from a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if the text is not a JSON object.
    pub fn from_text(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Returns `true` if the reply carries no results.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.as_ref().is_none_or(Vec::is_empty)
    }

    /// Returns the result at `index`, if present.
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.results
            .as_ref()
            .and_then(|results| results.get(index))
            .map(String::as_str)
    }

    /// Consumes the reply, returning `None` when it carries no data.
    #[inline]
    #[must_use]
    pub fn into_results(self) -> Option<Vec<String>> {
        self.results.filter(|results| !results.is_empty())
    }
}

// ============================================================================
// Tests
// ============================================================================
