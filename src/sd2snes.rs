//! SD2SNES write compiler.
//!
//! SD2SNES firmware cannot write console work RAM directly. Instead the
//! client uploads a short 65816 routine into the in-console exec buffer
//! and the firmware runs it during the next NMI:
//!
//! ```text
//! preamble   00 E2 20 48 EB 48           mode setup, save A and B
//! per byte   A9 vv                       LDA #vv
//!            8F ll mm hh                 STA.l $hhmmll
//! epilogue   A9 00 8F 00 2C 00           clear the exec flag
//!            68 EB 68 28                 restore B, A and P
//!            6C EA FF                    JMP ($FFEA)
//!            08
//! ```
//!
//! Target addresses are translated from the QUsb2snes WRAM window
//! (`$F50000`) to the console's own WRAM bank (`$7E0000`).

// ============================================================================
// Imports
// ============================================================================

use tracing::warn;

use crate::error::{Error, Result};
use crate::protocol::{Opcode, Request, Space, WRAM_SIZE, WRAM_START, WriteOp, hex};

// ============================================================================
// Constants
// ============================================================================

/// Address of the in-console exec buffer the routine is uploaded to.
pub const EXEC_BUFFER: u32 = 0x2C00;

/// Console WRAM bank base.
const CONSOLE_WRAM: u32 = 0x7E0000;

const PREAMBLE: [u8; 6] = [0x00, 0xE2, 0x20, 0x48, 0xEB, 0x48];

const EPILOGUE: [u8; 14] = [
    0xA9, 0x00, 0x8F, 0x00, 0x2C, 0x00, 0x68, 0xEB, 0x68, 0x28, 0x6C, 0xEA, 0xFF, 0x08,
];

const LDA_IMMEDIATE: u8 = 0xA9;
const STA_LONG: u8 = 0x8F;

/// Encoded size of one written byte.
const BYTES_PER_WRITE: usize = 6;

// ============================================================================
// Compiler
// ============================================================================

/// Checks that every write lies inside the WRAM window.
///
/// # Errors
///
/// [`Error::OutOfRange`] for the first write that does not.
pub fn validate(writes: &[WriteOp]) -> Result<()> {
    let window_end = u64::from(WRAM_START) + u64::from(WRAM_SIZE);

    for write in writes {
        if write.address < WRAM_START || write.end() > window_end {
            warn!(
                address = write.address,
                len = write.data.len(),
                "SD2SNES write out of range"
            );
            return Err(Error::OutOfRange {
                address: write.address,
                len: write.data.len(),
            });
        }
    }
    Ok(())
}

/// Translates a WRAM window address to the console address it maps to.
///
/// `address` must lie inside the WRAM window; callers run [`validate`]
/// first. Addresses outside it wrap instead of panicking.
#[inline]
#[must_use]
pub(crate) const fn translate(address: u32) -> u32 {
    address.wrapping_sub(WRAM_START).wrapping_add(CONSOLE_WRAM)
}

/// Compiles a write batch into one executable routine.
///
/// Nothing is compiled unless the whole batch passes [`validate`].
///
/// # Errors
///
/// [`Error::OutOfRange`] if any write leaves the WRAM window.
pub fn compile(writes: &[WriteOp]) -> Result<Vec<u8>> {
    validate(writes)?;

    let total: usize = writes.iter().map(|w| w.data.len()).sum();
    let mut code = Vec::with_capacity(PREAMBLE.len() + total * BYTES_PER_WRITE + EPILOGUE.len());
    code.extend_from_slice(&PREAMBLE);

    for write in writes {
        let base = translate(write.address);
        for (offset, &value) in (0u32..).zip(&write.data) {
            let [lo, mid, hi, _] = (base + offset).to_le_bytes();
            code.extend_from_slice(&[LDA_IMMEDIATE, value, STA_LONG, lo, mid, hi]);
        }
    }

    code.extend_from_slice(&EPILOGUE);
    Ok(code)
}

/// Builds the `CMD` space request announcing a compiled routine of `len`
/// bytes.
///
/// Operands: exec buffer, `len - 1`, exec buffer, `1`.
#[must_use]
pub fn command_request(len: usize) -> Request {
    Request::new(Opcode::PutAddress)
        .space(Space::Cmd)
        .operand(hex(EXEC_BUFFER))
        .operand(hex(len.saturating_sub(1) as u64))
        .operand(hex(EXEC_BUFFER))
        .operand("1")
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    /// Decodes a compiled routine back into `(console address, value)` stores.
    fn decode(code: &[u8]) -> Vec<(u32, u8)> {
        assert_eq!(&code[..PREAMBLE.len()], &PREAMBLE);
        assert_eq!(&code[code.len() - EPILOGUE.len()..], &EPILOGUE);

        code[PREAMBLE.len()..code.len() - EPILOGUE.len()]
            .chunks_exact(BYTES_PER_WRITE)
            .map(|op| {
                assert_eq!(op[0], LDA_IMMEDIATE);
                assert_eq!(op[2], STA_LONG);
                (u32::from_le_bytes([op[3], op[4], op[5], 0]), op[1])
            })
            .collect()
    }

    #[test]
    fn test_single_byte_write() {
        let code = compile(&[WriteOp::new(0xF650AC, [0x00])]).expect("compile");

        let mut expected = PREAMBLE.to_vec();
        expected.extend_from_slice(&[0xA9, 0x00, 0x8F, 0xAC, 0x50, 0x7F]);
        expected.extend_from_slice(&EPILOGUE);
        assert_eq!(code, expected);
    }

    #[test]
    fn test_translate() {
        assert_eq!(translate(WRAM_START), 0x7E0000);
        assert_eq!(translate(0xF650AC), 0x7F50AC);
        assert_eq!(translate(WRAM_START + WRAM_SIZE - 1), 0x7FFFFF);
    }

    #[test]
    fn test_translate_outside_window_does_not_panic() {
        assert_eq!(translate(0), CONSOLE_WRAM.wrapping_sub(WRAM_START));
        assert!(compile(&[WriteOp::new(0, [1])]).is_err());
    }

    #[test]
    fn test_empty_batch_is_preamble_and_epilogue() {
        let code = compile(&[]).expect("compile");
        assert_eq!(code.len(), PREAMBLE.len() + EPILOGUE.len());
    }

    #[test]
    fn test_rejects_below_window() {
        let result = compile(&[WriteOp::new(WRAM_START - 1, [1])]);
        assert!(matches!(
            result,
            Err(Error::OutOfRange {
                address: 0xF4FFFF,
                len: 1
            })
        ));
    }

    #[test]
    fn test_rejects_past_window_end() {
        let last = WRAM_START + WRAM_SIZE - 1;
        assert!(compile(&[WriteOp::new(last, [1])]).is_ok());
        assert!(compile(&[WriteOp::new(last, [1, 2])]).is_err());
    }

    #[test]
    fn test_one_bad_write_rejects_whole_batch() {
        let writes = [
            WriteOp::new(WRAM_START, [1, 2, 3]),
            WriteOp::new(0xE00000, [4]),
        ];
        assert!(validate(&writes).is_err());
        assert!(compile(&writes).is_err());
    }

    #[test]
    fn test_command_request_operands() {
        let request = command_request(26);
        assert_eq!(request.space, Space::Cmd);
        assert_eq!(request.opcode, Opcode::PutAddress);
        assert_eq!(request.operands, vec!["2c00", "19", "2c00", "1"]);
        assert_eq!(request.flags, None);
    }

    proptest! {
        #[test]
        fn prop_compiled_stores_match_writes(
            offset in 0u32..(WRAM_SIZE - 64),
            data in proptest::collection::vec(any::<u8>(), 0..64),
        ) {
            let address = WRAM_START + offset;
            let code = compile(&[WriteOp::new(address, data.clone())]).expect("in range");
            let stores = decode(&code);

            prop_assert_eq!(stores.len(), data.len());
            for (i, (target, value)) in stores.into_iter().enumerate() {
                prop_assert_eq!(target, translate(address) + i as u32);
                prop_assert_eq!(value, data[i]);
            }
        }

        #[test]
        fn prop_out_of_window_always_rejected(
            address in prop_oneof![0u32..WRAM_START, (WRAM_START + WRAM_SIZE)..0x0100_0000],
            len in 1usize..16,
        ) {
            prop_assert!(compile(&[WriteOp::new(address, vec![0; len])]).is_err());
        }
    }
}
