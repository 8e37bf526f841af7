//! Console memory reads and writes.

use tracing::debug;

use crate::error::{Error, Result};
use crate::protocol::{Opcode, Request, WriteOp, hex};
use crate::sd2snes;
use crate::session::{DeviceKind, SessionState};

use super::Client;
use super::core::Link;

// ============================================================================
// Constants
// ============================================================================

/// Largest readable region: the whole 24-bit console address space.
pub const MAX_READ_SIZE: usize = 0x0100_0000;

// ============================================================================
// Client - Memory
// ============================================================================

impl Client {
    /// Reads `size` bytes starting at `address`.
    ///
    /// Returns exactly `size` bytes or an error; partial data is never
    /// returned.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidSize`] if `size` exceeds [`MAX_READ_SIZE`], before
    ///   any I/O
    /// - [`Error::NotReady`] unless attached
    /// - [`Error::ShortRead`] if fewer or more bytes arrived than
    ///   requested; the connection is dropped
    pub async fn get_address(&self, address: u32, size: usize) -> Result<Vec<u8>> {
        if size > MAX_READ_SIZE {
            return Err(Error::InvalidSize {
                size,
                max: MAX_READ_SIZE,
            });
        }

        let _exchange = self.exchange().await;
        let link = self.require(SessionState::Attached)?;

        let request = Request::new(Opcode::GetAddress)
            .operand(hex(address))
            .operand(hex(size as u64));
        self.send_request(&link, &request).await?;

        self.recv_binary(&link, size, |received| Error::ShortRead {
            address,
            requested: size,
            received,
        })
        .await
    }

    /// Writes a batch of memory regions.
    ///
    /// SD2SNES devices get the whole batch compiled into one routine;
    /// other devices get one request and one payload frame per write.
    ///
    /// # Errors
    ///
    /// - [`Error::NotReady`] unless attached
    /// - [`Error::OutOfRange`] on SD2SNES if any write leaves the WRAM
    ///   window; nothing is sent and the connection stays up
    pub async fn put_address(&self, writes: &[WriteOp]) -> Result<()> {
        let _exchange = self.exchange().await;
        let link = self.require(SessionState::Attached)?;

        match self.device_kind() {
            DeviceKind::Sd2snes => self.put_compiled(&link, writes).await,
            DeviceKind::Generic => self.put_plain(&link, writes).await,
        }
    }

    async fn put_compiled(&self, link: &Link, writes: &[WriteOp]) -> Result<()> {
        let code = sd2snes::compile(writes)?;
        debug!(writes = writes.len(), len = code.len(), "Sending compiled write");

        self.send_request(link, &sd2snes::command_request(code.len()))
            .await?;
        self.send_binary(link, code).await
    }

    async fn put_plain(&self, link: &Link, writes: &[WriteOp]) -> Result<()> {
        for write in writes {
            let request = Request::new(Opcode::PutAddress)
                .operand(hex(write.address))
                .operand(hex(write.data.len() as u64));

            self.send_request(link, &request).await?;
            self.send_binary(link, write.data.clone()).await?;
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
