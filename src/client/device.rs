//! Device discovery, attachment, and console control.

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::protocol::{DeviceInfo, Opcode, Request};
use crate::session::SessionState;

use super::Client;

// ============================================================================
// Client - Devices
// ============================================================================

impl Client {
    /// Lists the devices the server knows about.
    ///
    /// Needs a connection; no device has to be attached.
    ///
    /// # Errors
    ///
    /// - [`Error::NotReady`] if not connected
    /// - [`Error::Protocol`] if the server reports no devices; like any
    ///   reply failure this drops the connection
    pub async fn device_list(&self) -> Result<Vec<String>> {
        let _exchange = self.exchange().await;
        let link = self.require_at_least(SessionState::Connected)?;

        self.send_request(&link, &Request::new(Opcode::DeviceList))
            .await?;
        let reply = self.recv_reply(&link, Opcode::DeviceList).await?;

        match reply.into_results() {
            Some(devices) => {
                debug!(count = devices.len(), "Got device list");
                Ok(devices)
            }
            None => self.fail(&link, Error::protocol("No device found")).await,
        }
    }

    /// Attaches the connection to `device`.
    ///
    /// The server sends no reply. On success the session is
    /// [`SessionState::Attached`] and the device family is classified.
    ///
    /// # Errors
    ///
    /// - [`Error::NotReady`] unless exactly [`SessionState::Connected`]
    /// - a connection error if the request could not be sent; the
    ///   connection is dropped
    pub async fn attach(&self, device: &str) -> Result<()> {
        let _exchange = self.exchange().await;
        let link = self.require(SessionState::Connected)?;

        let request = Request::new(Opcode::Attach).operand(device);
        self.send_request(&link, &request).await?;

        if !self.inner.session.lock().attach(link.epoch(), device) {
            return Err(Error::ConnectionClosed);
        }

        info!(device, kind = ?self.device_kind(), "Attached to device");
        Ok(())
    }

    /// Queries firmware and running ROM of the attached device.
    ///
    /// # Errors
    ///
    /// - [`Error::NotReady`] unless attached
    /// - [`Error::Protocol`] if the reply is empty
    pub async fn info(&self) -> Result<DeviceInfo> {
        let _exchange = self.exchange().await;
        let link = self.require(SessionState::Attached)?;
        let device = self.device().unwrap_or_default();

        let request = Request::new(Opcode::Info).operand(device);
        self.send_request(&link, &request).await?;
        let reply = self.recv_reply(&link, Opcode::Info).await?;

        if reply.is_empty() {
            return self.fail(&link, Error::protocol("Empty Info reply")).await;
        }

        let info = DeviceInfo::from(&reply);
        debug!(?info, "Got device info");
        Ok(info)
    }
}

// ============================================================================
// Client - Console Control
// ============================================================================

impl Client {
    /// Registers a client name with the server.
    pub async fn name(&self, name: &str) -> Result<()> {
        debug!(name, "Setting client name");
        self.send_command(Request::new(Opcode::Name).operand(name))
            .await
    }

    /// Boots a ROM stored on the device.
    pub async fn boot(&self, rom: &str) -> Result<()> {
        info!(rom, "Booting ROM");
        self.send_command(Request::new(Opcode::Boot).operand(rom))
            .await
    }

    /// Returns the console to the device menu.
    pub async fn menu(&self) -> Result<()> {
        info!("Returning to menu");
        self.send_command(Request::new(Opcode::Menu)).await
    }

    /// Resets the console.
    pub async fn reset(&self) -> Result<()> {
        info!("Resetting console");
        self.send_command(Request::new(Opcode::Reset)).await
    }
}

// ============================================================================
// Tests
// ============================================================================
