//! Session state machine and device classification.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use tokio::sync::{Mutex as AsyncMutex, oneshot};
use tracing::debug;

use crate::error::{Error, Result};
use crate::transport::{Frame, FrameSink};

use super::InboundQueue;

// ============================================================================
// SessionState
// ============================================================================

/// Connection lifecycle state.
///
/// Ordered: `Disconnected < Connecting < Connected < Attached`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SessionState {
    /// No transport.
    #[default]
    Disconnected,
    /// Transport is being opened.
    Connecting,
    /// Transport open, no device attached.
    Connected,
    /// Transport open and attached to a device.
    Attached,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// ============================================================================
// DeviceKind
// ============================================================================

/// Hardware family name matched case-insensitively in device identifiers.
const SD2SNES_TOKEN: &str = "sd2snes";

/// Device family, which selects the memory write encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    /// Any device accepting plain `PutAddress` writes.
    #[default]
    Generic,
    /// SD2SNES / FXPak hardware, written through compiled commands.
    Sd2snes,
}

impl DeviceKind {
    /// Classifies a device identifier as reported by `DeviceList`.
    ///
    /// SD2SNES if the identifier contains `sd2snes` in any case, or is a
    /// 4-character legacy serial port name such as `COM3`.
    #[must_use]
    pub fn classify(device: &str) -> Self {
        let is_family = device.to_lowercase().contains(SD2SNES_TOKEN);
        let is_legacy_port = device.chars().count() == 4 && device.starts_with("COM");

        if is_family || is_legacy_port {
            Self::Sd2snes
        } else {
            Self::Generic
        }
    }
}

// ============================================================================
// TransportHandle
// ============================================================================

/// Shared reference to the sending half of the current connection.
///
/// Tagged with the epoch it was opened in, so a holder can tell whether
/// the session has since moved on.
#[derive(Clone)]
pub(crate) struct TransportHandle {
    epoch: u64,
    sink: Arc<AsyncMutex<Box<dyn FrameSink>>>,
}

impl fmt::Debug for TransportHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportHandle")
            .field("epoch", &self.epoch)
            .finish_non_exhaustive()
    }
}

impl TransportHandle {
    /// Returns the epoch this transport belongs to.
    #[inline]
    pub(crate) fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Sends one frame.
    pub(crate) async fn send(&self, frame: Frame) -> Result<()> {
        let mut sink = self.sink.lock().await;
        if sink.is_closed() {
            return Err(Error::ConnectionClosed);
        }
        sink.send(frame).await
    }

    /// Closes the transport unless already closed.
    pub(crate) async fn close(&self) {
        let mut sink = self.sink.lock().await;
        if !sink.is_closed()
            && let Err(e) = sink.close().await
        {
            debug!(epoch = self.epoch, error = %e, "Failed to close transport");
        }
    }
}

// ============================================================================
// Teardown
// ============================================================================

/// Outcome of a teardown attempt.
#[derive(Debug)]
pub(crate) enum Teardown {
    /// The epoch was already over; someone else tore it down.
    Stale,
    /// This caller won. Holds the transport to close, if one was open.
    Detached(Option<TransportHandle>),
}

// ============================================================================
// Session
// ============================================================================

/// Mutable session record, guarded by the client's session lock.
///
/// Every successful `connect` starts a new epoch and every teardown ends
/// it. Operations that captured an epoch only act while it is current.
#[derive(Debug)]
pub(crate) struct Session {
    state: SessionState,
    transport: Option<TransportHandle>,
    /// Dropping this stops the receive loop of the current epoch.
    stop_loop: Option<oneshot::Sender<()>>,
    device: Option<String>,
    device_kind: DeviceKind,
    epoch: u64,
    queue: Arc<InboundQueue>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Creates a disconnected session.
    pub(crate) fn new() -> Self {
        Self {
            state: SessionState::Disconnected,
            transport: None,
            stop_loop: None,
            device: None,
            device_kind: DeviceKind::Generic,
            epoch: 0,
            queue: InboundQueue::new(0),
        }
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    #[inline]
    pub(crate) fn state(&self) -> SessionState {
        self.state
    }

    #[inline]
    pub(crate) fn device(&self) -> Option<&str> {
        self.device.as_deref()
    }

    #[inline]
    pub(crate) fn device_kind(&self) -> DeviceKind {
        self.device_kind
    }

    #[inline]
    pub(crate) fn epoch(&self) -> u64 {
        self.epoch
    }

    #[inline]
    pub(crate) fn queue_generation(&self) -> u64 {
        self.queue.generation()
    }

    /// Returns `true` if `epoch` is current and its transport is still held.
    #[inline]
    pub(crate) fn is_current(&self, epoch: u64) -> bool {
        self.epoch == epoch && self.transport.is_some()
    }

    // ------------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------------

    /// Moves to `Connecting` and starts a new epoch.
    ///
    /// Returns `None` if a transport is already open or being opened.
    pub(crate) fn begin_connect(&mut self) -> Option<u64> {
        if self.transport.is_some() || self.state == SessionState::Connecting {
            return None;
        }
        self.epoch += 1;
        self.state = SessionState::Connecting;
        Some(self.epoch)
    }

    /// Installs the opened transport and moves to `Connected`.
    ///
    /// Returns the queue and stop signal for the receive loop, or hands
    /// the sink back if the epoch ended while the transport was opening.
    pub(crate) fn connected(
        &mut self,
        epoch: u64,
        sink: Box<dyn FrameSink>,
    ) -> std::result::Result<(Arc<InboundQueue>, oneshot::Receiver<()>), Box<dyn FrameSink>> {
        if self.epoch != epoch || self.state != SessionState::Connecting {
            return Err(sink);
        }

        let (stop_tx, stop_rx) = oneshot::channel();
        self.transport = Some(TransportHandle {
            epoch,
            sink: Arc::new(AsyncMutex::new(sink)),
        });
        self.stop_loop = Some(stop_tx);
        self.state = SessionState::Connected;

        Ok((Arc::clone(&self.queue), stop_rx))
    }

    /// Records the attached device and moves to `Attached`.
    ///
    /// Returns `false` if `epoch` is no longer current.
    pub(crate) fn attach(&mut self, epoch: u64, device: &str) -> bool {
        if !self.is_current(epoch) {
            return false;
        }
        self.device = Some(device.to_string());
        self.device_kind = DeviceKind::classify(device);
        self.state = SessionState::Attached;
        true
    }

    /// Ends `epoch`: drops the transport, stops the receive loop, resets
    /// to `Disconnected` and replaces the inbound queue.
    ///
    /// Only the first caller for an epoch wins; later callers get
    /// [`Teardown::Stale`].
    pub(crate) fn teardown(&mut self, epoch: u64) -> Teardown {
        if self.epoch != epoch {
            return Teardown::Stale;
        }

        self.epoch += 1;
        self.state = SessionState::Disconnected;
        self.device = None;
        self.device_kind = DeviceKind::Generic;
        self.stop_loop = None;
        self.queue = InboundQueue::new(self.queue.generation() + 1);

        Teardown::Detached(self.transport.take())
    }

    // ------------------------------------------------------------------------
    // Preconditions
    // ------------------------------------------------------------------------

    /// Checks out the transport and queue if the state is exactly `required`.
    ///
    /// # Errors
    ///
    /// [`Error::NotReady`] otherwise.
    pub(crate) fn require(
        &self,
        required: SessionState,
    ) -> Result<(TransportHandle, Arc<InboundQueue>)> {
        if self.state != required {
            return Err(Error::not_ready(self.state, required));
        }
        self.checkout(required)
    }

    /// Checks out the transport and queue if the state is `required` or later.
    ///
    /// # Errors
    ///
    /// [`Error::NotReady`] otherwise.
    pub(crate) fn require_at_least(
        &self,
        required: SessionState,
    ) -> Result<(TransportHandle, Arc<InboundQueue>)> {
        if self.state < required {
            return Err(Error::not_ready(self.state, required));
        }
        self.checkout(required)
    }

    fn checkout(&self, required: SessionState) -> Result<(TransportHandle, Arc<InboundQueue>)> {
        let transport = self
            .transport
            .clone()
            .ok_or_else(|| Error::not_ready(SessionState::Disconnected, required))?;
        Ok((transport, Arc::clone(&self.queue)))
    }
}

// ============================================================================
// Tests
// ============================================================================
