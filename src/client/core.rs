//! Core client struct, connection lifecycle and exchange plumbing.
//!
//! Every opcode method follows the same shape:
//!
//! 1. [`Client::exchange`] - take the request lock
//! 2. `require` - check the session state and check out the transport
//! 3. send one or more frames
//! 4. pop the reply frames from the inbound queue
//! 5. drop the lock guard
//!
//! Any transport fault in steps 3 or 4 tears the connection down before
//! the error is returned.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, MutexGuard, oneshot};
use tracing::{debug, error, info, trace, warn};

use crate::error::{Error, Result};
use crate::protocol::{Opcode, Reply, Request};
use crate::session::{
    DeviceKind, InboundQueue, Session, SessionState, Teardown, TransportHandle,
};
use crate::transport::{Connector, Frame, FrameStream, WsConnector};

use super::builder::{ClientBuilder, ClientConfig};

// ============================================================================
// Constants
// ============================================================================

/// Upper bound on the buffer reserved before binary reply data arrives.
///
/// Sizes come from callers and server replies; the buffer grows with the
/// data actually received.
const MAX_PREALLOCATION: usize = 64 * 1024;

// ============================================================================
// Types
// ============================================================================

/// Internal shared state for a client.
pub(crate) struct ClientInner {
    /// Validated settings.
    pub config: ClientConfig,
    /// Transport factory.
    connector: Arc<dyn Connector>,
    /// Session record. Never held across an await.
    pub session: Mutex<Session>,
    /// Request lock: one opcode exchange in flight at a time.
    request_lock: AsyncMutex<()>,
}

/// Transport and queue checked out for one exchange.
pub(crate) struct Link {
    pub transport: TransportHandle,
    pub queue: Arc<InboundQueue>,
}

impl Link {
    #[inline]
    pub(crate) fn epoch(&self) -> u64 {
        self.transport.epoch()
    }
}

// ============================================================================
// Client
// ============================================================================

/// A handle to one QUsb2snes connection.
///
/// Cheap to clone; clones share the connection, session, and request lock.
///
/// # Example
///
/// ```no_run
/// # use qusb2snes_client::Client;
/// # async fn example() -> qusb2snes_client::Result<()> {
/// let client = Client::new();
/// client.connect().await?;
///
/// let devices = client.device_list().await?;
/// client.attach(&devices[0]).await?;
///
/// let bytes = client.get_address(0xF650AA, 2).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    /// Shared inner state.
    pub(crate) inner: Arc<ClientInner>,
}

// ============================================================================
// Client - Display
// ============================================================================

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let session = self.inner.session.lock();
        f.debug_struct("Client")
            .field("url", &self.inner.config.url)
            .field("state", &session.state())
            .field("device", &session.device())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Client - Constructor
// ============================================================================

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    /// Creates a client for `ws://localhost:8080` with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::from_parts(ClientConfig::default(), Arc::new(WsConnector))
    }

    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Creates a client from validated parts.
    pub(crate) fn from_parts(config: ClientConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                config,
                connector,
                session: Mutex::new(Session::new()),
                request_lock: AsyncMutex::new(()),
            }),
        }
    }
}

// ============================================================================
// Client - Accessors
// ============================================================================

impl Client {
    /// Returns the client settings.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Returns the current session state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.inner.session.lock().state()
    }

    /// Returns the attached device identifier.
    #[must_use]
    pub fn device(&self) -> Option<String> {
        self.inner.session.lock().device().map(str::to_string)
    }

    /// Returns the attached device family.
    #[inline]
    #[must_use]
    pub fn device_kind(&self) -> DeviceKind {
        self.inner.session.lock().device_kind()
    }

    /// Returns how many times the inbound queue has been replaced.
    ///
    /// Increments on every teardown. A reply can only be consumed by a
    /// caller that checked out the queue of the same generation.
    #[inline]
    #[must_use]
    pub fn queue_generation(&self) -> u64 {
        self.inner.session.lock().queue_generation()
    }
}

// ============================================================================
// Client - Lifecycle
// ============================================================================

impl Client {
    /// Opens the connection and starts the receive loop.
    ///
    /// Does nothing if a connection is already open or opening.
    ///
    /// # Errors
    ///
    /// - [`Error::Connection`] if the server cannot be reached; the session
    ///   is back in [`SessionState::Disconnected`]
    /// - [`Error::ConnectionClosed`] if [`Client::disconnect`] ran while
    ///   the connection was opening
    pub async fn connect(&self) -> Result<()> {
        let Some(epoch) = self.inner.session.lock().begin_connect() else {
            info!("Already connected to QUsb2snes");
            return Ok(());
        };

        let url = &self.inner.config.url;
        info!(%url, "Connecting to QUsb2snes");

        let (sink, stream) = match self.inner.connector.connect(url).await {
            Ok(halves) => halves,
            Err(e) => {
                warn!(%url, error = %e, "Connection failed");
                self.inner.teardown(epoch).await;
                return Err(e);
            }
        };

        let installed = self.inner.session.lock().connected(epoch, sink);
        match installed {
            Ok((queue, stop)) => {
                tokio::spawn(receive_loop(
                    Arc::downgrade(&self.inner),
                    epoch,
                    stream,
                    queue,
                    stop,
                ));
                info!(%url, epoch, "Connected to QUsb2snes");
                Ok(())
            }
            Err(mut sink) => {
                debug!(epoch, "Disconnected while opening, closing new transport");
                if let Err(e) = sink.close().await {
                    debug!(error = %e, "Failed to close transport");
                }
                Err(Error::ConnectionClosed)
            }
        }
    }

    /// Closes the connection.
    ///
    /// Uses the same teardown as a transport fault. A caller waiting on a
    /// reply at this moment times out.
    pub async fn disconnect(&self) {
        let epoch = {
            let session = self.inner.session.lock();
            if session.state() == SessionState::Disconnected {
                return;
            }
            session.epoch()
        };
        self.inner.teardown(epoch).await;
    }
}

// ============================================================================
// Client - Internal
// ============================================================================

impl Client {
    /// Takes the request lock for one opcode exchange.
    ///
    /// The guard must live until the last reply frame has been consumed.
    pub(crate) async fn exchange(&self) -> MutexGuard<'_, ()> {
        self.inner.request_lock.lock().await
    }

    /// Checks out the link if the session is exactly `required`.
    pub(crate) fn require(&self, required: SessionState) -> Result<Link> {
        let (transport, queue) = self.inner.session.lock().require(required)?;
        Ok(Link { transport, queue })
    }

    /// Checks out the link if the session is `required` or later.
    pub(crate) fn require_at_least(&self, required: SessionState) -> Result<Link> {
        let (transport, queue) = self.inner.session.lock().require_at_least(required)?;
        Ok(Link { transport, queue })
    }

    /// Sends a request that gets no reply, on an attached session.
    pub(crate) async fn send_command(&self, request: Request) -> Result<()> {
        let _exchange = self.exchange().await;
        let link = self.require(SessionState::Attached)?;
        self.send_request(&link, &request).await
    }

    /// Sends a request as one text frame.
    pub(crate) async fn send_request(&self, link: &Link, request: &Request) -> Result<()> {
        let json = request.to_json()?;
        debug!(opcode = %request.opcode, operands = ?request.operands, "Sending request");
        self.send_frame(link, Frame::Text(json)).await
    }

    /// Sends a binary payload frame.
    pub(crate) async fn send_binary(&self, link: &Link, data: Vec<u8>) -> Result<()> {
        self.send_frame(link, Frame::Binary(data)).await
    }

    /// Sends one frame, tearing the connection down on failure.
    ///
    /// Fails immediately if the link's connection was already torn down.
    async fn send_frame(&self, link: &Link, frame: Frame) -> Result<()> {
        if !self.inner.session.lock().is_current(link.epoch()) {
            return Err(Error::ConnectionClosed);
        }

        match link.transport.send(frame).await {
            Ok(()) => Ok(()),
            Err(e) => self.fail(link, e).await,
        }
    }

    /// Pops one text reply.
    ///
    /// Timeouts, binary frames, and undecodable JSON tear the connection
    /// down.
    pub(crate) async fn recv_reply(&self, link: &Link, opcode: Opcode) -> Result<Reply> {
        let timeout = self.inner.config.reply_timeout;

        let result = match link.queue.pop(timeout).await {
            Some(Frame::Text(text)) => Reply::from_text(&text),
            Some(Frame::Binary(data)) => Err(Error::protocol(format!(
                "{opcode}: expected a text reply, got {} binary bytes",
                data.len()
            ))),
            None => Err(Error::timeout(opcode.to_string(), timeout.as_millis() as u64)),
        };

        match result {
            Ok(reply) => {
                trace!(%opcode, results = ?reply.results, "Reply received");
                Ok(reply)
            }
            Err(e) => self.fail(link, e).await,
        }
    }

    /// Pops binary frames until exactly `size` bytes have arrived.
    ///
    /// Each pop waits up to the reply timeout. Anything other than exactly
    /// `size` bytes is a short read: the partial data is dropped, the
    /// connection torn down, and `short_read(received)` returned.
    pub(crate) async fn recv_binary(
        &self,
        link: &Link,
        size: usize,
        short_read: impl FnOnce(usize) -> Error,
    ) -> Result<Vec<u8>> {
        let timeout = self.inner.config.reply_timeout;
        let mut data = Vec::with_capacity(size.min(MAX_PREALLOCATION));

        while data.len() < size {
            match link.queue.pop(timeout).await {
                Some(Frame::Binary(chunk)) => data.extend_from_slice(&chunk),
                Some(Frame::Text(text)) => {
                    let error = Error::protocol(format!(
                        "expected binary data, got text frame: {text}"
                    ));
                    return self.fail(link, error).await;
                }
                None => break,
            }
        }

        if data.len() != size {
            warn!(requested = size, received = data.len(), "Short read");
            return self.fail(link, short_read(data.len())).await;
        }

        trace!(len = size, "Binary reply received");
        Ok(data)
    }

    /// Tears down the link's connection and returns `error`.
    pub(crate) async fn fail<T>(&self, link: &Link, error: Error) -> Result<T> {
        warn!(epoch = link.epoch(), error = %error, "Exchange failed, dropping connection");
        self.inner.teardown(link.epoch()).await;
        Err(error)
    }
}

// ============================================================================
// ClientInner - Teardown
// ============================================================================

impl ClientInner {
    /// Ends `epoch`: resets the session and closes its transport.
    ///
    /// Returns `false` if another caller already tore this epoch down.
    pub(crate) async fn teardown(&self, epoch: u64) -> bool {
        let outcome = self.session.lock().teardown(epoch);

        match outcome {
            Teardown::Stale => false,
            Teardown::Detached(transport) => {
                if let Some(transport) = transport {
                    transport.close().await;
                }
                info!(epoch, "Disconnected from QUsb2snes");
                true
            }
        }
    }
}

// ============================================================================
// Receive Loop
// ============================================================================

/// Drains the transport into the inbound queue until it ends.
///
/// Ends when the peer closes, the transport errors, the epoch is torn down
/// elsewhere (stop signal), or the client is dropped. Tears the epoch down
/// on the way out.
async fn receive_loop(
    inner: Weak<ClientInner>,
    epoch: u64,
    mut stream: Box<dyn FrameStream>,
    queue: Arc<InboundQueue>,
    mut stop: oneshot::Receiver<()>,
) {
    debug!(epoch, generation = queue.generation(), "Receive loop started");

    loop {
        tokio::select! {
            frame = stream.next_frame() => {
                match frame {
                    Some(Ok(frame)) => queue.push(frame),

                    Some(Err(e)) => {
                        error!(epoch, error = %e, "Transport error");
                        break;
                    }

                    None => {
                        debug!(epoch, "Transport closed by remote");
                        break;
                    }
                }
            }

            _ = &mut stop => {
                debug!(epoch, "Receive loop stopped");
                break;
            }
        }
    }

    if let Some(inner) = inner.upgrade() {
        inner.teardown(epoch).await;
    }

    debug!(epoch, "Receive loop terminated");
}

// ============================================================================
// Tests
// ============================================================================
