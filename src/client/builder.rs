//! Builder pattern for client configuration.
//!
//! Provides a fluent API for configuring and creating [`Client`] instances.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use qusb2snes_client::Client;
//!
//! # fn example() -> qusb2snes_client::Result<()> {
//! let client = Client::builder()
//!     .url("ws://localhost:23074")
//!     .reply_timeout(Duration::from_secs(10))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};
use crate::transport::{Connector, WsConnector};

use super::core::Client;

// ============================================================================
// Constants
// ============================================================================

/// Default QUsb2snes endpoint.
pub const DEFAULT_URL: &str = "ws://localhost:8080";

/// Default ceiling for every reply wait.
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(5);

/// Default PutFile chunk size.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Uploads larger than this run the completion heuristic.
pub const DEFAULT_LARGE_TRANSFER_THRESHOLD: usize = 2 * 1024 * 1024;

/// Default settle delay before the completion probe.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(5);

// ============================================================================
// ClientConfig
// ============================================================================

/// Validated client settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Server endpoint.
    pub url: String,
    /// Ceiling for every reply wait.
    pub reply_timeout: Duration,
    /// PutFile chunk size in bytes.
    pub chunk_size: usize,
    /// Uploads strictly larger than this run the completion heuristic.
    pub large_transfer_threshold: usize,
    /// Delay before the completion probe.
    pub settle_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
            chunk_size: DEFAULT_CHUNK_SIZE,
            large_transfer_threshold: DEFAULT_LARGE_TRANSFER_THRESHOLD,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for configuring a [`Client`] instance.
///
/// Use [`Client::builder()`] to create a new builder.
#[derive(Clone, Default)]
pub struct ClientBuilder {
    /// Settings collected so far.
    config: ClientConfig,
    /// Transport factory (WebSocket when unset).
    connector: Option<Arc<dyn Connector>>,
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("config", &self.config)
            .field("custom_connector", &self.connector.is_some())
            .finish()
    }
}

// ============================================================================
// ClientBuilder Implementation
// ============================================================================

impl ClientBuilder {
    /// Creates a builder with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the server endpoint.
    ///
    /// # Arguments
    ///
    /// * `url` - WebSocket URL (e.g., "ws://localhost:8080")
    #[inline]
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.config.url = url.into();
        self
    }

    /// Sets the ceiling for every reply wait.
    #[inline]
    #[must_use]
    pub fn reply_timeout(mut self, timeout: Duration) -> Self {
        self.config.reply_timeout = timeout;
        self
    }

    /// Sets the PutFile chunk size.
    #[inline]
    #[must_use]
    pub fn chunk_size(mut self, bytes: usize) -> Self {
        self.config.chunk_size = bytes;
        self
    }

    /// Sets the size above which uploads run the completion heuristic.
    #[inline]
    #[must_use]
    pub fn large_transfer_threshold(mut self, bytes: usize) -> Self {
        self.config.large_transfer_threshold = bytes;
        self
    }

    /// Sets the delay the completion heuristic waits before probing.
    #[inline]
    #[must_use]
    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.config.settle_delay = delay;
        self
    }

    /// Replaces the WebSocket transport with a custom connector.
    #[inline]
    #[must_use]
    pub fn connector(mut self, connector: impl Connector + 'static) -> Self {
        self.connector = Some(Arc::new(connector));
        self
    }

    /// Builds the client with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the URL does not parse or is not `ws`/`wss`
    /// - [`Error::Config`] if the chunk size or reply timeout is zero
    pub fn build(self) -> Result<Client> {
        self.validate_url()?;
        self.validate_limits()?;

        let connector = self.connector.unwrap_or_else(|| Arc::new(WsConnector));
        Ok(Client::from_parts(self.config, connector))
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ClientBuilder {
    /// Validates the endpoint.
    fn validate_url(&self) -> Result<()> {
        let url = Url::parse(&self.config.url)
            .map_err(|e| Error::config(format!("Invalid URL \"{}\": {e}", self.config.url)))?;

        match url.scheme() {
            "ws" | "wss" => Ok(()),
            other => Err(Error::config(format!(
                "Unsupported URL scheme \"{other}\". Use ws:// or wss://\n\
                 Example: Client::builder().url(\"{DEFAULT_URL}\")"
            ))),
        }
    }

    /// Validates numeric limits.
    fn validate_limits(&self) -> Result<()> {
        if self.config.chunk_size == 0 {
            return Err(Error::config("chunk_size must be greater than zero"));
        }
        if self.config.reply_timeout.is_zero() {
            return Err(Error::config("reply_timeout must be greater than zero"));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
