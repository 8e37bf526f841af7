//! WebSocket connector built on `tokio-tungstenite`.
//!
//! The socket is split into a sink and a stream so the receive loop can
//! drain incoming frames while opcode calls send.
//!
//! No keepalive probing is performed: tungstenite never originates pings,
//! and QUsb2snes servers do not need them. Pings from the server are still
//! answered by tungstenite on the next write.

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace};

use crate::error::{Error, Result};

use super::{Connector, Frame, FrameSink, FrameStream};

// ============================================================================
// Types
// ============================================================================

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ============================================================================
// WsConnector
// ============================================================================

/// Opens WebSocket connections to a QUsb2snes server.
#[derive(Debug, Default, Clone, Copy)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> Result<(Box<dyn FrameSink>, Box<dyn FrameStream>)> {
        let (ws_stream, _response) = connect_async(url)
            .await
            .map_err(|e| Error::connection(format!("WebSocket connect to {url} failed: {e}")))?;

        debug!(%url, "WebSocket connection established");

        let (write, read) = ws_stream.split();
        Ok((
            Box::new(WsSink {
                write,
                closed: false,
            }),
            Box::new(WsFrames { read }),
        ))
    }
}

// ============================================================================
// WsSink
// ============================================================================

/// Sending half of a WebSocket connection.
struct WsSink {
    write: SplitSink<WsStream, Message>,
    closed: bool,
}

#[async_trait]
impl FrameSink for WsSink {
    async fn send(&mut self, frame: Frame) -> Result<()> {
        if self.closed {
            return Err(Error::ConnectionClosed);
        }

        let len = frame.len();
        let message = match frame {
            Frame::Text(text) => Message::Text(text.into()),
            Frame::Binary(data) => Message::Binary(data.into()),
        };

        if let Err(e) = self.write.send(message).await {
            self.closed = true;
            return Err(Error::WebSocket(e));
        }

        trace!(len, "Frame sent");
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.write.close().await?;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

// ============================================================================
// WsFrames
// ============================================================================

/// Receiving half of a WebSocket connection.
struct WsFrames {
    read: SplitStream<WsStream>,
}

#[async_trait]
impl FrameStream for WsFrames {
    async fn next_frame(&mut self) -> Option<Result<Frame>> {
        loop {
            match self.read.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(Frame::Text(text.as_str().to_owned()))),

                Ok(Message::Binary(data)) => return Some(Ok(Frame::Binary(data.to_vec()))),

                Ok(Message::Close(_)) => {
                    debug!("WebSocket closed by remote");
                    return None;
                }

                Err(e) => return Some(Err(Error::WebSocket(e))),

                // Ignore Ping, Pong, raw frames
                Ok(_) => {}
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
