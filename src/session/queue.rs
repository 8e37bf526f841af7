//! Inbound frame queue.
//!
//! The receive loop pushes every inbound frame here in arrival order. The
//! caller holding the request lock pops the frames answering its request.
//!
//! A queue belongs to one connection. When the connection is torn down the
//! session swaps in a fresh queue with the next generation number, so a
//! reply that belonged to the old connection can never reach a caller on
//! the new one. A caller still waiting on the old queue times out.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio::time::timeout;
use tracing::trace;

use crate::transport::Frame;

// ============================================================================
// InboundQueue
// ============================================================================

/// Unbounded FIFO of inbound frames for one connection.
#[derive(Debug)]
pub struct InboundQueue {
    /// Replacement counter, starting at 0 for the first queue.
    generation: u64,
    /// Producer side, used by the receive loop.
    tx: mpsc::UnboundedSender<Frame>,
    /// Consumer side, used by whoever holds the request lock.
    rx: Mutex<mpsc::UnboundedReceiver<Frame>>,
}

impl InboundQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new(generation: u64) -> Arc<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            generation,
            tx,
            rx: Mutex::new(rx),
        })
    }

    /// Returns the replacement counter of this queue.
    #[inline]
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Appends a frame.
    pub fn push(&self, frame: Frame) {
        trace!(generation = self.generation, len = frame.len(), "Frame queued");
        // The receiver lives as long as `self`, so this cannot fail.
        let _ = self.tx.send(frame);
    }

    /// Removes the oldest frame, waiting up to `wait` for one to arrive.
    ///
    /// Returns `None` on timeout.
    pub async fn pop(&self, wait: Duration) -> Option<Frame> {
        let mut rx = self.rx.lock().await;
        timeout(wait, rx.recv()).await.ok().flatten()
    }
}

// ============================================================================
// Tests
// ============================================================================
