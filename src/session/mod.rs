//! Connection session.
//!
//! Tracks the lifecycle of the single connection a [`Client`](crate::Client)
//! owns, the device attached over it, and the queue its replies land in.
//!
//! # Lifecycle
//!
//! ```text
//! Disconnected ──connect──► Connecting ──open ok──► Connected ──Attach──► Attached
//!      ▲                        │                       │                    │
//!      └────────────────────────┴───── any fault ───────┴────────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `state` | Session state machine and device classification |
//! | `queue` | Inbound frame queue fed by the receive loop |

// ============================================================================
// Submodules
// ============================================================================

/// Inbound frame queue.
pub mod queue;

/// Session state machine.
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use queue::InboundQueue;
pub use state::{DeviceKind, SessionState};
pub(crate) use state::{Session, Teardown, TransportHandle};
