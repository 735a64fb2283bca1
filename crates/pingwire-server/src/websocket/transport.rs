//! The transport surface the supervisor and echo logic consume.

use std::sync::Arc;

use pingwire_core::ConnectionId;

use crate::errors::TransportError;

/// Lifecycle state of one connection. `Open → Closed` is one-way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Frames may be sent.
    Open,
    /// The connection is gone, locally or remotely.
    Closed,
}

/// Events produced by one socket, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// The upgrade completed.
    Opened,
    /// An inbound text payload (opaque).
    Message(String),
    /// The peer answered a probe.
    Pong,
    /// The connection closed.
    Closed,
    /// A transport-level error; the connection closes after it.
    Error(String),
}

/// One bidirectional socket channel as seen by the supervisor and handlers.
pub trait Connection: Send + Sync {
    /// Opaque identity.
    fn id(&self) -> &ConnectionId;

    /// Current lifecycle state.
    fn state(&self) -> ConnectionState;

    /// Queue a text frame.
    fn send(&self, payload: Arc<String>) -> Result<(), TransportError>;

    /// Queue a zero-payload liveness probe.
    fn send_probe(&self) -> Result<(), TransportError>;

    /// Whether the connection is still open.
    fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }
}
