//! Server-side error types.

use pingwire_core::ConnectionId;
use thiserror::Error;

/// A frame could not be handed to the connection's writer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The connection is closed or its writer has gone away.
    #[error("connection closed")]
    Closed,
    /// The outbound queue is full.
    #[error("outbound queue full")]
    QueueFull,
}

/// Liveness supervisor errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SupervisorError {
    /// Supervision only starts on an open connection.
    #[error("connection {0} is not open")]
    NotOpen(ConnectionId),
}

/// Server lifecycle errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Binding the listening socket failed.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// The address that was requested.
        addr: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// `start` was called on a running server.
    #[error("server already started")]
    AlreadyStarted,
    /// `start` was called after `stop`.
    #[error("server has been stopped")]
    Stopped,
    /// Other I/O failure on the listener.
    #[error("listener I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_error_display() {
        assert_eq!(TransportError::Closed.to_string(), "connection closed");
        assert_eq!(TransportError::QueueFull.to_string(), "outbound queue full");
    }

    #[test]
    fn not_open_names_connection() {
        let err = SupervisorError::NotOpen(ConnectionId::from("conn_7"));
        assert_eq!(err.to_string(), "connection conn_7 is not open");
    }

    #[test]
    fn bind_error_names_address() {
        let err = ServerError::Bind {
            addr: "0.0.0.0:7777".into(),
            source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "in use"),
        };
        let msg = err.to_string();
        assert!(msg.contains("0.0.0.0:7777"));
        assert!(msg.contains("in use"));
    }
}
