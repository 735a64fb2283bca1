//! Client error types.

use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Client failures.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The handshake with the server failed.
    #[error("failed to connect to {url}: {source}")]
    Connect {
        /// The URL that was dialed.
        url: String,
        /// Underlying `WebSocket` error.
        source: Box<tungstenite::Error>,
    },
    /// The session has already shut down.
    #[error("session closed")]
    Closed,
}
