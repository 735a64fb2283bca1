//! Wire literals and default tunables.

use std::time::Duration;

/// Default listening port for the echo server.
pub const DEFAULT_PORT: u16 = 7777;

/// Default bind host (all interfaces).
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default period between liveness probes on one connection.
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(30);

/// Default URL the client connects to.
pub const DEFAULT_SERVER_URL: &str = "ws://localhost:7777";

/// Text the client sends once the connection opens.
pub const CLIENT_GREETING: &str = "World";

/// `type` field of the fixed echo reply.
pub const REPLY_TYPE: &str = "Hello";

/// `message` field of the fixed echo reply.
pub const REPLY_MESSAGE: &str = "hi";

/// Default capacity of a connection's outbound frame queue.
pub const DEFAULT_SEND_QUEUE_CAPACITY: usize = 256;

/// Default maximum inbound WebSocket message size.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_url_uses_default_port() {
        assert!(DEFAULT_SERVER_URL.ends_with(&DEFAULT_PORT.to_string()));
    }

    #[test]
    fn probe_interval_is_thirty_seconds() {
        assert_eq!(DEFAULT_PROBE_INTERVAL.as_secs(), 30);
    }
}
