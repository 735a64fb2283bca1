//! Server configuration.

use std::time::Duration;

use pingwire_core::constants;
use pingwire_settings::ServerSettings;
use serde::{Deserialize, Serialize};

/// Configuration for the echo server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind (default `"0.0.0.0"`).
    pub host: String,
    /// Port to bind (default `7777`, `0` for auto-assign).
    pub port: u16,
    /// Liveness probe period in milliseconds.
    pub probe_interval_ms: u64,
    /// Max inbound WebSocket message size in bytes.
    pub max_message_size: usize,
    /// Per-connection outbound queue capacity.
    pub send_queue_capacity: usize,
    /// Upper bound on how long `stop` waits for the serve task.
    pub shutdown_timeout_ms: u64,
}

impl ServerConfig {
    /// Probe period as a [`Duration`].
    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }

    /// Shutdown timeout as a [`Duration`].
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    /// `host:port` string passed to the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: constants::DEFAULT_HOST.into(),
            port: constants::DEFAULT_PORT,
            probe_interval_ms: 30_000,
            max_message_size: constants::DEFAULT_MAX_MESSAGE_SIZE,
            send_queue_capacity: constants::DEFAULT_SEND_QUEUE_CAPACITY,
            shutdown_timeout_ms: 5_000,
        }
    }
}

impl From<&ServerSettings> for ServerConfig {
    fn from(settings: &ServerSettings) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.port,
            probe_interval_ms: settings.probe_interval_ms,
            max_message_size: settings.max_message_size,
            send_queue_capacity: settings.send_queue_capacity,
            shutdown_timeout_ms: settings.shutdown_timeout_ms,
        }
    }
}
