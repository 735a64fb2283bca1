//! Settings types.
//!
//! Every struct uses `#[serde(default)]` so a partial settings file only
//! needs the keys it overrides.

use std::ops::RangeInclusive;

use pingwire_core::constants;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings object.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PingwireSettings {
    /// Echo server settings.
    pub server: ServerSettings,
    /// Client settings.
    pub client: ClientSettings,
    /// Logging settings.
    pub logging: LoggingSettings,
}

/// Echo server network and liveness settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Listening port (`0` lets the OS pick one).
    pub port: u16,
    /// Period between liveness probes, in milliseconds.
    pub probe_interval_ms: u64,
    /// Maximum inbound WebSocket message size in bytes.
    pub max_message_size: usize,
    /// Capacity of each connection's outbound frame queue.
    pub send_queue_capacity: usize,
    /// How long `stop` waits for in-flight work, in milliseconds.
    pub shutdown_timeout_ms: u64,
}

/// Accepted `probeIntervalMs` values.
pub const PROBE_INTERVAL_MS_RANGE: RangeInclusive<u64> = 10..=3_600_000;

impl ServerSettings {
    /// Reject values the server cannot run with.
    ///
    /// `port` 0 is allowed (OS-assigned).
    pub fn validate(&self) -> Result<()> {
        if !PROBE_INTERVAL_MS_RANGE.contains(&self.probe_interval_ms) {
            return Err(SettingsError::InvalidValue(format!(
                "probeIntervalMs must be within {}..={}, got {}",
                PROBE_INTERVAL_MS_RANGE.start(),
                PROBE_INTERVAL_MS_RANGE.end(),
                self.probe_interval_ms
            )));
        }
        if self.send_queue_capacity == 0 {
            return Err(SettingsError::InvalidValue(
                "sendQueueCapacity must be at least 1".into(),
            ));
        }
        if self.max_message_size == 0 {
            return Err(SettingsError::InvalidValue(
                "maxMessageSize must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: constants::DEFAULT_HOST.to_string(),
            port: constants::DEFAULT_PORT,
            probe_interval_ms: 30_000,
            max_message_size: constants::DEFAULT_MAX_MESSAGE_SIZE,
            send_queue_capacity: constants::DEFAULT_SEND_QUEUE_CAPACITY,
            shutdown_timeout_ms: 5_000,
        }
    }
}

/// Client bootstrap settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientSettings {
    /// Server URL to connect to.
    pub url: String,
    /// Text sent once the connection opens.
    pub greeting: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            url: constants::DEFAULT_SERVER_URL.to_string(),
            greeting: constants::CLIENT_GREETING.to_string(),
        }
    }
}

/// Logging settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Minimum level (`EnvFilter` directive syntax).
    pub level: String,
    /// Emit one JSON object per line instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
