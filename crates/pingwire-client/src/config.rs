//! Client configuration.

use pingwire_core::constants;
use pingwire_settings::ClientSettings;

/// Where to connect and what to say first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// Server URL (`ws://host:port[/path]`).
    pub url: String,
    /// Text sent once the connection opens.
    pub greeting: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: constants::DEFAULT_SERVER_URL.into(),
            greeting: constants::CLIENT_GREETING.into(),
        }
    }
}

impl From<&ClientSettings> for ClientConfig {
    fn from(settings: &ClientSettings) -> Self {
        Self {
            url: settings.url.clone(),
            greeting: settings.greeting.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.url, "ws://localhost:7777");
        assert_eq!(cfg.greeting, "World");
    }

    #[test]
    fn from_settings() {
        let settings = ClientSettings {
            url: "ws://10.1.1.1:9000".into(),
            greeting: "Earth".into(),
        };
        let cfg = ClientConfig::from(&settings);
        assert_eq!(cfg.url, "ws://10.1.1.1:9000");
        assert_eq!(cfg.greeting, "Earth");
    }
}
