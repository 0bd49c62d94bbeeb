//! Observer configuration.
//!
//! Configuration-driven enablement of the checkpoint shadow and the
//! broadcast relay.

use crate::core::{Error, Result, SubscriberId};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default number of batches a feed prefetches past the checkpoint.
pub const DEFAULT_LOOKAHEAD_DEPTH: u64 = 10;

/// Configuration shared by both training observers.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ObserverConfig {
    /// Directory holding the feed state; `None` disables shadowing
    #[serde(default)]
    pub restore_path: Option<PathBuf>,
    /// Offset subtracted from the shadowed group index
    #[serde(default = "default_lookahead_depth")]
    pub lookahead_depth: u64,
    /// Transport credentials, required for the broadcast relay
    #[serde(default)]
    pub transport: Option<TransportCredentials>,
    /// Route transport traffic through a SOCKS proxy
    #[serde(default)]
    pub use_proxy: bool,
    /// Relay timing settings
    #[serde(default)]
    pub relay: RelaySettings,
}

fn default_lookahead_depth() -> u64 {
    DEFAULT_LOOKAHEAD_DEPTH
}

impl ObserverConfig {
    /// Create config with shadowing enabled at the given directory.
    pub fn with_restore_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.restore_path = Some(path.into());
        self
    }

    /// Set the lookahead depth.
    pub fn with_lookahead_depth(mut self, depth: u64) -> Self {
        self.lookahead_depth = depth;
        self
    }

    /// Set transport credentials.
    pub fn with_transport(mut self, credentials: TransportCredentials) -> Self {
        self.transport = Some(credentials);
        self
    }

    /// Parse config from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        if self.use_proxy {
            let creds = self.transport.as_ref().ok_or(Error::MissingTransportConfig)?;
            if creds.proxy_url().is_none() {
                return Err(Error::InvalidConfig(
                    "use_proxy requires proxy_host and proxy_port".to_string(),
                ));
            }
        }
        if let Some(creds) = &self.transport {
            if creds.token.trim().is_empty() {
                return Err(Error::InvalidConfig("transport token is empty".to_string()));
            }
        }
        Ok(())
    }

    /// Transport credentials, or an error when the relay cannot be built.
    pub fn credentials(&self) -> Result<&TransportCredentials> {
        self.transport.as_ref().ok_or(Error::MissingTransportConfig)
    }

    /// Proxy URL to route through, if proxying is enabled.
    pub fn proxy_url(&self) -> Option<String> {
        if !self.use_proxy {
            return None;
        }
        self.transport.as_ref().and_then(|c| c.proxy_url())
    }
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            restore_path: None,
            lookahead_depth: DEFAULT_LOOKAHEAD_DEPTH,
            transport: None,
            use_proxy: false,
            relay: RelaySettings::default(),
        }
    }
}

/// Credentials for the message transport.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransportCredentials {
    /// Bot token
    pub token: String,
    /// Subscriber seeded into the registry at relay start
    pub default_chat_id: SubscriberId,
    /// SOCKS proxy host
    #[serde(default)]
    pub proxy_host: Option<String>,
    /// SOCKS proxy port
    #[serde(default)]
    pub proxy_port: Option<u16>,
}

impl TransportCredentials {
    /// Create credentials without a proxy.
    pub fn new(token: &str, default_chat_id: impl Into<SubscriberId>) -> Self {
        Self {
            token: token.to_string(),
            default_chat_id: default_chat_id.into(),
            proxy_host: None,
            proxy_port: None,
        }
    }

    /// Set the SOCKS proxy endpoint.
    pub fn with_proxy(mut self, host: &str, port: u16) -> Self {
        self.proxy_host = Some(host.to_string());
        self.proxy_port = Some(port);
        self
    }

    /// `socks5://host:port`, when both parts are present.
    pub fn proxy_url(&self) -> Option<String> {
        match (&self.proxy_host, self.proxy_port) {
            (Some(host), Some(port)) => Some(format!("socks5://{}:{}", host, port)),
            _ => None,
        }
    }
}

/// Timing settings for the broadcast relay.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaySettings {
    /// Upper bound for a single outbound send
    pub send_timeout_ms: u64,
    /// Long-poll timeout passed to the transport
    pub poll_timeout_secs: u64,
    /// Pause after a failed poll
    pub poll_backoff_ms: u64,
}

impl RelaySettings {
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }

    pub fn poll_backoff(&self) -> Duration {
        Duration::from_millis(self.poll_backoff_ms)
    }
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            send_timeout_ms: 5_000,
            poll_timeout_secs: 30,
            poll_backoff_ms: 1_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ObserverConfig::default();
        assert!(config.restore_path.is_none());
        assert_eq!(config.lookahead_depth, 10);
        assert!(config.transport.is_none());
        assert!(!config.use_proxy);
        assert_eq!(config.relay.send_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_from_json_defaults() {
        let config = ObserverConfig::from_json(r#"{"restore_path": "/data/feed"}"#).unwrap();
        assert_eq!(config.restore_path, Some(PathBuf::from("/data/feed")));
        assert_eq!(config.lookahead_depth, DEFAULT_LOOKAHEAD_DEPTH);
        assert_eq!(config.relay, RelaySettings::default());
    }

    #[test]
    fn test_from_json_with_transport() {
        let json = r#"{
            "lookahead_depth": 4,
            "use_proxy": true,
            "transport": {
                "token": "123:abc",
                "default_chat_id": 555,
                "proxy_host": "10.0.0.1",
                "proxy_port": 1080
            }
        }"#;
        let config = ObserverConfig::from_json(json).unwrap();
        assert_eq!(config.lookahead_depth, 4);
        assert_eq!(config.credentials().unwrap().default_chat_id, SubscriberId(555));
        assert_eq!(config.proxy_url().as_deref(), Some("socks5://10.0.0.1:1080"));
    }

    #[test]
    fn test_proxy_requires_endpoint() {
        let mut config = ObserverConfig::default().with_transport(TransportCredentials::new("t", SubscriberId(1)));
        config.use_proxy = true;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_proxy_requires_transport() {
        let config = ObserverConfig {
            use_proxy: true,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::MissingTransportConfig)));
    }

    #[test]
    fn test_proxy_url_ignored_without_flag() {
        let config = ObserverConfig::default()
            .with_transport(TransportCredentials::new("t", SubscriberId(1)).with_proxy("localhost", 9050));
        assert!(config.proxy_url().is_none());
    }

    #[test]
    fn test_empty_token_rejected() {
        let config = ObserverConfig::default().with_transport(TransportCredentials::new("  ", SubscriberId(1)));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_credentials() {
        let config = ObserverConfig::default();
        assert!(matches!(config.credentials(), Err(Error::MissingTransportConfig)));
    }
}
