//! Client and pool configuration.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Configuration for the client and its pool.
///
/// Every field has a default, so a JSON document may set only what it needs:
///
/// ```
/// use rkv_client::ClientConfig;
///
/// let config = ClientConfig::from_json(r#"{ "port": 6380, "pool_size": 2 }"#).unwrap();
/// assert_eq!(config.host, "127.0.0.1");
/// assert_eq!(config.port, 6380);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server host name or IP address.
    pub host: String,
    /// Server TCP port.
    pub port: u16,
    /// Number of connections opened up front; the pool never grows.
    pub pool_size: usize,
    /// Upper bound on address resolution plus TCP handshake, in milliseconds.
    pub connection_timeout_ms: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            host: "127.0.0.1".to_string(),
            port: 6379,
            pool_size: 4,
            connection_timeout_ms: None,
        }
    }
}

impl ClientConfig {
    /// Builds a configuration for `host:port` with default pool settings.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        ClientConfig {
            host: host.into(),
            port,
            ..ClientConfig::default()
        }
    }

    /// Parses and validates a JSON document.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: ClientConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid("host must not be empty".to_string()));
        }
        if self.pool_size == 0 {
            return Err(ConfigError::Invalid("pool_size must be at least 1".to_string()));
        }
        if self.connection_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid(
                "connection_timeout_ms must be positive when set".to_string(),
            ));
        }
        Ok(())
    }

    pub fn connection_timeout(&self) -> Option<Duration> {
        self.connection_timeout_ms.map(Duration::from_millis)
    }

    /// `host:port`, as used in log lines and error messages.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let config = ClientConfig::from_json("{}").expect("config");
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.addr(), "127.0.0.1:6379");
        assert_eq!(config.connection_timeout(), None);
    }

    #[test]
    fn parses_all_fields() {
        let config = ClientConfig::from_json(
            r#"{ "host": "cache.local", "port": 7000, "pool_size": 8, "connection_timeout_ms": 250 }"#,
        )
        .expect("config");
        assert_eq!(config.host, "cache.local");
        assert_eq!(config.pool_size, 8);
        assert_eq!(config.connection_timeout(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(
            ClientConfig::from_json(r#"{ "pool_size": 0 }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ClientConfig::from_json(r#"{ "host": " " }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ClientConfig::from_json(r#"{ "connection_timeout_ms": 0 }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ClientConfig::from_json("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = ClientConfig::from_file("/nonexistent/rkv.json").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("/nonexistent/rkv.json"));
    }
}
