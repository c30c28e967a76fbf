//! Runtime configuration, loaded from an optional JSON file.
//!
//! ```json
//! {
//!   "sync": { "bus_url": "ws://127.0.0.1:7878", "connect_attempts": 3 },
//!   "bus":  { "bind_addr": "127.0.0.1:7878" }
//! }
//! ```
//!
//! Every field is optional; missing ones take the defaults below.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Settings of an editor peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// WebSocket URL of the bus daemon
    pub bus_url: String,
    /// Inbound messages buffered between the bus and the coordinator
    pub channel_capacity: usize,
    /// Connection attempts before giving up
    pub connect_attempts: u32,
    /// Delay before the second attempt; doubles after each failure
    pub retry_backoff_ms: u64,
    /// Deadline for connecting and getting the bus's registration reply
    pub handshake_timeout_ms: u64,
    /// Undo steps kept per document
    pub history_limit: usize,
    /// Larger envelope payloads are dropped unread
    pub max_payload_len: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            bus_url: "ws://127.0.0.1:7878".to_string(),
            channel_capacity: 256,
            connect_attempts: 1,
            retry_backoff_ms: 200,
            handshake_timeout_ms: 5000,
            history_limit: 100,
            max_payload_len: 1024 * 1024,
        }
    }
}

/// Settings of the bus daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    pub bind_addr: String,
    /// Messages buffered per endpoint before slow endpoints lose the oldest
    pub broadcast_capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:7878".to_string(),
            broadcast_capacity: 256,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sync: SyncConfig,
    pub bus: BusConfig,
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// `from_file` when a path is given, defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.sync.bus_url, "ws://127.0.0.1:7878");
        assert_eq!(config.sync.channel_capacity, 256);
        assert_eq!(config.sync.connect_attempts, 1);
        assert_eq!(config.sync.history_limit, 100);
        assert_eq!(config.sync.max_payload_len, 1 << 20);
        assert_eq!(config.sync.handshake_timeout_ms, 5000);
        assert_eq!(config.bus.bind_addr, "127.0.0.1:7878");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            Config::from_json(r#"{ "sync": { "connect_attempts": 4 }, "bus": {} }"#).unwrap();
        assert_eq!(config.sync.connect_attempts, 4);
        assert_eq!(config.sync.retry_backoff_ms, 200);
        assert_eq!(config.bus, BusConfig::default());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "bus": {{ "bind_addr": "0.0.0.0:9000" }} }}"#).unwrap();
        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.bus.bind_addr, "0.0.0.0:9000");
        assert_eq!(config.sync, SyncConfig::default());
    }

    #[test]
    fn test_errors() {
        assert!(matches!(Config::from_json("{ nope"), Err(ConfigError::Parse(_))));
        assert!(matches!(
            Config::from_file(Path::new("/nonexistent/quire.json")),
            Err(ConfigError::Io { .. })
        ));
        assert_eq!(Config::load(None).unwrap(), Config::default());
    }
}
