//! Session configuration
//!
//! Serde-derived so deployments can carry the adapter endpoint and timeout
//! tuning in a JSON config file; every field except the host defaults to a
//! sensible value.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::frame::RecoveryStrategy;
use crate::DEFAULT_TCP_PORT;

/// Connection parameters for one GivEnergy data adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GivEnergyConfig {
    /// Adapter hostname or IP address
    pub host: String,

    /// Adapter TCP port
    #[serde(default = "default_port")]
    pub port: u16,

    /// TCP connect timeout in milliseconds
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Per-frame read timeout in milliseconds
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// Frame write timeout in milliseconds
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,

    /// Decoder policy when the byte stream loses frame alignment
    #[serde(default)]
    pub recovery: RecoveryStrategy,
}

fn default_port() -> u16 {
    DEFAULT_TCP_PORT
}

fn default_connect_timeout_ms() -> u64 {
    5000
}

fn default_read_timeout_ms() -> u64 {
    10000
}

fn default_write_timeout_ms() -> u64 {
    5000
}

impl GivEnergyConfig {
    /// Config for `host` with every other field at its default
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: default_port(),
            connect_timeout_ms: default_connect_timeout_ms(),
            read_timeout_ms: default_read_timeout_ms(),
            write_timeout_ms: default_write_timeout_ms(),
            recovery: RecoveryStrategy::default(),
        }
    }

    /// `host:port` endpoint string
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Connect timeout as a [`Duration`]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Read timeout as a [`Duration`]
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Write timeout as a [`Duration`]
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GivEnergyConfig::new("inverter.local");
        assert_eq!(config.port, 8899);
        assert_eq!(config.endpoint(), "inverter.local:8899");
        assert_eq!(config.connect_timeout(), Duration::from_millis(5000));
        assert_eq!(config.read_timeout(), Duration::from_millis(10000));
        assert_eq!(config.write_timeout(), Duration::from_millis(5000));
        assert_eq!(config.recovery, RecoveryStrategy::Terminate);
    }

    #[test]
    fn test_deserialize_with_partial_fields() {
        let config: GivEnergyConfig =
            serde_json::from_str(r#"{"host": "192.168.1.60"}"#).unwrap();
        assert_eq!(config.host, "192.168.1.60");
        assert_eq!(config.port, 8899);
        assert_eq!(config.write_timeout_ms, 5000);

        let config: GivEnergyConfig = serde_json::from_str(
            r#"{"host": "192.168.1.60", "port": 502, "recovery": "scan_resync"}"#,
        )
        .unwrap();
        assert_eq!(config.port, 502);
        assert_eq!(config.recovery, RecoveryStrategy::ScanResync);
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = GivEnergyConfig::new("10.0.0.5");
        let json = serde_json::to_string(&config).unwrap();
        let back: GivEnergyConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
