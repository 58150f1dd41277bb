//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::Duration;

/// Root configuration for the client.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ClientConfig {
    /// Monitored endpoint definitions.
    pub endpoints: Vec<EndpointConfig>,

    /// Request connector settings.
    pub connector: ConnectorConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// One logical server and the health-check settings applied to each of
/// its resolved addresses.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Endpoint identifier for logging/metrics.
    pub name: String,

    /// Logical hostname, used in the URI and the Host header.
    pub hostname: String,

    /// Port the health URI points at.
    pub port: u16,

    /// Path probed by health checks (e.g., "/health").
    pub health_path: String,

    /// URI scheme of the health URI.
    pub scheme: String,

    /// Read timeout in milliseconds. Negative means no timeout.
    pub read_timeout_ms: i64,

    /// Health check period in seconds. Zero means a single check.
    pub check_interval_secs: u64,

    /// Resolved addresses of the hostname, one monitor each.
    pub addresses: Vec<IpAddr>,
}

impl EndpointConfig {
    /// Create a configuration for `hostname` with default settings.
    pub fn new(hostname: impl Into<String>) -> Self {
        let hostname = hostname.into();
        Self {
            name: hostname.clone(),
            hostname,
            ..Self::default()
        }
    }

    /// Read timeout attached to probes, if any.
    pub fn read_timeout(&self) -> Option<Duration> {
        u64::try_from(self.read_timeout_ms)
            .ok()
            .map(Duration::from_millis)
    }

    /// Probe period, or `None` in one-shot mode.
    pub fn check_interval(&self) -> Option<Duration> {
        (self.check_interval_secs > 0).then(|| Duration::from_secs(self.check_interval_secs))
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            hostname: String::new(),
            port: 443,
            health_path: "/health".to_string(),
            scheme: "https".to_string(),
            read_timeout_ms: -1,
            check_interval_secs: 0,
            addresses: Vec::new(),
        }
    }
}

/// Request connector configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConnectorConfig {
    /// Capacity of the in-memory pipe used for streamed request bodies.
    pub pipe_buffer_bytes: usize,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            pipe_buffer_bytes: 8 * 1024,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,

    /// Interval between health summaries logged by the daemon.
    pub report_interval_secs: u64,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
            report_interval_secs: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_defaults_from_toml() {
        let config: ClientConfig = toml::from_str(
            r#"
            [[endpoints]]
            name = "api"
            hostname = "api.example.com"
            addresses = ["10.0.0.5", "10.0.0.6"]
            "#,
        )
        .unwrap();

        let endpoint = &config.endpoints[0];
        assert_eq!(endpoint.port, 443);
        assert_eq!(endpoint.health_path, "/health");
        assert_eq!(endpoint.scheme, "https");
        assert_eq!(endpoint.read_timeout(), None);
        assert_eq!(endpoint.check_interval(), None);
        assert_eq!(endpoint.addresses.len(), 2);
        assert_eq!(config.connector.pipe_buffer_bytes, 8 * 1024);
    }

    #[test]
    fn test_read_timeout_zero_is_kept() {
        let mut endpoint = EndpointConfig::new("api.example.com");
        endpoint.read_timeout_ms = 0;
        assert_eq!(endpoint.read_timeout(), Some(Duration::ZERO));

        endpoint.read_timeout_ms = 250;
        assert_eq!(endpoint.read_timeout(), Some(Duration::from_millis(250)));
    }
}
