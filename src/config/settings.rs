//! Configuration structure for the control plane.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::{Error, Result};

/// Root configuration, assembled from defaults, an optional YAML file, and
/// environment variables (see [`super::load_config`]).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub listeners: ListenerConfig,
    pub dag: DagConfig,
    pub xds: XdsConfig,
    pub debug: DebugConfig,
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        if self.listeners.http_port == self.listeners.https_port {
            return Err(Error::config("http and https listener ports cannot be equal"));
        }
        if self.xds.port == 0 {
            return Err(Error::config("xds port must be nonzero"));
        }
        if self.dag.holdoff_delay_ms > self.dag.holdoff_max_delay_ms {
            return Err(Error::config("holdoff_delay must not exceed holdoff_max_delay"));
        }
        Ok(())
    }
}

/// Bind addresses and behavior of the two primary Envoy listeners.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenerConfig {
    pub http_address: String,
    pub http_port: u16,
    pub https_address: String,
    pub https_port: u16,
    pub use_proxy_proto: bool,
    pub http_access_log: Option<String>,
    pub https_access_log: Option<String>,
    pub minimum_tls_version: TlsVersion,
    pub connection_idle_timeout_secs: u64,
    pub stream_idle_timeout_secs: u64,
    pub max_connection_duration_secs: Option<u64>,
    pub drain_timeout_secs: u64,
    pub fallback_certificate: Option<NamespaceName>,
    pub disable_permit_insecure: bool,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            http_address: "0.0.0.0".to_string(),
            http_port: 8080,
            https_address: "0.0.0.0".to_string(),
            https_port: 8443,
            use_proxy_proto: false,
            http_access_log: Some("/dev/stdout".to_string()),
            https_access_log: Some("/dev/stdout".to_string()),
            minimum_tls_version: TlsVersion::V1_2,
            connection_idle_timeout_secs: 60 * 60,
            stream_idle_timeout_secs: 60 * 5,
            max_connection_duration_secs: None,
            drain_timeout_secs: 60,
            fallback_certificate: None,
            disable_permit_insecure: false,
        }
    }
}

impl ListenerConfig {
    pub fn connection_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_idle_timeout_secs)
    }

    pub fn stream_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.stream_idle_timeout_secs)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
pub enum TlsVersion {
    V1_2,
    V1_3,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceName {
    pub namespace: String,
    pub name: String,
}

/// Coalescer and ingress-class filter settings for the DAG builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DagConfig {
    pub ingress_class: Option<String>,
    pub holdoff_delay_ms: u64,
    pub holdoff_max_delay_ms: u64,
}

impl Default for DagConfig {
    fn default() -> Self {
        Self { ingress_class: None, holdoff_delay_ms: 100, holdoff_max_delay_ms: 500 }
    }
}

impl DagConfig {
    pub fn holdoff_delay(&self) -> Duration {
        Duration::from_millis(self.holdoff_delay_ms)
    }

    pub fn holdoff_max_delay(&self) -> Duration {
        Duration::from_millis(self.holdoff_max_delay_ms)
    }
}

/// Bind address of the xDS gRPC server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XdsConfig {
    pub bind_address: String,
    pub port: u16,
}

impl Default for XdsConfig {
    fn default() -> Self {
        Self { bind_address: "0.0.0.0".to_string(), port: 18000 }
    }
}

impl XdsConfig {
    pub fn socket_addr(&self) -> Result<std::net::SocketAddr> {
        format!("{}:{}", self.bind_address, self.port)
            .parse()
            .map_err(|e| Error::config(format!("invalid xds bind address: {e}")))
    }
}

/// Optional read-only JSON debug surface over the xDS caches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugConfig {
    pub enabled: bool,
    pub bind_address: String,
    pub port: u16,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self { enabled: false, bind_address: "127.0.0.1".to_string(), port: 6060 }
    }
}

impl DebugConfig {
    pub fn socket_addr(&self) -> Result<std::net::SocketAddr> {
        format!("{}:{}", self.bind_address, self.port)
            .parse()
            .map_err(|e| Error::config(format!("invalid debug bind address: {e}")))
    }
}

/// Ambient logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub json_logging: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self { log_level: "info".to_string(), json_logging: false }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_equal_listener_ports() {
        let mut config = AppConfig::default();
        config.listeners.https_port = config.listeners.http_port;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_inverted_holdoff() {
        let mut config = AppConfig::default();
        config.dag.holdoff_delay_ms = 1000;
        config.dag.holdoff_max_delay_ms = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn xds_socket_addr_parses() {
        let config = XdsConfig::default();
        assert!(config.socket_addr().is_ok());
    }
}
