//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the connector
//! server. All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ConnectorServerConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Connector behaviour shared by every connected command.
    pub connector: ConnectorConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request size limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Static response headers, keyed like the
    /// `HTTP_CONNECTOR_RESPONSE_HEADER_*` environment variables minus the
    /// prefix (e.g. `ACCESS_CONTROL_ALLOW_ORIGIN = "*"`).
    pub response_headers: BTreeMap<String, String>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConnectorConfig {
    /// Path prefix stripped before routing (e.g. "/api").
    pub prefix: Option<String>,

    /// Convert panics inside commands into `runtime.unknown` errors.
    pub capture_unknown_error: bool,

    /// Default serializer chain by name; `None` keeps errors, atomic, json.
    pub serializers: Option<Vec<String>>,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            prefix: None,
            capture_unknown_error: true,
            serializers: None,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_size: 1024 * 1024,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: ConnectorServerConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert!(config.connector.capture_unknown_error);
        assert_eq!(config.observability.log_format, LogFormat::Pretty);
        assert!(config.response_headers.is_empty());
    }

    #[test]
    fn test_parse_full_config() {
        let config: ConnectorServerConfig = toml::from_str(
            r#"
            [listener]
            bind_address = "127.0.0.1:9000"

            [connector]
            prefix = "/api"
            capture_unknown_error = false
            serializers = ["errors", "aggregate", "json"]

            [observability]
            log_format = "json"

            [response_headers]
            ACCESS_CONTROL_ALLOW_ORIGIN = "*"
            "#,
        )
        .unwrap();

        assert_eq!(config.connector.prefix.as_deref(), Some("/api"));
        assert!(!config.connector.capture_unknown_error);
        assert_eq!(config.connector.serializers.unwrap().len(), 3);
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.response_headers["ACCESS_CONTROL_ALLOW_ORIGIN"], "*");
    }
}
