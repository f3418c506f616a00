//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, body limit > 0)
//! - Check addresses parse and serializer names are known
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ConnectorServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ConnectorServerConfig;
use crate::serializers::serializer_by_name;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field} must be greater than zero")]
    MustBePositive { field: &'static str },

    #[error("connector.serializers: unknown serializer {0:?}")]
    UnknownSerializer(String),

    #[error("observability.log_level: unknown level {0:?}")]
    UnknownLogLevel(String),
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

pub fn validate_config(config: &ConnectorServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::MustBePositive {
            field: "timeouts.request_secs",
        });
    }

    if config.limits.max_body_size == 0 {
        errors.push(ValidationError::MustBePositive {
            field: "limits.max_body_size",
        });
    }

    if let Some(names) = &config.connector.serializers {
        for name in names {
            if serializer_by_name(name).is_none() {
                errors.push(ValidationError::UnknownSerializer(name.clone()));
            }
        }
    }

    if !LOG_LEVELS.contains(&config.observability.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::UnknownLogLevel(config.observability.log_level.clone()));
    }

    if config.observability.metrics_enabled && config.observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ConnectorServerConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = ConnectorServerConfig::default();
        config.listener.bind_address = "nope".to_string();
        config.timeouts.request_secs = 0;
        config.connector.serializers = Some(vec!["json".to_string(), "yaml".to_string()]);

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(&ValidationError::UnknownSerializer("yaml".to_string())));
    }
}
