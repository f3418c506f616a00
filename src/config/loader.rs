//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ConnectorServerConfig;
use crate::config::validation::{validate_config, ValidationError};
use crate::http::headers::{ResponseHeaderConfig, RESPONSE_HEADER_PREFIX};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<ConnectorServerConfig, ConfigError> {
    let config: ConnectorServerConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ConnectorServerConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// The `[response_headers]` table overlaid by `HTTP_CONNECTOR_RESPONSE_HEADER_*`
/// environment variables.
pub fn response_header_config(config: &ConnectorServerConfig) -> ResponseHeaderConfig {
    response_header_config_with(config, std::env::vars())
}

pub fn response_header_config_with<I>(config: &ConnectorServerConfig, vars: I) -> ResponseHeaderConfig
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut headers = ResponseHeaderConfig::from_vars(
        config
            .response_headers
            .iter()
            .map(|(key, value)| (format!("{RESPONSE_HEADER_PREFIX}{key}"), value.clone())),
    );
    headers.merge(ResponseHeaderConfig::from_vars(vars));
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_reports_validation() {
        let err = parse_config("[timeouts]\nrequest_secs = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref errors) if errors.len() == 1));
        assert!(err.to_string().contains("timeouts.request_secs"));
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(parse_config("[listener"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_environment_overrides_file_headers() {
        let config = parse_config(
            "[response_headers]\nACCESS_CONTROL_ALLOW_ORIGIN = \"https://a.example\"\nX_FRAME_OPTIONS = \"DENY\"\n",
        )
        .unwrap();
        let vars = vec![(
            "HTTP_CONNECTOR_RESPONSE_HEADER_ACCESS_CONTROL_ALLOW_ORIGIN".to_string(),
            "*".to_string(),
        )];

        let headers = response_header_config_with(&config, vars);
        assert_eq!(headers.static_headers()["access-control-allow-origin"], "*");
        assert_eq!(headers.static_headers()["x-frame-options"], "DENY");
    }
}
