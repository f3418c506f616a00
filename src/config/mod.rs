//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ConnectorServerConfig (validated, immutable)
//!     → CommandConnectorBuilder::config / HttpServer::new
//!
//! HTTP_CONNECTOR_RESPONSE_HEADER_* environment
//!     → loader::response_header_config (overlays [response_headers])
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, response_header_config, ConfigError};
pub use schema::{
    ConnectorConfig, ConnectorServerConfig, LimitsConfig, ListenerConfig, LogFormat, ObservabilityConfig,
    TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
