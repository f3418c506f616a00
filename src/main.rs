//! HTTP command connector server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server (axum, limits, timeout, request id)
//!                        │
//!                        ▼
//!                     connector::CommandConnector::run
//!                        │  routing::Action
//!                        │  request mutators → transformers → auth → cast
//!                        ▼
//!                     Command::execute
//!                        │
//!                        ▼
//!                     serializers → response mutators → encoders
//!     Client Response    │
//!     ◀──────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use serde_json::Value;
use tokio::net::TcpListener;

use http_command_connector::command::{Attributes, ErrorCategory, PossibleError, TypeDeclaration};
use http_command_connector::config::{self, ConnectorServerConfig};
use http_command_connector::observability::{logging, metrics};
use http_command_connector::{
    Command, CommandConnector, CommandError, Data, ErrorCollection, ExecutionContext, HttpServer, Inputs,
};

#[derive(Parser, Debug)]
#[command(version, about = "Expose commands over HTTP")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address
    #[arg(short, long)]
    bind: Option<SocketAddr>,
}

/// `base ** exponent`, the demo command.
struct ComputeExponential;

impl Command for ComputeExponential {
    fn name(&self) -> &str {
        "ComputeExponential"
    }

    fn description(&self) -> Option<&str> {
        Some("Raises base to exponent")
    }

    fn inputs_type(&self) -> TypeDeclaration {
        TypeDeclaration::Attributes(
            Attributes::new()
                .required_attribute("base", TypeDeclaration::Integer)
                .required_attribute("exponent", TypeDeclaration::Integer),
        )
    }

    fn result_type(&self) -> TypeDeclaration {
        TypeDeclaration::Integer
    }

    fn possible_errors(&self) -> Vec<PossibleError> {
        vec![PossibleError::new(ErrorCategory::Runtime, "overflow")]
    }

    fn execute(&self, inputs: &Inputs, _context: &ExecutionContext<'_>) -> Result<Data, ErrorCollection> {
        let base = inputs.get("base").and_then(Value::as_i64).unwrap_or_default();
        let exponent = inputs.get("exponent").and_then(Value::as_i64).unwrap_or_default();
        u32::try_from(exponent)
            .ok()
            .and_then(|exponent| base.checked_pow(exponent))
            .map(Data::from)
            .ok_or_else(|| CommandError::runtime("overflow", "Result does not fit in a 64-bit integer").into())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => ConnectorServerConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind.to_string();
    }

    logging::init(&config.observability);
    tracing::info!("http-command-connector v{} starting", env!("CARGO_PKG_VERSION"));

    let mut connector = CommandConnector::builder()
        .config(&config.connector)
        .response_headers(config::response_header_config(&config))
        .build();
    connector.connect_command(Arc::new(ComputeExponential))?;

    tracing::info!(
        bind_address = %config.listener.bind_address,
        prefix = ?connector.prefix(),
        commands = connector.registry().len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(config, Arc::new(connector));
    server.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
