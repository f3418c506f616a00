//! HTTP command connector library.
//!
//! Exposes typed commands over HTTP: requests are mapped to command
//! invocations and outcomes back to HTTP responses, with request/response
//! mutators, serializers, authorization rules, a manifest and help pages.

pub mod command;
pub mod commands;
pub mod config;
pub mod connector;
pub mod desugarizers;
pub mod http;
pub mod manifest;
pub mod mutators;
pub mod observability;
pub mod persistence;
pub mod routing;
pub mod serializers;

pub use command::{Command, CommandError, Data, ErrorCollection, ExecutionContext, Inputs, Outcome};
pub use config::schema::ConnectorServerConfig;
pub use connector::{CommandConnector, CommandConnectorBuilder, ConnectError, ConnectOptions};
pub use http::{HttpServer, Request, Response};
