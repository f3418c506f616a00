//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with a catch-all handler
//! - Wire up middleware (body limit, timeout, request ID, tracing)
//! - Bind server to listener
//! - Adapt axum requests into connector [`Request`]s and back

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    extract::{ConnectInfo, DefaultBodyLimit, State},
    http::{header, uri::Authority, HeaderName, HeaderValue, Request as HttpRequest, StatusCode},
    response::{IntoResponse, Response as HttpResponse},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ConnectorServerConfig;
use crate::connector::CommandConnector;
use crate::http::{parse_cookie_header, Request};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub connector: Arc<CommandConnector>,
    pub max_body_size: usize,
}

/// Owned result of a connector run, ready to leave the blocking pool.
#[derive(Debug)]
struct Rendered {
    status: StatusCode,
    headers: Vec<(String, String)>,
    set_cookies: Vec<String>,
    body: String,
}

/// HTTP server exposing a [`CommandConnector`].
pub struct HttpServer {
    router: Router,
    config: ConnectorServerConfig,
}

impl HttpServer {
    pub fn new(config: ConnectorServerConfig, connector: Arc<CommandConnector>) -> Self {
        let state = AppState {
            connector,
            max_body_size: config.limits.max_body_size,
        };
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ConnectorServerConfig, state: AppState) -> Router {
        let max_body_size = state.max_body_size;
        Router::new()
            .route("/{*path}", any(connector_handler))
            .route("/", any(connector_handler))
            .with_state(state)
            .layer(DefaultBodyLimit::max(max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The configured router, for driving the server without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &ConnectorServerConfig {
        &self.config
    }
}

async fn connector_handler(State(state): State<AppState>, request: HttpRequest<Body>) -> HttpResponse {
    let remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let (parts, body) = request.into_parts();

    let body = match to_bytes(body, state.max_body_size).await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read request body");
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
    };

    let mut request = Request::new(parts.uri.path())
        .with_method(parts.method.as_str())
        .with_query_string(parts.uri.query().unwrap_or_default())
        .with_body(body);

    for (name, value) in &parts.headers {
        if let Ok(value) = value.to_str() {
            request = request.with_header(name.as_str(), value);
        }
    }
    let cookie_headers = parts.headers.get_all(header::COOKIE).iter().filter_map(|v| v.to_str().ok());
    request = request.with_cookies(parse_cookie_header(cookie_headers));
    if let Some(scheme) = parts.uri.scheme_str() {
        request = request.with_scheme(scheme);
    }
    if let Some((name, port)) = parts
        .headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .and_then(split_host)
    {
        request = request.with_host(name);
        if let Some(port) = port {
            request = request.with_port(port);
        }
    }
    if let Some(addr) = remote {
        request = request.with_remote_ip(addr.ip().to_string());
    }

    let connector = Arc::clone(&state.connector);
    let rendered = tokio::task::spawn_blocking(move || {
        let response = connector.run(&mut request);
        Rendered {
            status: response.status(),
            headers: response
                .headers()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            set_cookies: response.cookies().iter().map(|c| c.to_set_cookie_header()).collect(),
            body: response.body_text(),
        }
    })
    .await;

    match rendered {
        Ok(rendered) => into_http_response(rendered),
        Err(e) => {
            tracing::error!(error = %e, "Connector task failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
        }
    }
}

/// Split a `Host` header into name and port. IPv6 literals keep their brackets.
fn split_host(host: &str) -> Option<(String, Option<u16>)> {
    let authority: Authority = host.parse().ok()?;
    Some((authority.host().to_string(), authority.port_u16()))
}

fn into_http_response(rendered: Rendered) -> HttpResponse {
    let mut response = HttpResponse::new(Body::from(rendered.body));
    *response.status_mut() = rendered.status;

    let headers = response.headers_mut();
    for (name, value) in rendered.headers {
        match (HeaderName::try_from(name.as_str()), HeaderValue::try_from(value.as_str())) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => tracing::warn!(header = %name, "Dropping invalid response header"),
        }
    }
    for cookie in rendered.set_cookies {
        match HeaderValue::try_from(cookie) {
            Ok(value) => {
                headers.append(header::SET_COOKIE, value);
            }
            Err(e) => tracing::warn!(error = %e, "Dropping invalid cookie"),
        }
    }
    response
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_host() {
        assert_eq!(split_host("example.com"), Some(("example.com".to_string(), None)));
        assert_eq!(split_host("example.com:8080"), Some(("example.com".to_string(), Some(8080))));
        assert_eq!(split_host("[::1]"), Some(("[::1]".to_string(), None)));
        assert_eq!(split_host("[::1]:3000"), Some(("[::1]".to_string(), Some(3000))));
        assert_eq!(split_host("bad host"), None);
    }
}
