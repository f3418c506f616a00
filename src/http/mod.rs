//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, body limit, timeout, request ID, tracing)
//!     → request.rs (listener-neutral Request: path, method, headers,
//!       query string, body, cookies, prefix)
//!     → CommandConnector::run
//!     → response.rs (status, headers, cookies, encoded body)
//!     → cookie.rs (Set-Cookie rendering)
//!     → Send to client
//! ```
//!
//! # Design Decisions
//! - `Request`/`Response` do not depend on axum types beyond `StatusCode`, so the
//!   connector can be driven from tests or another listener
//! - Static response headers (headers.rs) are resolved once at startup

pub mod cookie;
pub mod headers;
pub mod request;
pub mod response;
pub mod server;

pub use cookie::{parse_cookie_header, Cookie, CookieError, CookieOptions, SameSite};
pub use headers::{CorsSettings, ResponseHeaderConfig};
pub use request::{normalize_prefix, prefix_from_segments, Request};
pub use response::Response;
pub use server::HttpServer;
