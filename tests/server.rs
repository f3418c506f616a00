//! The axum adapter, driven in-process and over a real socket.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use http_body_util::BodyExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tower::ServiceExt;

use http_command_connector::command::{Attributes, TypeDeclaration};
use http_command_connector::config::ConnectorServerConfig;
use http_command_connector::connector::{CommandConnector, ConnectOptions};
use http_command_connector::http::{CookieOptions, ResponseHeaderConfig};
use http_command_connector::mutators::{MoveAttributeToCookie, SetInputFromCookie};
use http_command_connector::HttpServer;

mod common;

use common::{ComputeExponential, EchoInputs};

fn server() -> HttpServer {
    let headers = ResponseHeaderConfig::from_vars([("HTTP_CONNECTOR_RESPONSE_HEADER_X_FRAME_OPTIONS", "DENY")]);
    let mut connector = CommandConnector::builder().prefix("/api").response_headers(headers).build();
    connector.connect_command(Arc::new(ComputeExponential)).unwrap();

    let inputs = Attributes::new()
        .attribute("theme", TypeDeclaration::String)
        .attribute("session", TypeDeclaration::String);
    connector
        .connect(
            Arc::new(EchoInputs::new("Session", inputs)),
            ConnectOptions::new()
                .request_mutator(SetInputFromCookie::new("theme"))
                .response_mutator(MoveAttributeToCookie::new("session").with_options(CookieOptions {
                    path: Some("/".to_string()),
                    ..CookieOptions::default()
                })),
        )
        .unwrap();

    HttpServer::new(ConnectorServerConfig::default(), Arc::new(connector))
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_get_runs_command() {
    let app = server().router();
    let request = Request::builder()
        .uri("/api/run/ComputeExponential?base=2&exponent=10")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    assert_eq!(response.headers()["x-frame-options"], "DENY");
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(body_text(response).await, "1024");
}

#[tokio::test]
async fn test_post_body_and_errors() {
    let app = server().router();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/run/ComputeExponential")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"base": 3, "exponent": "x"}"#))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert!(body.get("data.exponent.cannot_cast").is_some());
}

#[tokio::test]
async fn test_cookies_in_and_out() {
    let app = server().router();
    let request = Request::builder()
        .uri("/api/run/Session?session=abc")
        .header(header::COOKIE, "theme=dark; other=1")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::SET_COOKIE], "session=abc; Path=/");
    assert_eq!(body_text(response).await, r#"{"theme":"dark"}"#);
}

#[tokio::test]
async fn test_unknown_command_is_404() {
    let app = server().router();
    let request = Request::builder().uri("/api/run/Missing").body(Body::empty()).unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_serves_over_tcp() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server().run(listener));

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /api/run/ComputeExponential?base=5&exponent=2 HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();

    let mut raw = String::new();
    stream.read_to_string(&mut raw).await.unwrap();
    assert!(raw.starts_with("HTTP/1.1 200 OK"));
    assert!(raw.ends_with("25"));
}
