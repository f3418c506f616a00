//! Request and response mutators wired through a connector.

use std::sync::Arc;

use serde_json::json;

use http_command_connector::command::{Attributes, TypeDeclaration};
use http_command_connector::connector::{CommandConnector, ConnectOptions};
use http_command_connector::http::CookieOptions;
use http_command_connector::mutators::{
    InputFn, MoveAttributeToCookie, MoveAttributeToHeader, SetHeader, SetInputFromCookie, SetInputFromHeader,
    SetInputToProcResult,
};

mod common;

use common::{call, get, EchoInputs};

fn session_connector() -> CommandConnector {
    let inputs = Attributes::new()
        .required_attribute("name", TypeDeclaration::String)
        .attribute("token", TypeDeclaration::String)
        .attribute("theme", TypeDeclaration::String);

    let mut connector = CommandConnector::new();
    connector
        .connect(
            Arc::new(EchoInputs::new("Session", inputs)),
            ConnectOptions::new()
                .request_mutator(SetInputFromHeader::new("token").with_header_name("X-Token"))
                .request_mutator(SetInputFromCookie::new("theme")),
        )
        .unwrap();
    connector
}

fn login_connector() -> CommandConnector {
    let inputs = Attributes::new()
        .required_attribute("name", TypeDeclaration::String)
        .required_attribute("session", TypeDeclaration::String)
        .attribute("role", TypeDeclaration::String);
    let cookie_options = CookieOptions {
        path: Some("/".to_string()),
        httponly: true,
        ..CookieOptions::default()
    };

    let mut connector = CommandConnector::new();
    connector
        .connect(
            Arc::new(EchoInputs::new("Login", inputs)),
            ConnectOptions::new()
                .response_mutator(MoveAttributeToCookie::new("session").with_options(cookie_options))
                .response_mutator(MoveAttributeToHeader::new("name").with_header_name("X-Name"))
                .response_mutator(SetHeader::new("X-Served-By", "connector")),
        )
        .unwrap();
    connector
}

#[test]
fn test_header_and_cookie_become_inputs() {
    let connector = session_connector();
    let request = get("/run/Session", "name=ada")
        .with_header("X-Token", "abc")
        .with_cookie("theme", "dark");

    let reply = call(&connector, request);
    assert_eq!(reply.status, 200);
    assert_eq!(reply.json(), json!({ "name": "ada", "token": "abc", "theme": "dark" }));
}

#[test]
fn test_missing_header_and_cookie_set_null() {
    let connector = session_connector();

    let reply = call(&connector, get("/run/Session", "name=ada"));
    assert_eq!(reply.status, 200);
    assert_eq!(reply.json(), json!({ "name": "ada", "token": null, "theme": null }));
}

#[test]
fn test_request_mutators_hide_attributes_from_manifest() {
    let connector = session_connector();
    let manifest = connector.manifest().into_value();
    let inputs = &manifest["command"]["Session"]["inputs_type"];

    let names: Vec<&String> = inputs["element_type_declarations"].as_object().unwrap().keys().collect();
    assert_eq!(names, vec!["name"]);
}

#[test]
fn test_response_mutators_move_attributes() {
    let connector = login_connector();

    let reply = call(&connector, get("/run/Login", "name=ada&session=s3cr3t&role=admin"));
    assert_eq!(reply.status, 200);
    assert_eq!(reply.json(), json!({ "role": "admin" }));
    assert_eq!(reply.set_cookies, vec!["session=s3cr3t; HttpOnly; Path=/".to_string()]);
    assert_eq!(reply.header("x-name"), Some("ada"));
    assert_eq!(reply.header("x-served-by"), Some("connector"));
}

#[test]
fn test_response_mutators_skip_failures() {
    let connector = login_connector();

    let reply = call(&connector, get("/run/Login", "name=ada"));
    assert_eq!(reply.status, 422);
    assert!(reply.set_cookies.is_empty());
    assert_eq!(reply.header("x-name"), None);
    assert_eq!(reply.header("x-served-by"), Some("connector"));
    assert!(reply.json().get("data.session.missing_required_attribute").is_some());
}

#[test]
fn test_response_mutators_hide_attributes_from_manifest() {
    let connector = login_connector();
    let manifest = connector.manifest().into_value();
    let result = &manifest["command"]["Login"]["result_type"];

    let names: Vec<&String> = result["element_type_declarations"].as_object().unwrap().keys().collect();
    assert_eq!(names, vec!["role"]);
}

#[test]
fn test_cookie_value_cannot_inject_attributes() {
    let connector = login_connector();
    let query = "name=ada&session=abc%3B%20Domain%3Devil.example%3B%20Max-Age%3D99999999";

    let reply = call(&connector, get("/run/Login", query));
    assert_eq!(reply.status, 200);
    assert_eq!(reply.set_cookies.len(), 1);
    let set_cookie = &reply.set_cookies[0];
    assert!(set_cookie.starts_with("session=abc%3B"));
    assert!(!set_cookie.contains("Domain="));
    assert!(!set_cookie.contains("Max-Age="));
}

#[test]
fn test_computed_input_round_trips_through_cookie() {
    let inputs = Attributes::new()
        .required_attribute("foo", TypeDeclaration::String)
        .attribute("bar", TypeDeclaration::String);
    let mut connector = CommandConnector::new();
    connector
        .connect(
            Arc::new(EchoInputs::new("RoundTrip", inputs)),
            ConnectOptions::new()
                .request_mutator(SetInputToProcResult::new("foo", InputFn::new(|_| json!("Fooooooo"))))
                .response_mutator(MoveAttributeToCookie::new("foo")),
        )
        .unwrap();

    let reply = call(&connector, get("/run/RoundTrip", "foo=caller&bar=baz"));
    assert_eq!(reply.status, 200);
    assert_eq!(reply.json(), json!({ "bar": "baz" }));
    assert_eq!(reply.set_cookies, vec!["foo=Fooooooo".to_string()]);

    let manifest = connector.manifest().into_value();
    let entry = &manifest["command"]["RoundTrip"];
    for section in ["inputs_type", "result_type"] {
        let names: Vec<&String> = entry[section]["element_type_declarations"].as_object().unwrap().keys().collect();
        assert_eq!(names, vec!["bar"], "{section}");
    }
}
