//! Outbound response.
//!
//! Created once after command execution, shaped by response mutators, then
//! its body is encoded. Borrows the originating request for context.

use std::collections::BTreeMap;

use axum::http::StatusCode;
use serde_json::Value;

use crate::command::Data;
use crate::http::{Cookie, Request};
use crate::serializers::Payload;

#[derive(Debug)]
pub struct Response<'r> {
    status: StatusCode,
    headers: BTreeMap<String, String>,
    body: Payload,
    cookies: Vec<Cookie>,
    request: &'r Request,
    success: bool,
}

impl<'r> Response<'r> {
    pub fn new(status: StatusCode, body: Payload, request: &'r Request, success: bool) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body,
            cookies: Vec::new(),
            request,
            success,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Whether the command succeeded.
    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn request(&self) -> &'r Request {
        self.request
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn add_header(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.headers.insert(name.as_ref().to_ascii_lowercase(), value.into());
    }

    pub fn cookies(&self) -> &[Cookie] {
        &self.cookies
    }

    pub fn add_cookie(&mut self, cookie: Cookie) {
        self.cookies.push(cookie);
    }

    pub fn body(&self) -> &Payload {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut Payload {
        &mut self.body
    }

    pub fn set_body(&mut self, body: Payload) {
        self.body = body;
    }

    /// Remove a top-level attribute from a record-shaped result.
    pub fn take_attribute(&mut self, name: &str) -> Option<Value> {
        match &mut self.body {
            Payload::Structured(Value::Object(map)) => map.remove(name),
            Payload::Result(Data::Record(record)) => record.remove(name).map(|d| d.to_plain_json()),
            Payload::Result(Data::Entity(entity)) => entity
                .attributes_mut()
                .and_then(|attributes| attributes.remove(name))
                .map(|d| d.to_plain_json()),
            _ => None,
        }
    }

    /// The wire body. Unencoded payloads fall back to compact JSON.
    pub fn body_text(&self) -> String {
        self.body.to_wire()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_take_attribute_from_structured_body() {
        let request = Request::new("/run/X");
        let mut response = Response::new(
            StatusCode::OK,
            Payload::Structured(json!({"foo": "bar", "baz": 1})),
            &request,
            true,
        );
        assert_eq!(response.take_attribute("foo"), Some(json!("bar")));
        assert_eq!(response.take_attribute("foo"), None);
        assert_eq!(response.body_text(), r#"{"baz":1}"#);
    }

    #[test]
    fn test_headers_lowercased() {
        let request = Request::new("/run/X");
        let mut response = Response::new(StatusCode::OK, Payload::Structured(Value::Null), &request, true);
        response.add_header("X-Custom", "1");
        assert_eq!(response.header("x-custom"), Some("1"));
    }
}
