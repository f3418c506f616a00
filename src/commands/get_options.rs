//! CORS preflight.

use crate::command::{Data, Outcome};
use crate::http::headers::{CorsSettings, ALLOW_HEADERS, ALLOW_METHODS, MAX_AGE, REQUEST_HEADERS};
use crate::http::Request;

/// Copies configured CORS values onto the request's response headers.
///
/// Needs the request mutably, so it is not a [`super::BuiltinCommand`].
#[derive(Debug, Clone, Copy)]
pub struct GetOptions<'a> {
    cors: &'a CorsSettings,
}

impl<'a> GetOptions<'a> {
    pub fn new(cors: &'a CorsSettings) -> Self {
        Self { cors }
    }

    pub fn run(&self, request: &mut Request) -> Outcome {
        if let Some(methods) = &self.cors.allow_methods {
            request.set_response_header(ALLOW_METHODS, methods.clone());
        }

        if let Some(headers) = &self.cors.allow_headers {
            let headers = if headers == "*" {
                request.header(REQUEST_HEADERS).map(str::to_string)
            } else {
                Some(headers.clone())
            };
            if let Some(headers) = headers {
                request.set_response_header(ALLOW_HEADERS, headers);
            }
        }

        if let Some(max_age) = &self.cors.max_age {
            request.set_response_header(MAX_AGE, max_age.clone());
        }

        Outcome::Success(Data::String(String::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_echoes_request_headers() {
        let cors = CorsSettings {
            allow_methods: Some("GET,POST".to_string()),
            allow_headers: Some("*".to_string()),
            max_age: Some("3600".to_string()),
        };
        let mut request = Request::new("/run/X")
            .with_method("OPTIONS")
            .with_header("Access-Control-Request-Headers", "x-custom, content-type");

        assert!(GetOptions::new(&cors).run(&mut request).is_success());
        let headers = request.response_headers();
        assert_eq!(headers[ALLOW_METHODS], "GET,POST");
        assert_eq!(headers[ALLOW_HEADERS], "x-custom, content-type");
        assert_eq!(headers[MAX_AGE], "3600");
    }

    #[test]
    fn test_wildcard_without_request_headers_sets_nothing() {
        let cors = CorsSettings {
            allow_headers: Some("*".to_string()),
            ..CorsSettings::default()
        };
        let mut request = Request::new("/run/X").with_method("OPTIONS");
        GetOptions::new(&cors).run(&mut request);
        assert!(request.response_headers().is_empty());
    }
}
