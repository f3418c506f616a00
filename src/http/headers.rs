//! Static response headers and CORS settings.
//!
//! Derived once at configuration load from environment-style keys
//! (`HTTP_CONNECTOR_RESPONSE_HEADER_ACCESS_CONTROL_ALLOW_ORIGIN=*`) and shared
//! read-only afterwards. Nothing here reads the process environment per
//! request.

use std::collections::BTreeMap;

/// Recognized key prefix.
pub const RESPONSE_HEADER_PREFIX: &str = "HTTP_CONNECTOR_RESPONSE_HEADER_";

pub const ALLOW_METHODS: &str = "access-control-allow-methods";
pub const ALLOW_HEADERS: &str = "access-control-allow-headers";
pub const MAX_AGE: &str = "access-control-max-age";
pub const REQUEST_HEADERS: &str = "access-control-request-headers";

/// Values consumed by the OPTIONS handler instead of being sent on every
/// response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorsSettings {
    pub allow_methods: Option<String>,
    /// `*` echoes the request's `access-control-request-headers`.
    pub allow_headers: Option<String>,
    pub max_age: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseHeaderConfig {
    static_headers: BTreeMap<String, String>,
    cors: CorsSettings,
}

/// `ACCESS_CONTROL_ALLOW_ORIGIN` → `access-control-allow-origin`.
pub fn header_name_from_key(key: &str) -> String {
    key.to_ascii_lowercase().replace('_', "-")
}

impl ResponseHeaderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(key, value)` pairs. Keys without the recognized prefix
    /// are ignored.
    pub fn from_vars<K, V, I>(vars: I) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut config = Self::default();
        for (key, value) in vars {
            if let Some(suffix) = key.as_ref().strip_prefix(RESPONSE_HEADER_PREFIX) {
                if !suffix.is_empty() {
                    config.insert(&header_name_from_key(suffix), value.into());
                }
            }
        }
        config
    }

    /// Snapshot of the current process environment.
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Add a header by its final name. Reserved CORS names go to
    /// [`CorsSettings`].
    pub fn insert(&mut self, name: &str, value: String) {
        let name = name.to_ascii_lowercase();
        match name.as_str() {
            ALLOW_METHODS => self.cors.allow_methods = Some(value),
            ALLOW_HEADERS => self.cors.allow_headers = Some(value),
            MAX_AGE => self.cors.max_age = Some(value),
            _ => {
                self.static_headers.insert(name, value);
            }
        }
    }

    /// Later entries win.
    pub fn merge(&mut self, other: ResponseHeaderConfig) {
        self.static_headers.extend(other.static_headers);
        if other.cors.allow_methods.is_some() {
            self.cors.allow_methods = other.cors.allow_methods;
        }
        if other.cors.allow_headers.is_some() {
            self.cors.allow_headers = other.cors.allow_headers;
        }
        if other.cors.max_age.is_some() {
            self.cors.max_age = other.cors.max_age;
        }
    }

    pub fn static_headers(&self) -> &BTreeMap<String, String> {
        &self.static_headers
    }

    pub fn cors(&self) -> &CorsSettings {
        &self.cors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vars() {
        let config = ResponseHeaderConfig::from_vars([
            ("HTTP_CONNECTOR_RESPONSE_HEADER_ACCESS_CONTROL_ALLOW_ORIGIN", "*"),
            ("HTTP_CONNECTOR_RESPONSE_HEADER_X_FRAME_OPTIONS", "DENY"),
            ("HTTP_CONNECTOR_RESPONSE_HEADER_ACCESS_CONTROL_ALLOW_METHODS", "GET,POST"),
            ("HTTP_CONNECTOR_RESPONSE_HEADER_ACCESS_CONTROL_ALLOW_HEADERS", "*"),
            ("HTTP_CONNECTOR_RESPONSE_HEADER_ACCESS_CONTROL_MAX_AGE", "3600"),
            ("PATH", "/usr/bin"),
        ]);

        assert_eq!(config.static_headers().len(), 2);
        assert_eq!(config.static_headers()["access-control-allow-origin"], "*");
        assert_eq!(config.static_headers()["x-frame-options"], "DENY");
        assert_eq!(config.cors().allow_methods.as_deref(), Some("GET,POST"));
        assert_eq!(config.cors().allow_headers.as_deref(), Some("*"));
        assert_eq!(config.cors().max_age.as_deref(), Some("3600"));
    }

    #[test]
    fn test_merge_later_wins() {
        let mut base = ResponseHeaderConfig::from_vars([("HTTP_CONNECTOR_RESPONSE_HEADER_X_A", "1")]);
        base.merge(ResponseHeaderConfig::from_vars([("HTTP_CONNECTOR_RESPONSE_HEADER_X_A", "2")]));
        assert_eq!(base.static_headers()["x-a"], "2");
    }
}
