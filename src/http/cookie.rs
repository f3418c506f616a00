//! Outbound and inbound cookies.

use std::collections::BTreeMap;

use cookie::time::{Duration, OffsetDateTime};
use serde_json::Value;
use thiserror::Error;

pub use cookie::SameSite;

/// Option keys a cookie accepts.
pub const ALLOWED_OPTIONS: [&str; 7] = ["path", "httponly", "secure", "same_site", "domain", "expires", "max_age"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CookieError {
    #[error("invalid cookie option {0:?}, expected one of {ALLOWED_OPTIONS:?}")]
    UnrecognizedOption(String),

    #[error("invalid value for cookie option {option}: {value}")]
    InvalidValue { option: String, value: Value },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieOptions {
    pub path: Option<String>,
    pub httponly: bool,
    pub secure: bool,
    pub same_site: Option<SameSite>,
    pub domain: Option<String>,
    pub expires: Option<OffsetDateTime>,
    pub max_age: Option<i64>,
}

impl CookieOptions {
    /// Build options from loosely typed key/value pairs.
    pub fn from_pairs<K, I>(pairs: I) -> Result<Self, CookieError>
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let mut options = Self::default();
        for (key, value) in pairs {
            let key = key.as_ref();
            let invalid = || CookieError::InvalidValue {
                option: key.to_string(),
                value: value.clone(),
            };
            match key {
                "path" => options.path = Some(value.as_str().ok_or_else(invalid)?.to_string()),
                "httponly" => options.httponly = value.as_bool().ok_or_else(invalid)?,
                "secure" => options.secure = value.as_bool().ok_or_else(invalid)?,
                "same_site" => {
                    let same_site = match value.as_str().map(str::to_ascii_lowercase).as_deref() {
                        Some("strict") => SameSite::Strict,
                        Some("lax") => SameSite::Lax,
                        Some("none") => SameSite::None,
                        _ => return Err(invalid()),
                    };
                    options.same_site = Some(same_site);
                }
                "domain" => options.domain = Some(value.as_str().ok_or_else(invalid)?.to_string()),
                "expires" => {
                    let expires = match &value {
                        Value::String(date) => parse_http_date(date),
                        Value::Number(n) => n.as_i64().and_then(|ts| OffsetDateTime::from_unix_timestamp(ts).ok()),
                        _ => None,
                    };
                    options.expires = Some(expires.ok_or_else(invalid)?);
                }
                "max_age" => options.max_age = Some(value.as_i64().ok_or_else(invalid)?),
                other => return Err(CookieError::UnrecognizedOption(other.to_string())),
            }
        }
        Ok(options)
    }
}

/// Accepts the date forms a browser sends back in `Expires`.
fn parse_http_date(date: &str) -> Option<OffsetDateTime> {
    if date.contains(';') {
        return None;
    }
    cookie::Cookie::parse(format!("_=; Expires={date}"))
        .ok()?
        .expires_datetime()
}

/// A cookie to send with `Set-Cookie`. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    name: String,
    value: String,
    options: CookieOptions,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>, options: CookieOptions) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            options,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn options(&self) -> &CookieOptions {
        &self.options
    }

    /// Name and value are percent-encoded so a value can never carry
    /// attributes of its own.
    pub fn to_set_cookie_header(&self) -> String {
        let options = &self.options;
        let mut builder = cookie::Cookie::build((self.name.clone(), self.value.clone()));
        if let Some(domain) = &options.domain {
            builder = builder.domain(domain.clone());
        }
        if let Some(path) = &options.path {
            builder = builder.path(path.clone());
        }
        if let Some(max_age) = options.max_age {
            builder = builder.max_age(Duration::seconds(max_age));
        }
        if let Some(expires) = options.expires {
            builder = builder.expires(expires);
        }
        if options.secure {
            builder = builder.secure(true);
        }
        if options.httponly {
            builder = builder.http_only(true);
        }
        if let Some(same_site) = options.same_site {
            builder = builder.same_site(same_site);
        }
        builder.build().encoded().to_string()
    }
}

/// Parse inbound `Cookie` headers into name → value, decoding
/// percent-encoded pairs. Malformed pairs are skipped and later duplicates
/// are ignored.
pub fn parse_cookie_header<'a>(headers: impl IntoIterator<Item = &'a str>) -> BTreeMap<String, String> {
    let mut cookies = BTreeMap::new();
    for header in headers {
        for cookie in cookie::Cookie::split_parse_encoded(header).filter_map(Result::ok) {
            cookies
                .entry(cookie.name().to_string())
                .or_insert_with(|| cookie.value().trim_matches('"').to_string());
        }
    }
    cookies
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_options_from_pairs() {
        let options = CookieOptions::from_pairs([
            ("path", json!("/")),
            ("httponly", json!(true)),
            ("same_site", json!("lax")),
            ("max_age", json!(3600)),
        ])
        .unwrap();
        let cookie = Cookie::new("session", "abc", options);
        assert_eq!(
            cookie.to_set_cookie_header(),
            "session=abc; HttpOnly; SameSite=Lax; Path=/; Max-Age=3600"
        );
    }

    #[test]
    fn test_value_cannot_add_attributes() {
        let cookie = Cookie::new(
            "session",
            "abc; Domain=evil.example; Max-Age=99999999",
            CookieOptions::default(),
        );
        let header = cookie.to_set_cookie_header();
        assert!(header.starts_with("session=abc%3B"));
        assert!(!header.contains("; Domain="));
        assert!(!header.contains("; Max-Age="));

        let parsed = parse_cookie_header([header.as_str()]);
        assert_eq!(parsed["session"], "abc; Domain=evil.example; Max-Age=99999999");
    }

    #[test]
    fn test_expires_accepts_http_date_and_timestamp() {
        let options = CookieOptions::from_pairs([("expires", json!("Wed, 21 Oct 2015 07:28:00 GMT"))]).unwrap();
        assert_eq!(options.expires.map(|at| at.unix_timestamp()), Some(1_445_412_480));

        let options = CookieOptions::from_pairs([("expires", json!(1_445_412_480))]).unwrap();
        let header = Cookie::new("a", "1", options).to_set_cookie_header();
        assert_eq!(header, "a=1; Expires=Wed, 21 Oct 2015 07:28:00 GMT");

        let error = CookieOptions::from_pairs([("expires", json!("tomorrow; Domain=x"))]).unwrap_err();
        assert!(matches!(error, CookieError::InvalidValue { .. }));
    }

    #[test]
    fn test_unrecognized_option() {
        let error = CookieOptions::from_pairs([("color", json!("blue"))]).unwrap_err();
        assert_eq!(error, CookieError::UnrecognizedOption("color".to_string()));
    }

    #[test]
    fn test_invalid_value() {
        let error = CookieOptions::from_pairs([("secure", json!("yes"))]).unwrap_err();
        assert!(matches!(error, CookieError::InvalidValue { .. }));
    }

    #[test]
    fn test_parse_cookie_header() {
        let cookies = parse_cookie_header(["a=1; b=\"two\"; junk", "a=3; c=x%20y"]);
        assert_eq!(cookies.len(), 3);
        assert_eq!(cookies["a"], "1");
        assert_eq!(cookies["c"], "x y");
        assert_eq!(cookies["b"], "two");
    }
}
