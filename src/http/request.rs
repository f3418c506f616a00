//! Structured inbound request.
//!
//! Built once per call by the listener adapter (or directly in tests).
//! Routing fields and inputs are derived lazily and cached; the only
//! mutable part afterwards is `response_headers`.

use std::cell::OnceCell;
use std::collections::BTreeMap;

use serde_json::Value;
use url::Url;

use crate::command::{CommandError, ErrorCollection, Inputs};

/// Normalize a connector prefix: leading slash, no trailing slash.
///
/// Returns `None` for an empty prefix.
pub fn normalize_prefix(prefix: &str) -> Option<String> {
    let trimmed = prefix.trim_end_matches('/');
    if trimmed.trim_start_matches('/').is_empty() {
        return None;
    }
    if trimmed.starts_with('/') {
        Some(trimmed.to_string())
    } else {
        Some(format!("/{trimmed}"))
    }
}

/// Build a prefix from path segments, e.g. `["foo", "bar"]` → `/foo/bar`.
pub fn prefix_from_segments<S: AsRef<str>>(segments: &[S]) -> Option<String> {
    let joined = segments.iter().map(AsRef::as_ref).collect::<Vec<_>>().join("/");
    normalize_prefix(&joined)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Route {
    action: String,
    full_command_name: String,
    argument: Option<String>,
}

/// One inbound HTTP call.
#[derive(Debug, Clone, Default)]
pub struct Request {
    path: String,
    method: Option<String>,
    headers: BTreeMap<String, String>,
    query_string: String,
    body: String,
    scheme: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    cookies: BTreeMap<String, String>,
    remote_ip: Option<String>,
    prefix: Option<String>,
    response_headers: BTreeMap<String, String>,

    route: OnceCell<Route>,
    inputs: OnceCell<Result<Inputs, ErrorCollection>>,
}

impl Request {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Header names are case-insensitive; they are stored lower-cased.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_query_string(mut self, query_string: impl Into<String>) -> Self {
        self.query_string = query_string.into();
        self.inputs = OnceCell::new();
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self.inputs = OnceCell::new();
        self
    }

    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = Some(scheme.into());
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    pub fn with_cookies(mut self, cookies: impl IntoIterator<Item = (String, String)>) -> Self {
        self.cookies.extend(cookies);
        self
    }

    pub fn with_remote_ip(mut self, remote_ip: impl Into<String>) -> Self {
        self.remote_ip = Some(remote_ip.into());
        self
    }

    pub fn with_prefix(mut self, prefix: impl AsRef<str>) -> Self {
        self.set_prefix(normalize_prefix(prefix.as_ref()));
        self
    }

    /// Replace the prefix. Cached routing fields are recomputed on next use.
    pub fn set_prefix(&mut self, prefix: Option<String>) {
        if self.prefix != prefix {
            self.prefix = prefix;
            self.route = OnceCell::new();
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    pub fn is_options(&self) -> bool {
        self.method
            .as_deref()
            .is_some_and(|m| m.eq_ignore_ascii_case("OPTIONS"))
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn query_string(&self) -> &str {
        &self.query_string
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn cookies(&self) -> &BTreeMap<String, String> {
        &self.cookies
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn remote_ip(&self) -> Option<&str> {
        self.remote_ip.as_deref()
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn response_headers(&self) -> &BTreeMap<String, String> {
        &self.response_headers
    }

    pub fn set_response_header(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.response_headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
    }

    /// The path with the prefix removed. Always starts with a single `/`.
    pub fn prefixless_path(&self) -> String {
        let stripped = match &self.prefix {
            Some(prefix) => self
                .path
                .strip_prefix(prefix.as_str())
                .filter(|rest| rest.starts_with('/'))
                .unwrap_or(&self.path),
            None => &self.path,
        };
        format!("/{}", stripped.trim_start_matches('/'))
    }

    fn route(&self) -> &Route {
        self.route.get_or_init(|| {
            let path = self.prefixless_path();
            let mut segments = path[1..].split('/');
            let action = segments.next().unwrap_or_default().to_string();
            let rest: Vec<&str> = segments.filter(|s| !s.is_empty()).collect();
            Route {
                action,
                argument: rest.first().map(|s| s.to_string()),
                full_command_name: rest.join("::"),
            }
        })
    }

    /// First path segment after the prefix, e.g. `run`.
    pub fn action(&self) -> &str {
        &self.route().action
    }

    /// Remaining path segments joined with `::`.
    pub fn full_command_name(&self) -> &str {
        &self.route().full_command_name
    }

    /// The segment right after the action, used by `help`.
    pub fn argument(&self) -> Option<&str> {
        self.route().argument.as_deref()
    }

    /// Parsed body overlaid by the parsed query string. Query string wins.
    pub fn inputs(&self) -> Result<&Inputs, ErrorCollection> {
        self.inputs
            .get_or_init(|| {
                let mut inputs = self.parsed_body()?;
                inputs.extend(self.parsed_query_string());
                Ok(inputs)
            })
            .as_ref()
            .map_err(Clone::clone)
    }

    pub fn parsed_body(&self) -> Result<Inputs, ErrorCollection> {
        if self.body.trim().is_empty() {
            return Ok(Inputs::new());
        }
        match serde_json::from_str::<Value>(&self.body) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(CommandError::data(
                Vec::<String>::new(),
                "invalid_body",
                "Expected the request body to be a JSON object",
            )
            .into()),
            Err(e) => Err(CommandError::data(
                Vec::<String>::new(),
                "cannot_parse_body",
                format!("Could not parse request body: {e}"),
            )
            .into()),
        }
    }

    /// Form-urlencoded; the first value of a repeated key wins.
    pub fn parsed_query_string(&self) -> Inputs {
        let mut inputs = Inputs::new();
        for (key, value) in url::form_urlencoded::parse(self.query_string.as_bytes()) {
            inputs
                .entry(key.into_owned())
                .or_insert_with(|| Value::String(value.into_owned()));
        }
        inputs
    }

    /// Canonical URL, for manifest metadata.
    pub fn url(&self) -> String {
        let query = (!self.query_string.is_empty()).then_some(self.query_string.as_str());

        if let (Some(scheme), Some(host)) = (&self.scheme, &self.host) {
            if let Ok(mut url) = Url::parse(&format!("{scheme}://{host}")) {
                if url.set_port(self.port).is_ok() {
                    url.set_path(&self.path);
                    url.set_query(query);
                    return url.to_string();
                }
            }
        }

        match query {
            Some(query) => format!("{}?{query}", self.path),
            None => self.path.clone(),
        }
    }
}
