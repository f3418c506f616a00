//! Typed outcome errors.
//!
//! Every failure reaching the status mapping is one of these; nothing is
//! allowed to escape the dispatcher as a panic.

use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

/// Error taxonomy. Closed: status mapping is a total function over it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Uncaught internal failure. Always fatal.
    Unknown,
    /// The command, entity or manifest node does not exist.
    NotFound,
    /// Caller identity required but missing or rejected.
    Unauthenticated,
    /// Caller identity present but forbidden by a rule.
    NotAllowed,
    /// Input validation, casting and shape failures.
    Data,
    /// Domain-declared business rule failures.
    Runtime,
}

impl ErrorCategory {
    /// First segment of an error key.
    pub fn key_prefix(self) -> &'static str {
        match self {
            ErrorCategory::Data => "data",
            _ => "runtime",
        }
    }
}

/// One error carried by a failed outcome.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct CommandError {
    category: ErrorCategory,
    symbol: String,
    message: String,
    path: Vec<String>,
    context: Value,
    is_fatal: bool,
}

impl CommandError {
    pub fn new(category: ErrorCategory, symbol: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            category,
            symbol: symbol.into(),
            message: message.into(),
            path: Vec::new(),
            context: json!({}),
            is_fatal: category == ErrorCategory::Unknown,
        }
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Unknown, "unknown", message)
    }

    /// A missing command or manifest node.
    pub fn not_found(name: &str) -> Self {
        Self::new(ErrorCategory::NotFound, "not_found", format!("Could not find {name}"))
            .with_context(json!({ "not_found": name }))
    }

    pub fn unauthenticated() -> Self {
        Self::new(ErrorCategory::Unauthenticated, "unauthenticated", "Unauthenticated")
    }

    pub fn not_allowed(rule_symbol: &str, explanation: impl Into<String>) -> Self {
        let explanation = explanation.into();
        Self::new(ErrorCategory::NotAllowed, "not_allowed", explanation.clone())
            .with_context(json!({ "rule_symbol": rule_symbol, "explanation": explanation }))
    }

    /// An input error at `path`.
    pub fn data<P, S>(path: P, symbol: impl Into<String>, message: impl Into<String>) -> Self
    where
        P: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut error = Self::new(ErrorCategory::Data, symbol, message);
        error.path = path.into_iter().map(Into::into).collect();
        error
    }

    pub fn runtime(symbol: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Runtime, symbol, message)
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.context = context;
        self
    }

    pub fn fatal(mut self) -> Self {
        self.is_fatal = true;
        self
    }

    pub fn category(&self) -> ErrorCategory {
        self.category
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn context(&self) -> &Value {
        &self.context
    }

    pub fn is_fatal(&self) -> bool {
        self.is_fatal
    }

    /// `runtime.not_allowed`, `data.base.cannot_cast`, ...
    pub fn key(&self) -> String {
        let mut key = String::from(self.category.key_prefix());
        for segment in &self.path {
            key.push('.');
            key.push_str(segment);
        }
        key.push('.');
        key.push_str(&self.symbol);
        key
    }

    pub fn to_json(&self) -> Value {
        json!({
            "key": self.key(),
            "category": self.category,
            "symbol": self.symbol,
            "path": self.path,
            "message": self.message,
            "context": self.context,
            "is_fatal": self.is_fatal,
        })
    }
}

/// The errors of a failed outcome. Never empty once it reaches a response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorCollection(Vec<CommandError>);

impl ErrorCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: CommandError) {
        self.0.push(error);
    }

    pub fn extend(&mut self, other: ErrorCollection) {
        self.0.extend(other.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> Option<&CommandError> {
        self.0.first()
    }

    pub fn as_slice(&self) -> &[CommandError] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CommandError> {
        self.0.iter()
    }

    /// Keyed by error key: `{"runtime.not_allowed": {...}}`.
    pub fn to_json(&self) -> Value {
        let mut map = serde_json::Map::new();
        for error in &self.0 {
            map.insert(error.key(), error.to_json());
        }
        Value::Object(map)
    }
}

impl From<CommandError> for ErrorCollection {
    fn from(error: CommandError) -> Self {
        Self(vec![error])
    }
}

impl FromIterator<CommandError> for ErrorCollection {
    fn from_iter<I: IntoIterator<Item = CommandError>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for ErrorCollection {
    type Item = CommandError;
    type IntoIter = std::vec::IntoIter<CommandError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ErrorCollection {
    type Item = &'a CommandError;
    type IntoIter = std::slice::Iter<'a, CommandError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// An error a command or descriptor declares it may produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PossibleError {
    pub category: ErrorCategory,
    pub symbol: String,
    pub path: Vec<String>,
}

impl PossibleError {
    pub fn new(category: ErrorCategory, symbol: impl Into<String>) -> Self {
        Self {
            category,
            symbol: symbol.into(),
            path: Vec::new(),
        }
    }

    pub fn key(&self) -> String {
        let mut parts = vec![self.category.key_prefix().to_string()];
        parts.extend(self.path.iter().cloned());
        parts.push(self.symbol.clone());
        parts.join(".")
    }

    pub fn to_manifest(&self) -> Value {
        json!({
            "key": self.key(),
            "category": self.category,
            "symbol": self.symbol,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_keys() {
        assert_eq!(CommandError::unknown("kaboom!").key(), "runtime.unknown");
        assert_eq!(CommandError::data(["base"], "cannot_cast", "x").key(), "data.base.cannot_cast");
        assert_eq!(CommandError::data(Vec::<String>::new(), "unexpected_attributes", "x").key(), "data.unexpected_attributes");
        assert_eq!(PossibleError::new(ErrorCategory::NotAllowed, "not_allowed").key(), "runtime.not_allowed");
    }

    #[test]
    fn test_unknown_is_fatal() {
        let error = CommandError::unknown("kaboom!");
        assert!(error.is_fatal());
        assert_eq!(error.to_string(), "kaboom!");
        assert!(!CommandError::runtime("nope", "nope").is_fatal());
    }

    #[test]
    fn test_collection_json_shape() {
        let errors = ErrorCollection::from(CommandError::not_allowed("must_be_base_2", "Must be base 2"));
        let json = errors.to_json();
        let error = &json["runtime.not_allowed"];
        assert_eq!(error["message"], "Must be base 2");
        assert_eq!(error["symbol"], "not_allowed");
        assert_eq!(error["is_fatal"], false);
        assert_eq!(error["context"]["rule_symbol"], "must_be_base_2");
    }
}
