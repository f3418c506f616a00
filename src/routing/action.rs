//! Action resolution.

use std::fmt;

use serde_json::json;

use crate::command::CommandError;
use crate::http::Request;

/// What a request asks the connector to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Run,
    Describe,
    Manifest,
    List,
    DescribeType,
    Help,
    /// CORS preflight; never reaches business logic.
    Options,
}

impl Action {
    /// Resolve from the method and the first path segment.
    pub fn resolve(request: &Request) -> Result<Self, CommandError> {
        if request.is_options() {
            return Ok(Action::Options);
        }

        match request.action() {
            "run" => Ok(Action::Run),
            "describe" | "describe_command" => Ok(Action::Describe),
            "manifest" => Ok(Action::Manifest),
            "list" => Ok(Action::List),
            "describe_type" => Ok(Action::DescribeType),
            "help" => Ok(Action::Help),
            other => Err(invalid_context(other)),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Run => "run",
            Action::Describe => "describe",
            Action::Manifest => "manifest",
            Action::List => "list",
            Action::DescribeType => "describe_type",
            Action::Help => "help",
            Action::Options => "options",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn invalid_context(action: &str) -> CommandError {
    CommandError::runtime("invalid_context", format!("Not sure what to do with action {action:?}"))
        .with_context(json!({ "action": action }))
}
