//! Command outcomes.

use crate::command::{CommandError, Data, ErrorCollection};

/// Result of running a command.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(Data),
    Failure(ErrorCollection),
}

impl Outcome {
    pub fn failure(error: CommandError) -> Self {
        Outcome::Failure(ErrorCollection::from(error))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn result(&self) -> Option<&Data> {
        match self {
            Outcome::Success(data) => Some(data),
            Outcome::Failure(_) => None,
        }
    }

    pub fn errors(&self) -> Option<&ErrorCollection> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Failure(errors) => Some(errors),
        }
    }
}

impl From<Result<Data, ErrorCollection>> for Outcome {
    fn from(result: Result<Data, ErrorCollection>) -> Self {
        match result {
            Ok(data) => Outcome::Success(data),
            Err(errors) => Outcome::Failure(errors),
        }
    }
}
