//! Command subsystem.
//!
//! The narrow surface through which the connector talks to business logic.
//! How a command validates and executes is not the connector's concern; it
//! only needs the declared types, the possible errors and an `execute` hook.
//!
//! # Data Flow
//! ```text
//! Request inputs (JSON map)
//!     → types.rs (cast against the declared input type)
//!     → Command::execute
//!     → outcome.rs (Success(Data) | Failure(ErrorCollection))
//!     → error.rs categories drive the HTTP status
//! ```
//!
//! # Design Decisions
//! - Error categories are a closed enum with a total status mapping
//! - Results are a `Data` tree so serializers can tell entities apart
//! - Commands are shared trait objects; one command may back many entries

pub mod data;
pub mod error;
pub mod outcome;
pub mod types;

use serde_json::Value;

use crate::persistence::EntityLoader;

pub use data::{Data, Entity, Record};
pub use error::{CommandError, ErrorCategory, ErrorCollection, PossibleError};
pub use outcome::Outcome;
pub use types::{Attributes, TypeDeclaration};

/// Resolved command inputs.
pub type Inputs = serde_json::Map<String, Value>;

/// What a command can see of the request that triggered it.
#[derive(Clone, Copy, Default)]
pub struct ExecutionContext<'a> {
    /// The identity produced by the connector's authenticator, if any.
    pub authenticated_user: Option<&'a Value>,
    /// The persistence collaborator, when one is configured.
    pub loader: Option<&'a dyn EntityLoader>,
}

/// A unit of business logic with typed inputs and outputs.
pub trait Command: Send + Sync {
    /// Fully qualified name, segments separated by `::`.
    fn name(&self) -> &str;

    fn description(&self) -> Option<&str> {
        None
    }

    fn inputs_type(&self) -> TypeDeclaration {
        TypeDeclaration::Attributes(Attributes::default())
    }

    fn result_type(&self) -> TypeDeclaration {
        TypeDeclaration::Duck
    }

    /// Domain errors this command may produce, for the manifest.
    fn possible_errors(&self) -> Vec<PossibleError> {
        Vec::new()
    }

    /// Run the command against already-cast inputs.
    fn execute(&self, inputs: &Inputs, context: &ExecutionContext<'_>) -> Result<Data, ErrorCollection>;
}
