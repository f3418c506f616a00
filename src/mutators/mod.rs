//! Request and response mutators.
//!
//! # Data Flow
//! ```text
//! Request ──► request mutators (registration order, when applicable)
//!                 edit resolved inputs: cookie / header / function / defaults
//!         ──► command
//! Response ─► response mutators (registration order, when applicable)
//!                 move result attributes to cookies or headers, set headers
//! ```
//!
//! # Design Decisions
//! - Every mutator also rewrites the declared input or result type, so the
//!   manifest always shows the wire shape rather than the command's own shape
//! - Mutators are trait objects, shared across requests, and stateless

pub mod request;
pub mod response;

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::command::{Inputs, TypeDeclaration};
use crate::http::{Request, Response};

pub use request::{DefaultInputs, SetInputFromCookie, SetInputFromHeader, SetInputToProcResult};
pub use response::{MoveAttributeToCookie, MoveAttributeToHeader, SetHeader};

/// Edits resolved inputs before the command runs.
pub trait RequestMutator: Send + Sync + fmt::Debug {
    fn applicable(&self, _request: &Request) -> bool {
        true
    }

    fn mutate(&self, request: &Request, inputs: &mut Inputs);

    /// The input type callers see once this mutator is in place.
    fn inputs_type_from(&self, inputs_type: TypeDeclaration) -> TypeDeclaration {
        inputs_type
    }
}

/// Edits the response after the command ran.
pub trait ResponseMutator: Send + Sync + fmt::Debug {
    fn applicable(&self, _response: &Response<'_>) -> bool {
        true
    }

    fn mutate(&self, response: &mut Response<'_>);

    /// The result type callers see once this mutator is in place.
    fn result_type_from(&self, result_type: TypeDeclaration) -> TypeDeclaration {
        result_type
    }
}

/// A value computed from the request.
#[derive(Clone)]
pub struct InputFn(Arc<dyn Fn(&Request) -> Value + Send + Sync>);

impl InputFn {
    pub fn new(f: impl Fn(&Request) -> Value + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn call(&self, request: &Request) -> Value {
        (self.0)(request)
    }
}

impl fmt::Debug for InputFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("InputFn(..)")
    }
}

/// A literal input value or one computed per request.
#[derive(Debug, Clone)]
pub enum InputSource {
    Value(Value),
    Proc(InputFn),
}

impl InputSource {
    pub fn proc(f: impl Fn(&Request) -> Value + Send + Sync + 'static) -> Self {
        InputSource::Proc(InputFn::new(f))
    }

    pub fn resolve(&self, request: &Request) -> Value {
        match self {
            InputSource::Value(value) => value.clone(),
            InputSource::Proc(f) => f.call(request),
        }
    }

    /// The literal, when there is one.
    pub fn literal(&self) -> Option<&Value> {
        match self {
            InputSource::Value(value) => Some(value),
            InputSource::Proc(_) => None,
        }
    }
}

impl From<Value> for InputSource {
    fn from(value: Value) -> Self {
        InputSource::Value(value)
    }
}

impl From<InputFn> for InputSource {
    fn from(f: InputFn) -> Self {
        InputSource::Proc(f)
    }
}
