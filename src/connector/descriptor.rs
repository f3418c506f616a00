//! Transformed-command descriptors.
//!
//! A descriptor binds one command to everything a `connect` call configured
//! for it under one exposed name. The same command can back several
//! descriptors (suffixes).

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde_json::{json, Value};

use crate::command::{
    Command, CommandError, Data, ErrorCategory, ErrorCollection, ExecutionContext, Outcome, PossibleError,
    TypeDeclaration,
};
use crate::connector::authorization::{authorize, AllowedRule, AuthorizationContext, Authenticator};
use crate::connector::transformers::{ErrorsTransformer, InputsTransformer, PreCommitTransformer, ResultTransformer};
use crate::http::Request;
use crate::manifest::scope_of;
use crate::mutators::{RequestMutator, ResponseMutator};
use crate::observability::metrics;
use crate::persistence::EntityLoader;
use crate::serializers::SerializerChain;

/// Connector-wide collaborators a descriptor needs at run time.
#[derive(Clone, Copy, Default)]
pub struct RunEnvironment<'a> {
    pub authenticator: Option<&'a Authenticator>,
    pub loader: Option<&'a dyn EntityLoader>,
}

/// A panic payload as an unknown error.
pub fn unknown_error_from_panic(payload: Box<dyn std::any::Any + Send>) -> CommandError {
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown error".to_string()
    };
    CommandError::unknown(message)
}

#[derive(Clone)]
pub struct TransformedCommand {
    pub(crate) exposed_name: String,
    pub(crate) command: Arc<dyn Command>,
    pub(crate) inputs_transformers: Vec<InputsTransformer>,
    pub(crate) result_transformers: Vec<ResultTransformer>,
    pub(crate) errors_transformers: Vec<ErrorsTransformer>,
    pub(crate) pre_commit_transformers: Vec<PreCommitTransformer>,
    pub(crate) serializers: SerializerChain,
    pub(crate) allowed_rules: Vec<AllowedRule>,
    pub(crate) requires_authentication: bool,
    pub(crate) request_mutators: Vec<Arc<dyn RequestMutator>>,
    pub(crate) response_mutators: Vec<Arc<dyn ResponseMutator>>,
    pub(crate) capture_unknown_error: bool,
}

impl fmt::Debug for TransformedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformedCommand")
            .field("exposed_name", &self.exposed_name)
            .field("command", &self.command.name())
            .field("serializers", &self.serializers.names())
            .field("requires_authentication", &self.requires_authentication)
            .finish_non_exhaustive()
    }
}

impl TransformedCommand {
    /// The exposed name, suffix included.
    pub fn name(&self) -> &str {
        &self.exposed_name
    }

    pub fn command(&self) -> &Arc<dyn Command> {
        &self.command
    }

    pub fn serializers(&self) -> &SerializerChain {
        &self.serializers
    }

    pub fn allowed_rules(&self) -> &[AllowedRule] {
        &self.allowed_rules
    }

    pub fn requires_authentication(&self) -> bool {
        self.requires_authentication
    }

    pub fn response_mutators(&self) -> &[Arc<dyn ResponseMutator>] {
        &self.response_mutators
    }

    /// Input type as callers see it, after every request mutator.
    pub fn inputs_type(&self) -> TypeDeclaration {
        self.request_mutators
            .iter()
            .fold(self.command.inputs_type(), |declared, mutator| mutator.inputs_type_from(declared))
    }

    /// Result type as callers see it, after every response mutator.
    pub fn result_type(&self) -> TypeDeclaration {
        self.response_mutators
            .iter()
            .fold(self.command.result_type(), |declared, mutator| mutator.result_type_from(declared))
    }

    pub fn possible_errors(&self) -> Vec<PossibleError> {
        let mut errors = self.command.possible_errors();
        if self.requires_authentication {
            errors.push(PossibleError::new(ErrorCategory::Unauthenticated, "unauthenticated"));
        }
        if !self.allowed_rules.is_empty() {
            errors.push(PossibleError::new(ErrorCategory::NotAllowed, "not_allowed"));
        }
        errors
    }

    pub fn to_manifest(&self) -> Value {
        let (organization, domain) = scope_of(&self.exposed_name);
        let possible_errors: serde_json::Map<String, Value> = self
            .possible_errors()
            .iter()
            .map(|error| (error.key(), error.to_manifest()))
            .collect();
        let rules: Vec<&str> = self.allowed_rules.iter().map(AllowedRule::symbol).collect();

        json!({
            "name": self.exposed_name,
            "full_command_name": self.exposed_name,
            "command_name": self.command.name(),
            "description": self.command.description(),
            "organization": organization,
            "domain": domain,
            "inputs_type": self.inputs_type().to_manifest(),
            "result_type": self.result_type().to_manifest(),
            "possible_errors": possible_errors,
            "requires_authentication": self.requires_authentication,
            "allowed_rules": rules,
            "serializers": self.serializers.names(),
        })
    }

    /// Run the full pipeline for one request.
    pub fn run(&self, request: &Request, env: &RunEnvironment<'_>) -> Outcome {
        let outcome = match self.execute_pipeline(request, env) {
            Ok(data) => Outcome::Success(
                self.result_transformers
                    .iter()
                    .fold(data, |data, transformer| transformer.apply(data)),
            ),
            Err(errors) => {
                let errors = self
                    .errors_transformers
                    .iter()
                    .fold(errors, |errors, transformer| transformer.apply(errors));
                if errors.is_empty() {
                    tracing::warn!(command = %self.exposed_name, "Errors transformer dropped every error");
                    Outcome::Failure(ErrorCollection::from(CommandError::unknown(
                        "Command failed without reporting an error",
                    )))
                } else {
                    Outcome::Failure(errors)
                }
            }
        };

        tracing::debug!(
            command = %self.exposed_name,
            success = outcome.is_success(),
            "Command finished"
        );
        outcome
    }

    fn execute_pipeline(&self, request: &Request, env: &RunEnvironment<'_>) -> Result<Data, ErrorCollection> {
        let mut inputs = request.inputs()?.clone();

        for mutator in &self.request_mutators {
            if mutator.applicable(request) {
                mutator.mutate(request, &mut inputs);
            }
        }

        let inputs = self
            .inputs_transformers
            .iter()
            .fold(inputs, |inputs, transformer| transformer.apply(inputs));

        let authenticated_user = env.authenticator.and_then(|authenticate| authenticate(request));
        if self.requires_authentication && authenticated_user.is_none() {
            tracing::debug!(command = %self.exposed_name, "Unauthenticated request");
            return Err(CommandError::unauthenticated().into());
        }

        let inputs = match self.command.inputs_type() {
            TypeDeclaration::Attributes(attributes) => attributes.cast(inputs)?,
            _ => inputs,
        };

        authorize(
            &self.allowed_rules,
            &AuthorizationContext {
                inputs: &inputs,
                authenticated_user: authenticated_user.as_ref(),
                request,
            },
        )?;

        let context = ExecutionContext {
            authenticated_user: authenticated_user.as_ref(),
            loader: env.loader,
        };

        let mut data = if self.capture_unknown_error {
            match panic::catch_unwind(AssertUnwindSafe(|| self.command.execute(&inputs, &context))) {
                Ok(result) => result?,
                Err(payload) => {
                    let error = unknown_error_from_panic(payload);
                    tracing::error!(command = %self.exposed_name, error = %error, "Command panicked");
                    metrics::record_unknown_error();
                    return Err(error.into());
                }
            }
        } else {
            self.command.execute(&inputs, &context)?
        };

        for transformer in &self.pre_commit_transformers {
            transformer.apply(&mut data, env.loader)?;
        }

        Ok(data)
    }
}
