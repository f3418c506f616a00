//! Command connector subsystem.
//!
//! # Data Flow
//! ```text
//! Request
//!     → CommandConnector::run (prefix applied, catch_unwind boundary)
//!     → routing::Action::resolve
//!     → OPTIONS: GetOptions | run: TransformedCommand::run | describe / help /
//!       manifest / list / describe_type: built-ins
//!     → Outcome
//!     → status (routing::status), body (serializer chain structure)
//!     → headers: static → request.response_headers → content-type
//!     → response mutators
//!     → encoders (JSON) → Response
//! ```
//!
//! # Design Decisions
//! - Registration happens before serving; the connector is read-only after
//!   it is wrapped in an `Arc`
//! - Nothing escapes `run`: a panic anywhere in dispatch becomes an unknown
//!   error serialized with the connector defaults
//! - Connect-time sugar is rewritten by desugarizers so the dispatcher only
//!   ever sees concrete mutators

pub mod authorization;
pub mod descriptor;
pub mod options;
pub mod registry;
pub mod transformers;

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use crate::command::{Command, CommandError, Data, Outcome};
use crate::commands::{
    BasicHelpRenderer, BuiltinCommand, Describe, DescribeType, FullManifest, GetOptions, Help, HelpRenderer,
    ListCommands,
};
use crate::config::ConnectorConfig;
use crate::desugarizers::{default_desugarizers, desugarize_all, leftover_sugar, Desugarizer};
use crate::http::headers::ResponseHeaderConfig;
use crate::http::{normalize_prefix, Request, Response};
use crate::manifest::{LookupMode, Manifest, Namespace};
use crate::observability::metrics;
use crate::persistence::EntityLoader;
use crate::routing::status::status_for_outcome;
use crate::routing::Action;
use crate::serializers::{
    default_serializers, serializer_by_name, AggregateSerializer, AtomicSerializer, ErrorsSerializer,
    JsonSerializer, Payload, SerializerChain,
};

pub use authorization::{
    authorize, AllowedRule, AllowedRuleSpec, Authenticator, AuthorizationContext, RuleRegistry,
};
pub use descriptor::{unknown_error_from_panic, RunEnvironment, TransformedCommand};
pub use options::{ConnectOptions, RequestMutatorEntry, RequestSugar};
pub use registry::CommandRegistry;
pub use transformers::{ErrorsTransformer, InputsTransformer, PreCommitTransformer, ResultTransformer, Transformer};

pub const CONTENT_TYPE: &str = "content-type";
pub const TEXT_HTML: &str = "text/html";

/// Why a `connect` call was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    #[error("no allowed rule registered as {0:?}")]
    UnknownRule(String),

    #[error("a command is already exposed as {0:?}")]
    DuplicateName(String),

    #[error("unrecognized request mutator sugar: {0:?}")]
    UnrecognizedSugar(Vec<String>),
}

/// What dispatch produced, before the response is shaped.
struct Dispatch {
    action: Option<Action>,
    command: Option<Arc<TransformedCommand>>,
    outcome: Outcome,
}

impl Dispatch {
    fn builtin(action: Action, outcome: Outcome) -> Self {
        Self {
            action: Some(action),
            command: None,
            outcome,
        }
    }
}

/// Maps HTTP requests onto registered commands.
pub struct CommandConnector {
    prefix: Option<String>,
    registry: CommandRegistry,
    rules: RuleRegistry,
    default_serializers: SerializerChain,
    authenticator: Option<Authenticator>,
    loader: Option<Arc<dyn EntityLoader>>,
    namespace: Option<Arc<dyn Namespace>>,
    response_headers: ResponseHeaderConfig,
    help_renderer: Arc<dyn HelpRenderer>,
    capture_unknown_error: bool,
    desugarizers: Vec<Arc<dyn Desugarizer>>,
}

impl Default for CommandConnector {
    fn default() -> Self {
        CommandConnectorBuilder::default().build()
    }
}

impl CommandConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> CommandConnectorBuilder {
        CommandConnectorBuilder::default()
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn default_serializers(&self) -> &SerializerChain {
        &self.default_serializers
    }

    pub fn response_headers(&self) -> &ResponseHeaderConfig {
        &self.response_headers
    }

    /// Register a rule that connect calls can name.
    pub fn register_rule(&mut self, rule: AllowedRule) {
        self.rules.register(rule);
    }

    /// Connect with default options.
    pub fn connect_command(&mut self, command: Arc<dyn Command>) -> Result<(), ConnectError> {
        self.connect(command, ConnectOptions::default())
    }

    /// Expose `command` under its name (plus any suffix).
    pub fn connect(&mut self, command: Arc<dyn Command>, options: ConnectOptions) -> Result<(), ConnectError> {
        let options = desugarize_all(&self.desugarizers, options);
        let leftover = leftover_sugar(&options);
        if !leftover.is_empty() {
            return Err(ConnectError::UnrecognizedSugar(leftover));
        }

        let allowed_rules = match options.allowed_rule {
            None => Vec::new(),
            Some(AllowedRuleSpec::Rule(rule)) => vec![rule],
            Some(AllowedRuleSpec::Named(names)) => names
                .iter()
                .map(|name| {
                    self.rules
                        .get(name)
                        .cloned()
                        .ok_or_else(|| ConnectError::UnknownRule(name.clone()))
                })
                .collect::<Result<Vec<_>, _>>()?,
        };

        let serializers = match options.serializers {
            Some(serializers) => SerializerChain::new(serializers),
            None if options.aggregate_entities => SerializerChain::new(vec![
                Arc::new(ErrorsSerializer),
                Arc::new(AggregateSerializer),
                Arc::new(JsonSerializer),
            ]),
            None if options.atomic_entities => SerializerChain::new(vec![
                Arc::new(ErrorsSerializer),
                Arc::new(AtomicSerializer),
                Arc::new(JsonSerializer),
            ]),
            None => self.default_serializers.clone(),
        };

        let mut pre_commit_transformers = options.pre_commit_transformers;
        if let Some(depth) = serializers.preload() {
            if !pre_commit_transformers.iter().any(|t| t.preload_depth() == Some(depth)) {
                pre_commit_transformers.push(PreCommitTransformer::Preload(depth));
            }
        }

        let request_mutators = options
            .request_mutators
            .into_iter()
            .filter_map(|entry| match entry {
                RequestMutatorEntry::Mutator(mutator) => Some(mutator),
                RequestMutatorEntry::Sugar(_) => None,
            })
            .collect();

        let exposed_name = format!("{}{}", command.name(), options.suffix.as_deref().unwrap_or_default());

        let descriptor = TransformedCommand {
            exposed_name: exposed_name.clone(),
            command,
            inputs_transformers: options.inputs_transformers,
            result_transformers: options.result_transformers,
            errors_transformers: options.errors_transformers,
            pre_commit_transformers,
            serializers,
            allowed_rules,
            requires_authentication: options.requires_authentication,
            request_mutators,
            response_mutators: options.response_mutators,
            capture_unknown_error: options.capture_unknown_error.unwrap_or(self.capture_unknown_error),
        };

        self.registry.register(descriptor)?;
        tracing::info!(command = %exposed_name, "Command connected");
        Ok(())
    }

    /// The manifest of everything this connector exposes.
    pub fn manifest(&self) -> Manifest {
        Manifest::build(self.registry.iter(), self.rules.iter())
    }

    /// Exact exposed name first, then a unique `::`-suffix match.
    pub fn lookup_command(&self, name: &str) -> Option<&Arc<TransformedCommand>> {
        self.registry
            .get(name)
            .or_else(|| self.registry.lookup(name, LookupMode::General))
    }

    /// Handle one request. Never panics.
    pub fn run<'r>(&self, request: &'r mut Request) -> Response<'r> {
        let started = Instant::now();
        request.set_prefix(self.prefix.clone());

        let dispatch = match panic::catch_unwind(AssertUnwindSafe(|| self.dispatch(request))) {
            Ok(dispatch) => dispatch,
            Err(payload) => {
                let error = unknown_error_from_panic(payload);
                tracing::error!(path = %request.path(), error = %error, "Unhandled panic during dispatch");
                metrics::record_unknown_error();
                Dispatch {
                    action: Action::resolve(request).ok(),
                    command: None,
                    outcome: Outcome::failure(error),
                }
            }
        };

        let request: &'r Request = request;
        let action = dispatch.action;
        let response = self.build_response(request, dispatch);

        let action_label = action.map_or("invalid", Action::as_str);
        tracing::info!(
            method = %request.method().unwrap_or("-"),
            path = %request.path(),
            action = %action_label,
            status = response.status().as_u16(),
            "Request dispatched"
        );
        metrics::record_request(action_label, response.status().as_u16(), started);
        response
    }

    fn environment(&self) -> RunEnvironment<'_> {
        RunEnvironment {
            authenticator: self.authenticator.as_ref(),
            loader: self.loader.as_deref(),
        }
    }

    fn dispatch(&self, request: &mut Request) -> Dispatch {
        let action = match Action::resolve(request) {
            Ok(action) => action,
            Err(error) => {
                return Dispatch {
                    action: None,
                    command: None,
                    outcome: Outcome::failure(error),
                }
            }
        };

        tracing::debug!(action = %action, command = %request.full_command_name(), "Dispatching");

        match action {
            Action::Options => Dispatch::builtin(action, GetOptions::new(self.response_headers.cors()).run(request)),
            Action::Run => {
                let name = request.full_command_name();
                match self.lookup_command(name) {
                    Some(command) => Dispatch {
                        action: Some(action),
                        command: Some(Arc::clone(command)),
                        outcome: command.run(request, &self.environment()),
                    },
                    None => Dispatch::builtin(action, Outcome::failure(CommandError::not_found(name))),
                }
            }
            Action::Describe => {
                let name = request.full_command_name();
                let outcome = match self.lookup_command(name) {
                    Some(target) => Describe::new(target).run(request),
                    None => Outcome::failure(CommandError::not_found(name)),
                };
                Dispatch::builtin(action, outcome)
            }
            Action::Help => {
                let manifest = self.manifest();
                let help = Help::new(
                    &self.registry,
                    &manifest,
                    self.namespace.as_deref(),
                    self.help_renderer.as_ref(),
                );
                Dispatch::builtin(action, help.run(request))
            }
            Action::Manifest => Dispatch::builtin(action, FullManifest::new(&self.manifest()).run(request)),
            Action::List => Dispatch::builtin(action, ListCommands::new(&self.manifest()).run(request)),
            Action::DescribeType => Dispatch::builtin(action, DescribeType::new(&self.manifest()).run(request)),
        }
    }

    fn build_response<'r>(&self, request: &'r Request, dispatch: Dispatch) -> Response<'r> {
        let Dispatch {
            action,
            command,
            outcome,
        } = dispatch;

        let chain = command
            .as_ref()
            .map_or_else(|| self.default_serializers.clone(), |c| c.serializers().clone());
        let status = status_for_outcome(&outcome);
        let success = outcome.is_success();
        let is_help = action == Some(Action::Help);
        let is_options = action == Some(Action::Options);

        let body = match outcome {
            _ if is_options => Payload::Encoded(String::new()),
            Outcome::Success(Data::String(html)) if is_help => Payload::Encoded(html),
            Outcome::Failure(errors) if is_help => Payload::Encoded(self.help_renderer.render_errors(&errors, request)),
            Outcome::Success(data) => chain.structure(Payload::Result(data)),
            Outcome::Failure(errors) => chain.structure(Payload::Errors(errors)),
        };

        let mut response = Response::new(status, body, request, success);

        for (name, value) in self.response_headers.static_headers() {
            response.add_header(name, value.clone());
        }
        for (name, value) in request.response_headers() {
            response.add_header(name, value.clone());
        }
        if !is_options && !is_help && chain.is_json() && response.header(CONTENT_TYPE).is_none() {
            if let Some(content_type) = chain.content_type() {
                response.add_header(CONTENT_TYPE, content_type);
            }
        }
        if is_help {
            response.add_header(CONTENT_TYPE, TEXT_HTML);
        }

        if let Some(command) = &command {
            for mutator in command.response_mutators() {
                if mutator.applicable(&response) {
                    mutator.mutate(&mut response);
                }
            }
        }

        if !is_options && !is_help {
            let body = std::mem::replace(response.body_mut(), Payload::Encoded(String::new()));
            response.set_body(chain.encode(body));
        }

        response
    }
}

/// Builds a [`CommandConnector`].
pub struct CommandConnectorBuilder {
    prefix: Option<String>,
    default_serializers: Option<SerializerChain>,
    authenticator: Option<Authenticator>,
    loader: Option<Arc<dyn EntityLoader>>,
    namespace: Option<Arc<dyn Namespace>>,
    response_headers: ResponseHeaderConfig,
    help_renderer: Option<Arc<dyn HelpRenderer>>,
    rules: RuleRegistry,
    capture_unknown_error: bool,
    desugarizers: Vec<Arc<dyn Desugarizer>>,
}

impl Default for CommandConnectorBuilder {
    fn default() -> Self {
        Self {
            prefix: None,
            default_serializers: None,
            authenticator: None,
            loader: None,
            namespace: None,
            response_headers: ResponseHeaderConfig::default(),
            help_renderer: None,
            rules: RuleRegistry::default(),
            capture_unknown_error: true,
            desugarizers: default_desugarizers(),
        }
    }
}

impl CommandConnectorBuilder {
    /// Apply the `[connector]` config section.
    pub fn config(mut self, config: &ConnectorConfig) -> Self {
        if let Some(prefix) = &config.prefix {
            self = self.prefix(prefix);
        }
        if let Some(names) = &config.serializers {
            let chain: SerializerChain = names.iter().filter_map(|name| serializer_by_name(name)).collect();
            self.default_serializers = Some(chain);
        }
        self.capture_unknown_error = config.capture_unknown_error;
        self
    }

    /// Literal path prefix; trailing slashes are dropped.
    pub fn prefix(mut self, prefix: impl AsRef<str>) -> Self {
        self.prefix = normalize_prefix(prefix.as_ref());
        self
    }

    /// Prefix from path segments, e.g. `["foo", "bar"]`.
    pub fn prefix_segments<S: AsRef<str>>(mut self, segments: &[S]) -> Self {
        self.prefix = crate::http::request::prefix_from_segments(segments);
        self
    }

    pub fn default_serializers(mut self, chain: SerializerChain) -> Self {
        self.default_serializers = Some(chain);
        self
    }

    pub fn authenticator(mut self, f: impl Fn(&Request) -> Option<serde_json::Value> + Send + Sync + 'static) -> Self {
        self.authenticator = Some(Arc::new(f));
        self
    }

    pub fn entity_loader(mut self, loader: Arc<dyn EntityLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// The broader namespace `help` falls back to.
    pub fn namespace(mut self, namespace: Arc<dyn Namespace>) -> Self {
        self.namespace = Some(namespace);
        self
    }

    pub fn response_headers(mut self, headers: ResponseHeaderConfig) -> Self {
        self.response_headers = headers;
        self
    }

    pub fn help_renderer(mut self, renderer: Arc<dyn HelpRenderer>) -> Self {
        self.help_renderer = Some(renderer);
        self
    }

    pub fn allowed_rule(mut self, rule: AllowedRule) -> Self {
        self.rules.register(rule);
        self
    }

    pub fn capture_unknown_error(mut self, capture: bool) -> Self {
        self.capture_unknown_error = capture;
        self
    }

    /// Appended after the built-in desugarizers.
    pub fn desugarizer(mut self, desugarizer: Arc<dyn Desugarizer>) -> Self {
        self.desugarizers.push(desugarizer);
        self
    }

    pub fn build(self) -> CommandConnector {
        CommandConnector {
            prefix: self.prefix,
            registry: CommandRegistry::default(),
            rules: self.rules,
            default_serializers: self.default_serializers.unwrap_or_else(default_serializers),
            authenticator: self.authenticator,
            loader: self.loader,
            namespace: self.namespace,
            response_headers: self.response_headers,
            help_renderer: self.help_renderer.unwrap_or_else(|| Arc::new(BasicHelpRenderer)),
            capture_unknown_error: self.capture_unknown_error,
            desugarizers: self.desugarizers,
        }
    }
}
