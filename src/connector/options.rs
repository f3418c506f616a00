//! Per-connect configuration.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::command::{CommandError, Data, ErrorCollection, Inputs};
use crate::connector::authorization::{AllowedRule, AllowedRuleSpec, AuthorizationContext};
use crate::connector::transformers::{
    ErrorsTransformer, InputsTransformer, PreCommitTransformer, ResultTransformer,
};
use crate::mutators::{InputSource, RequestMutator, ResponseMutator};
use crate::persistence::EntityLoader;
use crate::serializers::{Serializer, SerializerChain};

/// Convenience request-mutator syntax, keyed by section (`set`, `default`).
///
/// Desugarizers rewrite recognized sections into concrete mutators before
/// the command is registered.
#[derive(Debug, Clone, Default)]
pub struct RequestSugar {
    sections: BTreeMap<String, BTreeMap<String, InputSource>>,
}

impl RequestSugar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn section<K, I>(mut self, name: impl Into<String>, entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, InputSource)>,
    {
        self.sections
            .entry(name.into())
            .or_default()
            .extend(entries.into_iter().map(|(k, v)| (k.into(), v)));
        self
    }

    pub fn has_section(&self, name: &str) -> bool {
        self.sections.contains_key(name)
    }

    pub fn take_section(&mut self, name: &str) -> Option<BTreeMap<String, InputSource>> {
        self.sections.remove(name)
    }

    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

/// A request mutator as configured: concrete, or sugar still to be rewritten.
#[derive(Debug, Clone)]
pub enum RequestMutatorEntry {
    Mutator(Arc<dyn RequestMutator>),
    Sugar(RequestSugar),
}

/// Everything a single `connect` call can configure.
#[derive(Debug, Clone, Default)]
pub struct ConnectOptions {
    pub(crate) inputs_transformers: Vec<InputsTransformer>,
    pub(crate) result_transformers: Vec<ResultTransformer>,
    pub(crate) errors_transformers: Vec<ErrorsTransformer>,
    pub(crate) pre_commit_transformers: Vec<PreCommitTransformer>,
    pub(crate) serializers: Option<Vec<Arc<dyn Serializer>>>,
    pub(crate) allowed_rule: Option<AllowedRuleSpec>,
    pub(crate) requires_authentication: bool,
    pub(crate) request_mutators: Vec<RequestMutatorEntry>,
    pub(crate) response_mutators: Vec<Arc<dyn ResponseMutator>>,
    pub(crate) capture_unknown_error: Option<bool>,
    pub(crate) aggregate_entities: bool,
    pub(crate) atomic_entities: bool,
    pub(crate) suffix: Option<String>,
}

impl ConnectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inputs_transformer(mut self, f: impl Fn(Inputs) -> Inputs + Send + Sync + 'static) -> Self {
        self.inputs_transformers.push(InputsTransformer::new(f));
        self
    }

    pub fn result_transformer(mut self, f: impl Fn(Data) -> Data + Send + Sync + 'static) -> Self {
        self.result_transformers.push(ResultTransformer::new(f));
        self
    }

    pub fn errors_transformer(
        mut self,
        f: impl Fn(ErrorCollection) -> ErrorCollection + Send + Sync + 'static,
    ) -> Self {
        self.errors_transformers.push(ErrorsTransformer::new(f));
        self
    }

    pub fn pre_commit_transformer(
        mut self,
        f: impl Fn(&mut Data, Option<&dyn EntityLoader>) -> Result<(), CommandError> + Send + Sync + 'static,
    ) -> Self {
        self.pre_commit_transformers.push(PreCommitTransformer::new(f));
        self
    }

    /// Explicit serializers; these take precedence over every default.
    pub fn serializers(mut self, serializers: Vec<Arc<dyn Serializer>>) -> Self {
        self.serializers = Some(serializers);
        self
    }

    pub fn serializer_chain(self, chain: SerializerChain) -> Self {
        self.serializers(chain.serializers().to_vec())
    }

    pub fn allowed_rule(mut self, rule: AllowedRule) -> Self {
        self.allowed_rule = Some(AllowedRuleSpec::Rule(rule));
        self
    }

    /// Rules registered on the connector, by symbol.
    pub fn allowed_rules<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.allowed_rule = Some(AllowedRuleSpec::Named(names.into_iter().map(Into::into).collect()));
        self
    }

    /// Inline rule from a closure.
    pub fn allowed_if(self, logic: impl Fn(&AuthorizationContext<'_>) -> bool + Send + Sync + 'static) -> Self {
        self.allowed_rule(AllowedRule::inline(logic))
    }

    pub fn requires_authentication(mut self, requires: bool) -> Self {
        self.requires_authentication = requires;
        self
    }

    pub fn request_mutator(mut self, mutator: impl RequestMutator + 'static) -> Self {
        self.request_mutators.push(RequestMutatorEntry::Mutator(Arc::new(mutator)));
        self
    }

    pub fn request_sugar(mut self, sugar: RequestSugar) -> Self {
        self.request_mutators.push(RequestMutatorEntry::Sugar(sugar));
        self
    }

    /// `{set: {name: f}}` sugar for a single attribute.
    pub fn set_input(self, name: impl Into<String>, source: InputSource) -> Self {
        self.request_sugar(RequestSugar::new().section("set", [(name.into(), source)]))
    }

    /// `{default: {...}}` sugar.
    pub fn default_inputs<K: Into<String>>(self, defaults: impl IntoIterator<Item = (K, InputSource)>) -> Self {
        self.request_sugar(RequestSugar::new().section("default", defaults))
    }

    pub fn response_mutator(mut self, mutator: impl ResponseMutator + 'static) -> Self {
        self.response_mutators.push(Arc::new(mutator));
        self
    }

    pub fn capture_unknown_error(mut self, capture: bool) -> Self {
        self.capture_unknown_error = Some(capture);
        self
    }

    pub fn aggregate_entities(mut self, aggregate: bool) -> Self {
        self.aggregate_entities = aggregate;
        self
    }

    pub fn atomic_entities(mut self, atomic: bool) -> Self {
        self.atomic_entities = atomic;
        self
    }

    /// Register under `<command name><suffix>`.
    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    pub fn request_mutators(&self) -> &[RequestMutatorEntry] {
        &self.request_mutators
    }

    pub(crate) fn replace_request_mutators(&mut self, mutators: Vec<RequestMutatorEntry>) {
        self.request_mutators = mutators;
    }

    /// Whether any sugar is still waiting to be rewritten.
    pub fn has_sugar(&self) -> bool {
        self.request_mutators
            .iter()
            .any(|entry| matches!(entry, RequestMutatorEntry::Sugar(sugar) if !sugar.is_empty()))
    }
}
