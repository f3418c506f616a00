//! Serialization subsystem.
//!
//! # Data Flow
//! ```text
//! Outcome
//!     → Payload::Result(Data) | Payload::Errors(ErrorCollection)
//!     → structural serializers, in chain order (errors, atomic, aggregate, record store)
//!     → Payload::Structured(Value)
//!     → [response mutators may move attributes out]
//!     → encoders (json)
//!     → Payload::Encoded(String) on the wire
//! ```
//!
//! # Design Decisions
//! - Serializers are strategy objects behind a trait, composed as a chain
//! - A serializer only declares the preload depth it needs; the connector
//!   registers the loader as a pre-commit step, so serializers never load
//! - Each serializer ignores payload shapes it does not handle

pub mod entity;
pub mod json;

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::command::{Data, ErrorCollection};
use crate::persistence::Preload;

pub use entity::{AggregateSerializer, AtomicSerializer, RecordStoreSerializer};
pub use json::{ErrorsSerializer, JsonSerializer, PassThroughSerializer};

pub const APPLICATION_JSON: &str = "application/json";

/// A response body at some stage of serialization.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// A successful command result, not yet shaped.
    Result(Data),
    /// A failed outcome's errors, not yet shaped.
    Errors(ErrorCollection),
    /// Shaped but not encoded.
    Structured(Value),
    /// Final wire text.
    Encoded(String),
}

impl Payload {
    /// Plain JSON view of any stage. Entities collapse to their ids.
    pub fn to_json(&self) -> Value {
        match self {
            Payload::Result(data) => data.to_plain_json(),
            Payload::Errors(errors) => errors.to_json(),
            Payload::Structured(value) => value.clone(),
            Payload::Encoded(text) => Value::String(text.clone()),
        }
    }

    /// Wire text. Unencoded payloads are rendered as compact JSON.
    pub fn to_wire(&self) -> String {
        match self {
            Payload::Encoded(text) => text.clone(),
            other => other.to_json().to_string(),
        }
    }
}

/// One step of a serializer chain.
pub trait Serializer: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn serialize(&self, payload: Payload) -> Payload;

    /// Encoders produce wire text and run after response mutators.
    fn is_encoder(&self) -> bool {
        false
    }

    fn content_type(&self) -> Option<&str> {
        None
    }

    /// Entities this serializer expects to be loaded before it runs.
    fn preload(&self) -> Option<Preload> {
        None
    }
}

/// An ordered list of serializers.
#[derive(Debug, Clone, Default)]
pub struct SerializerChain(Vec<Arc<dyn Serializer>>);

impl SerializerChain {
    pub fn new(serializers: Vec<Arc<dyn Serializer>>) -> Self {
        Self(serializers)
    }

    pub fn serializers(&self) -> &[Arc<dyn Serializer>] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(|s| s.name()).collect()
    }

    /// Apply the structural (non-encoder) serializers.
    pub fn structure(&self, payload: Payload) -> Payload {
        self.0
            .iter()
            .filter(|s| !s.is_encoder())
            .fold(payload, |payload, s| s.serialize(payload))
    }

    /// Apply the encoders.
    pub fn encode(&self, payload: Payload) -> Payload {
        self.0
            .iter()
            .filter(|s| s.is_encoder())
            .fold(payload, |payload, s| s.serialize(payload))
    }

    pub fn content_type(&self) -> Option<&str> {
        self.0.iter().rev().find_map(|s| s.content_type())
    }

    pub fn is_json(&self) -> bool {
        self.0.iter().any(|s| s.content_type() == Some(APPLICATION_JSON))
    }

    /// The deepest preload any serializer needs.
    pub fn preload(&self) -> Option<Preload> {
        let mut preload = None;
        for needed in self.0.iter().filter_map(|s| s.preload()) {
            preload = match (preload, needed) {
                (Some(Preload::Aggregates), _) | (_, Preload::Aggregates) => Some(Preload::Aggregates),
                _ => Some(Preload::Atoms),
            };
        }
        preload
    }
}

impl FromIterator<Arc<dyn Serializer>> for SerializerChain {
    fn from_iter<I: IntoIterator<Item = Arc<dyn Serializer>>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Errors, atomic entities, JSON.
pub fn default_serializers() -> SerializerChain {
    SerializerChain::new(vec![
        Arc::new(ErrorsSerializer),
        Arc::new(AtomicSerializer),
        Arc::new(JsonSerializer),
    ])
}

/// Look up a serializer by its configuration name.
pub fn serializer_by_name(name: &str) -> Option<Arc<dyn Serializer>> {
    let serializer: Arc<dyn Serializer> = match name {
        "pass_through" => Arc::new(PassThroughSerializer),
        "errors" => Arc::new(ErrorsSerializer),
        "json" => Arc::new(JsonSerializer),
        "atomic" => Arc::new(AtomicSerializer),
        "aggregate" => Arc::new(AggregateSerializer),
        "record_store" => Arc::new(RecordStoreSerializer),
        _ => return None,
    };
    Some(serializer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandError;
    use serde_json::json;

    #[test]
    fn test_default_chain() {
        let chain = default_serializers();
        assert_eq!(chain.names(), vec!["errors", "atomic", "json"]);
        assert!(chain.is_json());
        assert_eq!(chain.preload(), Some(Preload::Atoms));
    }

    #[test]
    fn test_structure_then_encode() {
        let chain = default_serializers();
        let structured = chain.structure(Payload::Result(Data::from(8)));
        assert_eq!(structured, Payload::Structured(json!(8)));
        assert_eq!(chain.encode(structured), Payload::Encoded("8".to_string()));
    }

    #[test]
    fn test_errors_keyed_by_error_key() {
        let chain = default_serializers();
        let errors = ErrorCollection::from(CommandError::unauthenticated());
        let wire = chain.encode(chain.structure(Payload::Errors(errors))).to_wire();
        let parsed: Value = serde_json::from_str(&wire).unwrap();
        assert_eq!(parsed.as_object().unwrap().keys().collect::<Vec<_>>(), vec!["runtime.unauthenticated"]);
    }

    #[test]
    fn test_aggregate_wins_preload() {
        let chain = SerializerChain::new(vec![Arc::new(AtomicSerializer), Arc::new(AggregateSerializer)]);
        assert_eq!(chain.preload(), Some(Preload::Aggregates));
        assert_eq!(SerializerChain::default().preload(), None);
    }

    #[test]
    fn test_serializer_by_name() {
        assert_eq!(serializer_by_name("record_store").unwrap().name(), "record_store");
        assert!(serializer_by_name("yaml").is_none());
    }
}
