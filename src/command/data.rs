//! Command result values.

use std::collections::BTreeMap;

use serde_json::{Number, Value};

/// Attribute name → value.
pub type Record = BTreeMap<String, Data>;

/// A command result.
///
/// Mirrors JSON, plus an `Entity` variant so serializers can decide how
/// persisted records are emitted (bare key, atom, aggregate).
#[derive(Debug, Clone, PartialEq)]
pub enum Data {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    List(Vec<Data>),
    Record(Record),
    Entity(Entity),
}

impl Data {
    /// Render as JSON, delegating every entity to `entity`.
    ///
    /// Entities nested inside an entity's attributes are not visited here;
    /// the callback decides how deep to go.
    pub fn to_json(&self, entity: &mut dyn FnMut(&Entity) -> Value) -> Value {
        match self {
            Data::Null => Value::Null,
            Data::Bool(b) => Value::Bool(*b),
            Data::Number(n) => Value::Number(n.clone()),
            Data::String(s) => Value::String(s.clone()),
            Data::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(item.to_json(entity));
                }
                Value::Array(out)
            }
            Data::Record(record) => {
                let mut out = serde_json::Map::new();
                for (key, value) in record {
                    out.insert(key.clone(), value.to_json(entity));
                }
                Value::Object(out)
            }
            Data::Entity(e) => entity(e),
        }
    }

    /// Plain JSON with every entity collapsed to its primary key.
    pub fn to_plain_json(&self) -> Value {
        self.to_json(&mut |entity| entity.id().clone())
    }

    /// Visit the outermost entities: those not nested inside another entity.
    pub fn for_each_entity_mut(&mut self, f: &mut dyn FnMut(&mut Entity)) {
        match self {
            Data::List(items) => {
                for item in items {
                    item.for_each_entity_mut(f);
                }
            }
            Data::Record(record) => {
                for value in record.values_mut() {
                    value.for_each_entity_mut(f);
                }
            }
            Data::Entity(entity) => f(entity),
            _ => {}
        }
    }

    /// Visit the outermost entities immutably.
    pub fn for_each_entity(&self, f: &mut dyn FnMut(&Entity)) {
        match self {
            Data::List(items) => {
                for item in items {
                    item.for_each_entity(f);
                }
            }
            Data::Record(record) => {
                for value in record.values() {
                    value.for_each_entity(f);
                }
            }
            Data::Entity(entity) => f(entity),
            _ => {}
        }
    }
}

impl From<Value> for Data {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Data::Null,
            Value::Bool(b) => Data::Bool(b),
            Value::Number(n) => Data::Number(n),
            Value::String(s) => Data::String(s),
            Value::Array(items) => Data::List(items.into_iter().map(Data::from).collect()),
            Value::Object(map) => Data::Record(map.into_iter().map(|(k, v)| (k, Data::from(v))).collect()),
        }
    }
}

impl From<i64> for Data {
    fn from(value: i64) -> Self {
        Data::Number(value.into())
    }
}

impl From<bool> for Data {
    fn from(value: bool) -> Self {
        Data::Bool(value)
    }
}

impl From<&str> for Data {
    fn from(value: &str) -> Self {
        Data::String(value.to_string())
    }
}

impl From<String> for Data {
    fn from(value: String) -> Self {
        Data::String(value)
    }
}

impl From<Record> for Data {
    fn from(value: Record) -> Self {
        Data::Record(value)
    }
}

impl From<Entity> for Data {
    fn from(value: Entity) -> Self {
        Data::Entity(value)
    }
}

/// A persisted record, possibly not loaded yet.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    type_name: String,
    primary_key: String,
    id: Value,
    attributes: Option<Record>,
}

impl Entity {
    /// A reference to a record whose attributes have not been read.
    pub fn unloaded(type_name: impl Into<String>, primary_key: impl Into<String>, id: impl Into<Value>) -> Self {
        Self {
            type_name: type_name.into(),
            primary_key: primary_key.into(),
            id: id.into(),
            attributes: None,
        }
    }

    /// A fully materialized record. The primary key attribute is filled in
    /// from `id` when missing.
    pub fn loaded(
        type_name: impl Into<String>,
        primary_key: impl Into<String>,
        id: impl Into<Value>,
        attributes: Record,
    ) -> Self {
        let mut entity = Self::unloaded(type_name, primary_key, id);
        entity.set_attributes(attributes);
        entity
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn id(&self) -> &Value {
        &self.id
    }

    /// The id as a table key, used by the record-store layout.
    pub fn id_key(&self) -> String {
        match &self.id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.attributes.is_some()
    }

    pub fn attributes(&self) -> Option<&Record> {
        self.attributes.as_ref()
    }

    pub fn attributes_mut(&mut self) -> Option<&mut Record> {
        self.attributes.as_mut()
    }

    pub(crate) fn set_attributes(&mut self, mut attributes: Record) {
        attributes
            .entry(self.primary_key.clone())
            .or_insert_with(|| Data::from(self.id.clone()));
        self.attributes = Some(attributes);
    }
}
