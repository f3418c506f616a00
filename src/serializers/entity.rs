//! Entity-aware serializers.
//!
//! All three read only attributes that are already loaded. An unloaded
//! entity is always emitted as its primary key.

use serde_json::{Map, Value};

use crate::command::{Data, Entity};
use crate::persistence::Preload;
use crate::serializers::{Payload, Serializer};

/// An entity's attributes with nested entities as bare primary keys.
fn atom(entity: &Entity) -> Value {
    match entity.attributes() {
        Some(attributes) => {
            let mut out = Map::new();
            for (name, value) in attributes {
                out.insert(name.clone(), value.to_plain_json());
            }
            Value::Object(out)
        }
        None => entity.id().clone(),
    }
}

/// An entity's attributes with every loaded nested entity expanded.
fn aggregate(entity: &Entity) -> Value {
    match entity.attributes() {
        Some(attributes) => {
            let mut out = Map::new();
            for (name, value) in attributes {
                out.insert(name.clone(), value.to_json(&mut aggregate));
            }
            Value::Object(out)
        }
        None => entity.id().clone(),
    }
}

/// Top-level entities become atoms; references inside them become keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct AtomicSerializer;

impl Serializer for AtomicSerializer {
    fn name(&self) -> &str {
        "atomic"
    }

    fn serialize(&self, payload: Payload) -> Payload {
        match payload {
            Payload::Result(data) => Payload::Structured(data.to_json(&mut atom)),
            other => other,
        }
    }

    fn preload(&self) -> Option<Preload> {
        Some(Preload::Atoms)
    }
}

/// Entities with their associations nested in full.
#[derive(Debug, Clone, Copy, Default)]
pub struct AggregateSerializer;

impl Serializer for AggregateSerializer {
    fn name(&self) -> &str {
        "aggregate"
    }

    fn serialize(&self, payload: Payload) -> Payload {
        match payload {
            Payload::Result(data) => Payload::Structured(data.to_json(&mut aggregate)),
            other => other,
        }
    }

    fn preload(&self) -> Option<Preload> {
        Some(Preload::Aggregates)
    }
}

/// Every loaded entity in the result, at any depth, as
/// `{type_name: {id: atom}}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordStoreSerializer;

fn collect_records(data: &Data, store: &mut Map<String, Value>) {
    data.for_each_entity(&mut |entity| {
        let Some(attributes) = entity.attributes() else {
            return;
        };
        let table = store
            .entry(entity.type_name().to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(table) = table {
            table.entry(entity.id_key()).or_insert_with(|| atom(entity));
        }
        for value in attributes.values() {
            collect_records(value, store);
        }
    });
}

impl Serializer for RecordStoreSerializer {
    fn name(&self) -> &str {
        "record_store"
    }

    fn serialize(&self, payload: Payload) -> Payload {
        match payload {
            Payload::Result(data) => {
                let mut store = Map::new();
                collect_records(&data, &mut store);
                Payload::Structured(Value::Object(store))
            }
            other => other,
        }
    }

    fn preload(&self) -> Option<Preload> {
        Some(Preload::Aggregates)
    }
}
