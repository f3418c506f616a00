//! Entity loading and pre-commit preloads.

use std::collections::HashSet;

use serde_json::{json, Value};

use crate::command::{CommandError, Data, Entity, ErrorCategory, Record};
use crate::persistence::is_detached;

/// Reads entity attributes from storage.
pub trait EntityLoader: Send + Sync {
    /// Attributes of the `type_name` record identified by `id`, or `None`
    /// when it does not exist.
    fn load(&self, type_name: &str, id: &Value) -> Option<Record>;
}

/// How deep a pre-commit preload goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Preload {
    /// Outermost entities only; nested references stay keys.
    Atoms,
    /// Every reachable entity.
    Aggregates,
}

impl Preload {
    pub fn name(self) -> &'static str {
        match self {
            Preload::Atoms => "load_atoms",
            Preload::Aggregates => "load_aggregates",
        }
    }
}

/// Load a single entity in place. No-op when already loaded or detached.
pub fn load(loader: &dyn EntityLoader, entity: &mut Entity) -> Result<(), CommandError> {
    if entity.is_loaded() || is_detached() {
        return Ok(());
    }

    match loader.load(entity.type_name(), entity.id()) {
        Some(attributes) => {
            tracing::trace!(entity = %entity.type_name(), id = %entity.id(), "Loaded entity");
            entity.set_attributes(attributes);
            Ok(())
        }
        None => Err(not_found(entity)),
    }
}

/// Materialize entities in `data` before it is serialized.
pub fn preload(data: &mut Data, depth: Preload, loader: &dyn EntityLoader) -> Result<(), CommandError> {
    if is_detached() {
        return Ok(());
    }

    let mut result = Ok(());
    let mut visited = HashSet::new();
    data.for_each_entity_mut(&mut |entity| {
        if result.is_err() {
            return;
        }
        result = match depth {
            Preload::Atoms => load(loader, entity),
            Preload::Aggregates => load_aggregate(loader, entity, &mut visited),
        };
    });
    result
}

fn load_aggregate(
    loader: &dyn EntityLoader,
    entity: &mut Entity,
    visited: &mut HashSet<(String, String)>,
) -> Result<(), CommandError> {
    // Cycles (user -> referral -> user) stop at the first repeat, which
    // stays a bare reference.
    if !visited.insert((entity.type_name().to_string(), entity.id_key())) {
        return Ok(());
    }

    load(loader, entity)?;

    let Some(attributes) = entity.attributes_mut() else {
        return Ok(());
    };
    for value in attributes.values_mut() {
        let mut result = Ok(());
        value.for_each_entity_mut(&mut |nested| {
            if result.is_ok() {
                result = load_aggregate(loader, nested, visited);
            }
        });
        result?;
    }
    Ok(())
}

fn not_found(entity: &Entity) -> CommandError {
    CommandError::new(
        ErrorCategory::NotFound,
        format!("{}_not_found", snake_case(entity.type_name())),
        format!("Could not find {} for {}", entity.type_name(), entity.id()),
    )
    .with_context(json!({
        "entity_class": entity.type_name(),
        "criteria": entity.id(),
        "data_path": "",
    }))
}

pub(crate) fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
