//! Declared input/result types.
//!
//! Just enough of a type system to cast transport inputs (query strings are
//! always strings) and to describe commands in the manifest. Mutators edit
//! these declarations so documentation matches the wire shape.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{json, Number, Value};

use crate::command::{CommandError, ErrorCollection, Inputs};

#[derive(Debug, Clone, PartialEq)]
pub enum TypeDeclaration {
    /// Anything.
    Duck,
    Integer,
    Number,
    String,
    Boolean,
    Array(Box<TypeDeclaration>),
    Attributes(Attributes),
    /// A reference to an entity type by name.
    Entity(String),
}

impl TypeDeclaration {
    pub fn array(element: TypeDeclaration) -> Self {
        TypeDeclaration::Array(Box::new(element))
    }

    pub fn entity(name: impl Into<String>) -> Self {
        TypeDeclaration::Entity(name.into())
    }

    /// The type's name as it appears in manifests.
    pub fn type_name(&self) -> &str {
        match self {
            TypeDeclaration::Duck => "duck",
            TypeDeclaration::Integer => "integer",
            TypeDeclaration::Number => "number",
            TypeDeclaration::String => "string",
            TypeDeclaration::Boolean => "boolean",
            TypeDeclaration::Array(_) => "array",
            TypeDeclaration::Attributes(_) => "attributes",
            TypeDeclaration::Entity(name) => name,
        }
    }

    pub fn to_manifest(&self) -> Value {
        match self {
            TypeDeclaration::Array(element) => json!({
                "type": "array",
                "element_type_declaration": element.to_manifest(),
            }),
            TypeDeclaration::Attributes(attributes) => attributes.to_manifest(),
            other => json!({ "type": other.type_name() }),
        }
    }

    /// Every type name this declaration mentions, nested ones included.
    pub fn collect_type_names(&self, names: &mut BTreeSet<String>) {
        names.insert(self.type_name().to_string());
        match self {
            TypeDeclaration::Array(element) => element.collect_type_names(names),
            TypeDeclaration::Attributes(attributes) => {
                for element in attributes.elements.values() {
                    element.collect_type_names(names);
                }
            }
            _ => {}
        }
    }

    /// Drop an attribute. Non-attribute declarations are returned unchanged.
    pub fn reject_attribute(self, name: &str) -> Self {
        match self {
            TypeDeclaration::Attributes(attributes) => TypeDeclaration::Attributes(attributes.reject(name)),
            other => other,
        }
    }

    /// Mark attributes as defaulted. Non-attribute declarations are returned
    /// unchanged.
    pub fn with_defaults(self, defaults: &BTreeMap<String, Option<Value>>) -> Self {
        match self {
            TypeDeclaration::Attributes(attributes) => TypeDeclaration::Attributes(attributes.with_defaults(defaults)),
            other => other,
        }
    }

    pub fn as_attributes(&self) -> Option<&Attributes> {
        match self {
            TypeDeclaration::Attributes(attributes) => Some(attributes),
            _ => None,
        }
    }

    /// Cast a raw transport value.
    pub fn cast(&self, value: Value, path: &[String]) -> Result<Value, ErrorCollection> {
        if value.is_null() {
            return Ok(value);
        }
        match self {
            TypeDeclaration::Duck | TypeDeclaration::Entity(_) => Ok(value),
            TypeDeclaration::Integer => cast_integer(&value).ok_or_else(|| cannot_cast(value, self, path)),
            TypeDeclaration::Number => cast_number(&value).ok_or_else(|| cannot_cast(value, self, path)),
            TypeDeclaration::String => match value {
                Value::String(_) => Ok(value),
                Value::Number(n) => Ok(Value::String(n.to_string())),
                Value::Bool(b) => Ok(Value::String(b.to_string())),
                other => Err(cannot_cast(other, self, path)),
            },
            TypeDeclaration::Boolean => match &value {
                Value::Bool(_) => Ok(value),
                Value::String(s) if s == "true" => Ok(Value::Bool(true)),
                Value::String(s) if s == "false" => Ok(Value::Bool(false)),
                _ => Err(cannot_cast(value, self, path)),
            },
            TypeDeclaration::Array(element) => match value {
                Value::Array(items) => {
                    let mut errors = ErrorCollection::new();
                    let mut cast = Vec::with_capacity(items.len());
                    for (index, item) in items.into_iter().enumerate() {
                        let mut item_path = path.to_vec();
                        item_path.push(index.to_string());
                        match element.cast(item, &item_path) {
                            Ok(v) => cast.push(v),
                            Err(e) => errors.extend(e),
                        }
                    }
                    if errors.is_empty() {
                        Ok(Value::Array(cast))
                    } else {
                        Err(errors)
                    }
                }
                other => Err(cannot_cast(other, self, path)),
            },
            TypeDeclaration::Attributes(attributes) => match value {
                Value::Object(map) => attributes.cast_at(map, path).map(Value::Object),
                other => Err(cannot_cast(other, self, path)),
            },
        }
    }
}

fn cast_integer(value: &Value) -> Option<Value> {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(value.clone()),
        // `i64::MAX as f64` rounds up to 2^63, so the upper bound is exclusive.
        Value::Number(n) => n
            .as_f64()
            .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
            .map(|f| Value::Number(Number::from(f as i64))),
        Value::String(s) => s.trim().parse::<i64>().ok().map(|i| Value::Number(i.into())),
        _ => None,
    }
}

fn cast_number(value: &Value) -> Option<Value> {
    match value {
        Value::Number(_) => Some(value.clone()),
        Value::String(s) => {
            let trimmed = s.trim();
            if let Ok(i) = trimmed.parse::<i64>() {
                return Some(Value::Number(i.into()));
            }
            trimmed
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
        }
        _ => None,
    }
}

fn cannot_cast(value: Value, to: &TypeDeclaration, path: &[String]) -> ErrorCollection {
    let attribute = path.last().cloned().unwrap_or_default();
    ErrorCollection::from(
        CommandError::data(path.to_vec(), "cannot_cast", format!("Cannot cast {value} to {}", to.type_name()))
            .with_context(json!({
                "attribute_name": attribute,
                "value": value,
                "cast_to": to.type_name(),
            })),
    )
}

/// An attributes (record) declaration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    elements: BTreeMap<String, TypeDeclaration>,
    required: Vec<String>,
    defaults: BTreeMap<String, Value>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attribute(mut self, name: impl Into<String>, declaration: TypeDeclaration) -> Self {
        self.elements.insert(name.into(), declaration);
        self
    }

    pub fn required_attribute(mut self, name: impl Into<String>, declaration: TypeDeclaration) -> Self {
        let name = name.into();
        if !self.required.contains(&name) {
            self.required.push(name.clone());
        }
        self.elements.insert(name, declaration);
        self
    }

    pub fn default_value(mut self, name: impl Into<String>, value: Value) -> Self {
        self.defaults.insert(name.into(), value);
        self
    }

    pub fn elements(&self) -> &BTreeMap<String, TypeDeclaration> {
        &self.elements
    }

    pub fn required(&self) -> &[String] {
        &self.required
    }

    pub fn defaults(&self) -> &BTreeMap<String, Value> {
        &self.defaults
    }

    pub fn reject(mut self, name: &str) -> Self {
        self.elements.remove(name);
        self.required.retain(|r| r != name);
        self.defaults.remove(name);
        self
    }

    /// Record defaults. Every listed attribute stops being required; only
    /// literal values can be shown in the manifest.
    pub fn with_defaults(mut self, defaults: &BTreeMap<String, Option<Value>>) -> Self {
        for (name, value) in defaults {
            if let Some(value) = value {
                self.defaults.insert(name.clone(), value.clone());
            }
            self.required.retain(|r| r != name);
        }
        self
    }

    pub fn to_manifest(&self) -> Value {
        let mut manifest = serde_json::Map::new();
        manifest.insert("type".to_string(), json!("attributes"));
        let elements: serde_json::Map<String, Value> = self
            .elements
            .iter()
            .map(|(name, declaration)| (name.clone(), declaration.to_manifest()))
            .collect();
        manifest.insert("element_type_declarations".to_string(), Value::Object(elements));
        if !self.required.is_empty() {
            manifest.insert("required".to_string(), json!(self.required));
        }
        if !self.defaults.is_empty() {
            manifest.insert("defaults".to_string(), json!(self.defaults));
        }
        Value::Object(manifest)
    }

    /// Cast top-level inputs.
    pub fn cast(&self, inputs: Inputs) -> Result<Inputs, ErrorCollection> {
        self.cast_at(inputs, &[])
    }

    fn cast_at(&self, inputs: Inputs, path: &[String]) -> Result<Inputs, ErrorCollection> {
        let mut errors = ErrorCollection::new();

        let unexpected: Vec<&String> = inputs.keys().filter(|k| !self.elements.contains_key(*k)).collect();
        if !unexpected.is_empty() {
            let allowed: Vec<&String> = self.elements.keys().collect();
            errors.push(
                CommandError::data(
                    path.to_vec(),
                    "unexpected_attributes",
                    format!("Unexpected attributes {unexpected:?}. Expected only {allowed:?}"),
                )
                .with_context(json!({
                    "unexpected_attributes": unexpected,
                    "allowed_attributes": allowed,
                })),
            );
            return Err(errors);
        }

        let mut inputs = inputs;
        for (name, value) in &self.defaults {
            if !inputs.contains_key(name) {
                inputs.insert(name.clone(), value.clone());
            }
        }

        let mut cast = Inputs::new();
        for (name, value) in inputs {
            let mut element_path = path.to_vec();
            element_path.push(name.clone());
            let Some(declaration) = self.elements.get(&name) else {
                continue;
            };
            match declaration.cast(value, &element_path) {
                Ok(v) => {
                    cast.insert(name, v);
                }
                Err(e) => errors.extend(e),
            }
        }

        for name in &self.required {
            let present = cast.get(name).is_some_and(|v| !v.is_null());
            if !present && !errors.iter().any(|e| e.path().last() == Some(name)) {
                let mut element_path = path.to_vec();
                element_path.push(name.clone());
                errors.push(
                    CommandError::data(
                        element_path,
                        "missing_required_attribute",
                        format!("Missing required attribute {name}"),
                    )
                    .with_context(json!({ "attribute_name": name })),
                );
            }
        }

        if errors.is_empty() {
            Ok(cast)
        } else {
            Err(errors)
        }
    }
}
