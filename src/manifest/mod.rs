//! Manifest subsystem.
//!
//! The manifest is the introspection document behind `describe`, `list`,
//! `manifest`, `describe_type` and `help`.
//!
//! # Data Flow
//! ```text
//! CommandRegistry (exposed TransformedCommands) + RuleRegistry
//!     → Manifest::build (inside persistence::detached)
//!         command / type / error / domain / organization / processor sections
//!     → metadata.url stamped from the request
//!     → lookup.rs resolves names for help (absolute → general → relaxed)
//! ```
//!
//! # Design Decisions
//! - Built from the connector-facing (mutator-adjusted) types, never the
//!   command's own declarations
//! - Building is always detached so introspection cannot load entities
//! - Plain `serde_json::Value` underneath; presenters read it directly

pub mod lookup;

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{json, Map, Value};

use crate::connector::{AllowedRule, TransformedCommand};
use crate::persistence;

pub use lookup::{resolve, LookupMode, ManifestCategory, ManifestReference, Namespace};

const BUILTIN_TYPES: [&str; 8] = ["duck", "integer", "number", "string", "boolean", "array", "attributes", "entity"];

pub const GLOBAL_ORGANIZATION: &str = "global_organization";
pub const GLOBAL_DOMAIN: &str = "global_domain";

/// `Org::Domain::Command` → (organization, domain).
pub fn scope_of(full_name: &str) -> (String, String) {
    let segments: Vec<&str> = full_name.split("::").collect();
    match segments.len() {
        0 | 1 => (GLOBAL_ORGANIZATION.to_string(), GLOBAL_DOMAIN.to_string()),
        2 => (GLOBAL_ORGANIZATION.to_string(), segments[0].to_string()),
        n => (segments[0].to_string(), segments[..n - 1].join("::")),
    }
}

/// The introspection document.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest(Value);

impl Manifest {
    /// Build from exposed commands and the connector's registered rules.
    pub fn build<'a>(
        commands: impl IntoIterator<Item = &'a TransformedCommand>,
        rules: impl IntoIterator<Item = &'a AllowedRule>,
    ) -> Self {
        persistence::detached(|| {
            let mut command_section = Map::new();
            let mut type_names = BTreeSet::new();
            let mut errors = Map::new();
            let mut domains: BTreeMap<String, (String, Vec<String>)> = BTreeMap::new();
            let mut organizations: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
            let mut processors = Map::new();

            for rule in rules {
                processors.insert(rule.symbol().to_string(), rule.to_manifest());
            }

            for command in commands {
                let name = command.name().to_string();
                command.inputs_type().collect_type_names(&mut type_names);
                command.result_type().collect_type_names(&mut type_names);
                for error in command.possible_errors() {
                    errors.insert(error.key(), error.to_manifest());
                }
                for rule in command.allowed_rules() {
                    processors
                        .entry(rule.symbol().to_string())
                        .or_insert_with(|| rule.to_manifest());
                }

                let (organization, domain) = scope_of(&name);
                organizations.entry(organization.clone()).or_default().insert(domain.clone());
                domains
                    .entry(domain)
                    .or_insert_with(|| (organization, Vec::new()))
                    .1
                    .push(name.clone());

                command_section.insert(name, command.to_manifest());
            }

            let types: Map<String, Value> = type_names
                .into_iter()
                .map(|name| {
                    let kind = if BUILTIN_TYPES.contains(&name.as_str()) { "builtin" } else { "entity" };
                    let node = json!({
                        "name": name,
                        "kind": kind,
                        "declaration_data": { "type": name },
                    });
                    (name, node)
                })
                .collect();

            let domain_section: Map<String, Value> = domains
                .into_iter()
                .map(|(name, (organization, commands))| {
                    let node = json!({
                        "name": name,
                        "organization": organization,
                        "commands": commands,
                    });
                    (name, node)
                })
                .collect();

            let organization_section: Map<String, Value> = organizations
                .into_iter()
                .map(|(name, domains)| {
                    let node = json!({ "name": name, "domains": domains });
                    (name, node)
                })
                .collect();

            Manifest(json!({
                "command": command_section,
                "type": types,
                "error": errors,
                "domain": domain_section,
                "organization": organization_section,
                "processor": processors,
                "metadata": {},
            }))
        })
    }

    /// Stamp `metadata.url`.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        if let Some(metadata) = self.0.get_mut("metadata").and_then(Value::as_object_mut) {
            metadata.insert("url".to_string(), Value::String(url.into()));
        }
        self
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    pub fn section(&self, category: ManifestCategory) -> Option<&Map<String, Value>> {
        self.0.get(category.key()).and_then(Value::as_object)
    }

    pub fn get(&self, category: ManifestCategory, reference: &str) -> Option<&Value> {
        self.section(category).and_then(|section| section.get(reference))
    }

    pub fn contains(&self, category: ManifestCategory, reference: &str) -> bool {
        self.get(category, reference).is_some()
    }

    /// `[{name, description}]` for every exposed command.
    pub fn command_list(&self) -> Value {
        let commands: Vec<Value> = self
            .section(ManifestCategory::Command)
            .into_iter()
            .flat_map(|section| section.iter())
            .map(|(name, node)| {
                json!({
                    "name": name,
                    "description": node.get("description").cloned().unwrap_or(Value::Null),
                })
            })
            .collect();
        Value::Array(commands)
    }

    fn references(&self) -> Vec<(ManifestCategory, &str)> {
        let mut references = Vec::new();
        for category in ManifestCategory::ALL {
            if let Some(section) = self.section(category) {
                references.extend(section.keys().map(|key| (category, key.as_str())));
            }
        }
        references
    }
}

impl Namespace for Manifest {
    fn lookup(&self, name: &str, mode: LookupMode) -> Option<ManifestReference> {
        let references = self.references();
        let (category, reference) = resolve(references, name, mode)?;
        let manifest = self.get(category, reference)?.clone();
        Some(ManifestReference {
            category,
            reference: reference.to_string(),
            manifest,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_of() {
        assert_eq!(
            scope_of("ComputeExponential"),
            (GLOBAL_ORGANIZATION.to_string(), GLOBAL_DOMAIN.to_string())
        );
        assert_eq!(scope_of("Math::Add"), (GLOBAL_ORGANIZATION.to_string(), "Math".to_string()));
        assert_eq!(scope_of("Acme::Math::Add"), ("Acme".to_string(), "Acme::Math".to_string()));
    }

    #[test]
    fn test_empty_manifest_with_url() {
        let manifest = Manifest::build([], []).with_url("http://localhost/manifest");
        assert_eq!(manifest.as_value()["metadata"]["url"], "http://localhost/manifest");
        assert_eq!(manifest.command_list(), json!([]));
        assert!(manifest.lookup("Anything", LookupMode::Relaxed).is_none());
    }
}
