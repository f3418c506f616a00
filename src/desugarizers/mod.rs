//! Desugarizing subsystem.
//!
//! # Data Flow
//! ```text
//! connect(command, ConnectOptions)
//!     → each applicable Desugarizer, in order (set, default, ...custom)
//!         consumes its own sugar section, emits concrete mutators
//!     → leftover sugar → ConnectError::UnrecognizedSugar
//!     → TransformedCommand registered
//! ```
//!
//! # Design Decisions
//! - Runs once per connect call, never per request
//! - Each desugarizer touches only its own section, so they compose and a
//!   second pass is a no-op
//! - Mutators keep the position of the sugar entry they came from

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::connector::{ConnectOptions, RequestMutatorEntry};
use crate::mutators::{DefaultInputs, InputFn, InputSource, RequestMutator, SetInputToProcResult};

/// Rewrites convenience configuration into canonical form.
pub trait Desugarizer: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &str;

    fn applicable(&self, options: &ConnectOptions) -> bool;

    fn desugarize(&self, options: ConnectOptions) -> ConnectOptions;
}

/// Rewrite every sugar entry's `section` with `expand`, leaving other
/// sections in place.
fn rewrite_section(
    mut options: ConnectOptions,
    section: &str,
    expand: impl Fn(BTreeMap<String, InputSource>) -> Vec<Arc<dyn RequestMutator>>,
) -> ConnectOptions {
    let mut rewritten = Vec::with_capacity(options.request_mutators().len());
    for entry in std::mem::take(&mut options.request_mutators) {
        match entry {
            RequestMutatorEntry::Sugar(mut sugar) => match sugar.take_section(section) {
                Some(values) => {
                    if !sugar.is_empty() {
                        rewritten.push(RequestMutatorEntry::Sugar(sugar));
                    }
                    rewritten.extend(expand(values).into_iter().map(RequestMutatorEntry::Mutator));
                }
                None => rewritten.push(RequestMutatorEntry::Sugar(sugar)),
            },
            mutator => rewritten.push(mutator),
        }
    }
    options.replace_request_mutators(rewritten);
    options
}

fn has_section(options: &ConnectOptions, section: &str) -> bool {
    options
        .request_mutators()
        .iter()
        .any(|entry| matches!(entry, RequestMutatorEntry::Sugar(sugar) if sugar.has_section(section)))
}

/// `set: {attr: f}` → one [`SetInputToProcResult`] per attribute.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetInputToProcResultDesugarizer;

impl Desugarizer for SetInputToProcResultDesugarizer {
    fn name(&self) -> &str {
        "set"
    }

    fn applicable(&self, options: &ConnectOptions) -> bool {
        has_section(options, "set")
    }

    fn desugarize(&self, options: ConnectOptions) -> ConnectOptions {
        rewrite_section(options, "set", |values| {
            values
                .into_iter()
                .map(|(name, source)| {
                    let f = match source {
                        InputSource::Proc(f) => f,
                        InputSource::Value(value) => InputFn::new(move |_| value.clone()),
                    };
                    Arc::new(SetInputToProcResult::new(name, f)) as Arc<dyn RequestMutator>
                })
                .collect()
        })
    }
}

/// `default: {attr: value_or_f}` → one [`DefaultInputs`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultInputsDesugarizer;

impl Desugarizer for DefaultInputsDesugarizer {
    fn name(&self) -> &str {
        "default"
    }

    fn applicable(&self, options: &ConnectOptions) -> bool {
        has_section(options, "default")
    }

    fn desugarize(&self, options: ConnectOptions) -> ConnectOptions {
        rewrite_section(options, "default", |values| {
            vec![Arc::new(DefaultInputs::new(values)) as Arc<dyn RequestMutator>]
        })
    }
}

/// Installed on every connector, in this order.
pub fn default_desugarizers() -> Vec<Arc<dyn Desugarizer>> {
    vec![
        Arc::new(SetInputToProcResultDesugarizer),
        Arc::new(DefaultInputsDesugarizer),
    ]
}

/// Run every applicable desugarizer once, in order.
pub fn desugarize_all(desugarizers: &[Arc<dyn Desugarizer>], mut options: ConnectOptions) -> ConnectOptions {
    for desugarizer in desugarizers {
        if desugarizer.applicable(&options) {
            tracing::trace!(desugarizer = %desugarizer.name(), "Desugarizing connect options");
            options = desugarizer.desugarize(options);
        }
    }
    options
}

/// Sections no desugarizer consumed.
pub fn leftover_sugar(options: &ConnectOptions) -> Vec<String> {
    let mut names = Vec::new();
    for entry in options.request_mutators() {
        if let RequestMutatorEntry::Sugar(sugar) = entry {
            names.extend(sugar.section_names().map(str::to_string));
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::RequestSugar;
    use serde_json::json;

    fn mutator_count(options: &ConnectOptions) -> usize {
        options
            .request_mutators()
            .iter()
            .filter(|e| matches!(e, RequestMutatorEntry::Mutator(_)))
            .count()
    }

    #[test]
    fn test_set_sugar_becomes_one_mutator_per_attribute() {
        let options = ConnectOptions::new().request_sugar(
            RequestSugar::new().section(
                "set",
                [
                    ("foo", InputSource::proc(|_| json!("a"))),
                    ("bar", InputSource::proc(|_| json!("b"))),
                ],
            ),
        );
        let options = desugarize_all(&default_desugarizers(), options);
        assert_eq!(mutator_count(&options), 2);
        assert!(!options.has_sugar());
    }

    #[test]
    fn test_mixed_sections_compose() {
        let options = ConnectOptions::new().request_sugar(
            RequestSugar::new()
                .section("set", [("foo", InputSource::proc(|_| json!("a")))])
                .section("default", [("bar", InputSource::Value(json!("b")))]),
        );
        let options = desugarize_all(&default_desugarizers(), options);
        assert_eq!(mutator_count(&options), 2);
        assert!(leftover_sugar(&options).is_empty());
    }

    #[test]
    fn test_idempotent() {
        let options = ConnectOptions::new().default_inputs([("foo", InputSource::Value(json!(1)))]);
        let once = desugarize_all(&default_desugarizers(), options);
        let twice = desugarize_all(&default_desugarizers(), once.clone());
        assert_eq!(mutator_count(&once), mutator_count(&twice));
    }

    #[test]
    fn test_unrecognized_sugar_left_alone() {
        let options = ConnectOptions::new()
            .request_sugar(RequestSugar::new().section("frobnicate", [("foo", InputSource::Value(json!(1)))]));
        let options = desugarize_all(&default_desugarizers(), options);
        assert_eq!(leftover_sugar(&options), vec!["frobnicate".to_string()]);
    }
}
