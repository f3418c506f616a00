//! Name resolution over manifest nodes.

use std::fmt;

use serde_json::Value;

/// Manifest sections, in lookup order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ManifestCategory {
    Command,
    Type,
    Error,
    Domain,
    Organization,
    Processor,
}

impl ManifestCategory {
    pub const ALL: [ManifestCategory; 6] = [
        ManifestCategory::Command,
        ManifestCategory::Type,
        ManifestCategory::Error,
        ManifestCategory::Domain,
        ManifestCategory::Organization,
        ManifestCategory::Processor,
    ];

    /// Key of this section in the manifest document.
    pub fn key(self) -> &'static str {
        match self {
            ManifestCategory::Command => "command",
            ManifestCategory::Type => "type",
            ManifestCategory::Error => "error",
            ManifestCategory::Domain => "domain",
            ManifestCategory::Organization => "organization",
            ManifestCategory::Processor => "processor",
        }
    }
}

impl fmt::Display for ManifestCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// How permissive a name lookup is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupMode {
    /// Exact reference.
    Absolute,
    /// Exact, or a unique `::`-suffix match.
    General,
    /// Case-insensitive suffix match; first hit in category order.
    Relaxed,
}

impl LookupMode {
    /// Absolute → General → Relaxed.
    pub const PROGRESSION: [LookupMode; 3] = [LookupMode::Absolute, LookupMode::General, LookupMode::Relaxed];
}

/// A found manifest node.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestReference {
    pub category: ManifestCategory,
    pub reference: String,
    pub manifest: Value,
}

/// Something names can be resolved against.
pub trait Namespace: Send + Sync {
    fn lookup(&self, name: &str, mode: LookupMode) -> Option<ManifestReference>;
}

fn suffix_matches(reference: &str, name: &str) -> bool {
    reference == name || reference.ends_with(&format!("::{name}"))
}

/// Resolve `name` among `references` (category order preserved).
///
/// General mode gives up on ambiguity rather than guessing.
pub fn resolve<'a, I>(references: I, name: &str, mode: LookupMode) -> Option<(ManifestCategory, &'a str)>
where
    I: IntoIterator<Item = (ManifestCategory, &'a str)>,
{
    let references: Vec<(ManifestCategory, &'a str)> = references.into_iter().collect();
    match mode {
        LookupMode::Absolute => references.into_iter().find(|(_, r)| *r == name),
        LookupMode::General => {
            if let Some(exact) = references.iter().find(|(_, r)| *r == name) {
                return Some(*exact);
            }
            let mut matches = references.into_iter().filter(|(_, r)| suffix_matches(r, name));
            let first = matches.next()?;
            matches.next().is_none().then_some(first)
        }
        LookupMode::Relaxed => {
            let lowered = name.to_lowercase();
            references
                .into_iter()
                .find(|(_, r)| suffix_matches(&r.to_lowercase(), &lowered))
        }
    }
}
