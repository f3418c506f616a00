//! Inputs, result, errors and pre-commit transformers.

use std::fmt;
use std::sync::Arc;

use crate::command::{CommandError, Data, ErrorCollection, Inputs};
use crate::persistence::{self, EntityLoader, Preload};

/// A `T → T` step in a command's pipeline.
pub struct Transformer<T>(Arc<dyn Fn(T) -> T + Send + Sync>);

impl<T> Transformer<T> {
    pub fn new(f: impl Fn(T) -> T + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn apply(&self, value: T) -> T {
        (self.0)(value)
    }
}

impl<T> Clone for Transformer<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> fmt::Debug for Transformer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Transformer(..)")
    }
}

pub type InputsTransformer = Transformer<Inputs>;
pub type ResultTransformer = Transformer<Data>;
pub type ErrorsTransformer = Transformer<ErrorCollection>;

type PreCommitFn = dyn Fn(&mut Data, Option<&dyn EntityLoader>) -> Result<(), CommandError> + Send + Sync;

/// Runs on a successful result before serialization, while the persistence
/// boundary is still open.
#[derive(Clone)]
pub enum PreCommitTransformer {
    Preload(Preload),
    Custom(Arc<PreCommitFn>),
}

impl PreCommitTransformer {
    pub fn new(
        f: impl Fn(&mut Data, Option<&dyn EntityLoader>) -> Result<(), CommandError> + Send + Sync + 'static,
    ) -> Self {
        PreCommitTransformer::Custom(Arc::new(f))
    }

    pub fn apply(&self, data: &mut Data, loader: Option<&dyn EntityLoader>) -> Result<(), CommandError> {
        match self {
            // Without a loader there is nothing to load from; entities stay as they are.
            PreCommitTransformer::Preload(depth) => match loader {
                Some(loader) => persistence::preload(data, *depth, loader),
                None => Ok(()),
            },
            PreCommitTransformer::Custom(f) => f(data, loader),
        }
    }

    pub fn preload_depth(&self) -> Option<Preload> {
        match self {
            PreCommitTransformer::Preload(depth) => Some(*depth),
            PreCommitTransformer::Custom(_) => None,
        }
    }
}

impl fmt::Debug for PreCommitTransformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreCommitTransformer::Preload(depth) => write!(f, "PreCommitTransformer({})", depth.name()),
            PreCommitTransformer::Custom(_) => f.write_str("PreCommitTransformer(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_transformer_apply() {
        let double = ResultTransformer::new(|data| match data {
            Data::Number(n) => Data::from(n.as_i64().unwrap_or_default() * 2),
            other => other,
        });
        assert_eq!(double.apply(Data::from(8)), Data::from(16));
    }

    #[test]
    fn test_preload_without_loader_is_noop() {
        let mut data = Data::from(json!({"a": 1}));
        let before = data.clone();
        PreCommitTransformer::Preload(Preload::Aggregates).apply(&mut data, None).unwrap();
        assert_eq!(data, before);
    }
}
