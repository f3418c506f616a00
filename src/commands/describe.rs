//! Describe one exposed command.

use serde_json::Value;

use crate::command::{Data, Outcome};
use crate::commands::BuiltinCommand;
use crate::connector::TransformedCommand;
use crate::http::Request;
use crate::persistence;

#[derive(Debug, Clone, Copy)]
pub struct Describe<'a> {
    target: &'a TransformedCommand,
}

impl<'a> Describe<'a> {
    pub fn new(target: &'a TransformedCommand) -> Self {
        Self { target }
    }
}

impl BuiltinCommand for Describe<'_> {
    fn name(&self) -> &'static str {
        "describe"
    }

    fn run(&self, request: &Request) -> Outcome {
        let mut manifest = persistence::detached(|| self.target.to_manifest());
        if let Some(node) = manifest.as_object_mut() {
            let mut metadata = serde_json::Map::new();
            metadata.insert("url".to_string(), Value::String(request.url()));
            node.insert("metadata".to_string(), Value::Object(metadata));
        }
        Outcome::Success(Data::from(manifest))
    }
}
