//! Manifest, list and describe_type.

use crate::command::{CommandError, Data, Outcome};
use crate::commands::BuiltinCommand;
use crate::http::Request;
use crate::manifest::{Manifest, ManifestCategory};

/// The whole manifest, stamped with the request URL.
#[derive(Debug, Clone, Copy)]
pub struct FullManifest<'a> {
    manifest: &'a Manifest,
}

impl<'a> FullManifest<'a> {
    pub fn new(manifest: &'a Manifest) -> Self {
        Self { manifest }
    }
}

impl BuiltinCommand for FullManifest<'_> {
    fn name(&self) -> &'static str {
        "manifest"
    }

    fn run(&self, request: &Request) -> Outcome {
        let manifest = self.manifest.clone().with_url(request.url());
        Outcome::Success(Data::from(manifest.into_value()))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ListCommands<'a> {
    manifest: &'a Manifest,
}

impl<'a> ListCommands<'a> {
    pub fn new(manifest: &'a Manifest) -> Self {
        Self { manifest }
    }
}

impl BuiltinCommand for ListCommands<'_> {
    fn name(&self) -> &'static str {
        "list"
    }

    fn run(&self, _request: &Request) -> Outcome {
        Outcome::Success(Data::from(self.manifest.command_list()))
    }
}

/// One type node, named by the request's command-name segments.
#[derive(Debug, Clone, Copy)]
pub struct DescribeType<'a> {
    manifest: &'a Manifest,
}

impl<'a> DescribeType<'a> {
    pub fn new(manifest: &'a Manifest) -> Self {
        Self { manifest }
    }
}

impl BuiltinCommand for DescribeType<'_> {
    fn name(&self) -> &'static str {
        "describe_type"
    }

    fn run(&self, request: &Request) -> Outcome {
        let name = request.full_command_name();
        match self.manifest.get(ManifestCategory::Type, name) {
            Some(node) => Outcome::Success(Data::from(node.clone())),
            None => Outcome::failure(CommandError::not_found(name)),
        }
    }
}
