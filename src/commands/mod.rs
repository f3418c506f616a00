//! Built-in commands.
//!
//! # Data Flow
//! ```text
//! Action::Options      → get_options.rs  (CORS headers onto request.response_headers)
//! Action::Describe     → describe.rs     (one command's manifest node + metadata.url)
//! Action::Help         → help.rs         (lookup → HelpSubject → HelpRenderer → HTML)
//! Action::Manifest     → manifest.rs     (full manifest)
//! Action::List         → manifest.rs     (exposed commands with descriptions)
//! Action::DescribeType → manifest.rs     (one type node)
//! ```
//!
//! # Design Decisions
//! - Built-ins never reach business logic and never load entities
//! - Each borrows what it needs from the connector for one dispatch

pub mod describe;
pub mod get_options;
pub mod help;
pub mod manifest;

use crate::command::Outcome;
use crate::http::Request;

pub use describe::Describe;
pub use get_options::GetOptions;
pub use help::{BasicHelpRenderer, Help, HelpRenderer, HelpSubject};
pub use manifest::{DescribeType, FullManifest, ListCommands};

/// A connector-provided command that runs against the request itself.
pub trait BuiltinCommand {
    fn name(&self) -> &'static str;

    fn run(&self, request: &Request) -> Outcome;
}
