//! Human-readable help.
//!
//! Lookup goes from strict to permissive: the connector's own commands
//! first, then the broader namespace, each in absolute, general and relaxed
//! mode. A broader-namespace hit only counts if the connector exposes it.

use serde_json::Value;

use crate::command::{CommandError, Data, ErrorCollection, Outcome};
use crate::commands::BuiltinCommand;
use crate::connector::CommandRegistry;
use crate::http::Request;
use crate::manifest::{LookupMode, Manifest, ManifestCategory, ManifestReference, Namespace};

/// What help is being asked about.
#[derive(Debug, Clone, PartialEq)]
pub enum HelpSubject {
    /// No argument: the whole connector.
    Root(Value),
    Node(ManifestReference),
}

/// Turns a help subject into an HTML document.
pub trait HelpRenderer: Send + Sync {
    fn render(&self, subject: &HelpSubject, request: &Request) -> String;

    fn render_errors(&self, errors: &ErrorCollection, request: &Request) -> String;
}

/// Plain nested lists. Enough to browse a connector without templates.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicHelpRenderer;

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn render_value(value: &Value, html: &mut String) {
    match value {
        Value::Object(map) => {
            html.push_str("<ul>");
            for (key, value) in map {
                html.push_str("<li><strong>");
                html.push_str(&escape(key));
                html.push_str("</strong>");
                if value.is_object() || value.is_array() {
                    render_value(value, html);
                } else {
                    html.push_str(": ");
                    render_value(value, html);
                }
                html.push_str("</li>");
            }
            html.push_str("</ul>");
        }
        Value::Array(items) => {
            html.push_str("<ul>");
            for item in items {
                html.push_str("<li>");
                render_value(item, html);
                html.push_str("</li>");
            }
            html.push_str("</ul>");
        }
        Value::String(s) => html.push_str(&escape(s)),
        other => html.push_str(&escape(&other.to_string())),
    }
}

fn page(title: &str, body: &str) -> String {
    let title = escape(title);
    format!("<!DOCTYPE html><html><head><title>{title}</title></head><body><h1>{title}</h1>{body}</body></html>")
}

impl HelpRenderer for BasicHelpRenderer {
    fn render(&self, subject: &HelpSubject, request: &Request) -> String {
        match subject {
            HelpSubject::Root(manifest) => {
                let prefix = escape(request.prefix().unwrap_or_default());
                let mut body = String::from("<h2>Commands</h2><ul>");
                if let Some(commands) = manifest.get("command").and_then(Value::as_object) {
                    for (name, node) in commands {
                        let escaped = escape(name);
                        body.push_str(&format!("<li><a href=\"{prefix}/help/{escaped}\">{escaped}</a>"));
                        if let Some(description) = node.get("description").and_then(Value::as_str) {
                            body.push_str(" - ");
                            body.push_str(&escape(description));
                        }
                        body.push_str("</li>");
                    }
                }
                body.push_str("</ul><h2>Types</h2><ul>");
                if let Some(types) = manifest.get("type").and_then(Value::as_object) {
                    for name in types.keys() {
                        body.push_str(&format!("<li>{}</li>", escape(name)));
                    }
                }
                body.push_str("</ul>");
                page("Help", &body)
            }
            HelpSubject::Node(reference) => {
                let mut body = String::new();
                render_value(&reference.manifest, &mut body);
                page(&format!("{}: {}", reference.category, reference.reference), &body)
            }
        }
    }

    fn render_errors(&self, errors: &ErrorCollection, _request: &Request) -> String {
        let mut body = String::from("<ul>");
        for error in errors {
            body.push_str(&format!(
                "<li><strong>{}</strong>: {}</li>",
                escape(&error.key()),
                escape(error.message())
            ));
        }
        body.push_str("</ul>");
        page("Request failed", &body)
    }
}

pub struct Help<'a> {
    registry: &'a CommandRegistry,
    manifest: &'a Manifest,
    namespace: Option<&'a dyn Namespace>,
    renderer: &'a dyn HelpRenderer,
}

impl<'a> Help<'a> {
    /// `namespace` defaults to the connector's own manifest.
    pub fn new(
        registry: &'a CommandRegistry,
        manifest: &'a Manifest,
        namespace: Option<&'a dyn Namespace>,
        renderer: &'a dyn HelpRenderer,
    ) -> Self {
        Self {
            registry,
            manifest,
            namespace,
            renderer,
        }
    }

    /// Resolve what the request wants help with.
    pub fn subject(&self, request: &Request) -> Result<HelpSubject, CommandError> {
        let Some(argument) = request.argument() else {
            return Ok(HelpSubject::Root(self.manifest.as_value().clone()));
        };

        let namespace: &dyn Namespace = self.namespace.unwrap_or(self.manifest);

        for mode in LookupMode::PROGRESSION {
            if let Some(command) = self.registry.lookup(argument, mode) {
                if let Some(node) = self.manifest.get(ManifestCategory::Command, command.name()) {
                    return Ok(HelpSubject::Node(ManifestReference {
                        category: ManifestCategory::Command,
                        reference: command.name().to_string(),
                        manifest: node.clone(),
                    }));
                }
            }

            if let Some(found) = namespace.lookup(argument, mode) {
                if let Some(node) = self.manifest.get(found.category, &found.reference) {
                    return Ok(HelpSubject::Node(ManifestReference {
                        manifest: node.clone(),
                        ..found
                    }));
                }
            }
        }

        Err(CommandError::not_found(argument))
    }
}

impl BuiltinCommand for Help<'_> {
    fn name(&self) -> &'static str {
        "help"
    }

    /// Success carries the rendered HTML.
    fn run(&self, request: &Request) -> Outcome {
        match self.subject(request) {
            Ok(subject) => Outcome::Success(Data::String(self.renderer.render(&subject, request))),
            Err(error) => Outcome::failure(error),
        }
    }
}
