//! Request mutators.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::command::{Inputs, TypeDeclaration};
use crate::http::Request;
use crate::mutators::{InputFn, InputSource, RequestMutator};

/// Sets an input from a request cookie. A missing cookie sets null.
#[derive(Debug, Clone)]
pub struct SetInputFromCookie {
    attribute_name: String,
    cookie_name: String,
}

impl SetInputFromCookie {
    pub fn new(attribute_name: impl Into<String>) -> Self {
        let attribute_name = attribute_name.into();
        Self {
            cookie_name: attribute_name.clone(),
            attribute_name,
        }
    }

    pub fn with_cookie_name(mut self, cookie_name: impl Into<String>) -> Self {
        self.cookie_name = cookie_name.into();
        self
    }
}

impl RequestMutator for SetInputFromCookie {
    fn mutate(&self, request: &Request, inputs: &mut Inputs) {
        let value = request
            .cookie(&self.cookie_name)
            .map_or(Value::Null, |v| Value::String(v.to_string()));
        inputs.insert(self.attribute_name.clone(), value);
    }

    fn inputs_type_from(&self, inputs_type: TypeDeclaration) -> TypeDeclaration {
        inputs_type.reject_attribute(&self.attribute_name)
    }
}

/// Sets an input from a request header. A missing header sets null.
#[derive(Debug, Clone)]
pub struct SetInputFromHeader {
    attribute_name: String,
    header_name: String,
}

impl SetInputFromHeader {
    pub fn new(attribute_name: impl Into<String>) -> Self {
        let attribute_name = attribute_name.into();
        Self {
            header_name: attribute_name.clone(),
            attribute_name,
        }
    }

    pub fn with_header_name(mut self, header_name: impl Into<String>) -> Self {
        self.header_name = header_name.into();
        self
    }
}

impl RequestMutator for SetInputFromHeader {
    fn mutate(&self, request: &Request, inputs: &mut Inputs) {
        let value = request
            .header(&self.header_name)
            .map_or(Value::Null, |v| Value::String(v.to_string()));
        inputs.insert(self.attribute_name.clone(), value);
    }

    fn inputs_type_from(&self, inputs_type: TypeDeclaration) -> TypeDeclaration {
        inputs_type.reject_attribute(&self.attribute_name)
    }
}

/// Overwrites an input with a value computed from the request.
#[derive(Debug, Clone)]
pub struct SetInputToProcResult {
    attribute_name: String,
    f: InputFn,
}

impl SetInputToProcResult {
    pub fn new(attribute_name: impl Into<String>, f: InputFn) -> Self {
        Self {
            attribute_name: attribute_name.into(),
            f,
        }
    }

    pub fn attribute_name(&self) -> &str {
        &self.attribute_name
    }
}

impl RequestMutator for SetInputToProcResult {
    fn mutate(&self, request: &Request, inputs: &mut Inputs) {
        inputs.insert(self.attribute_name.clone(), self.f.call(request));
    }

    fn inputs_type_from(&self, inputs_type: TypeDeclaration) -> TypeDeclaration {
        inputs_type.reject_attribute(&self.attribute_name)
    }
}

/// Fills inputs the caller left out.
#[derive(Debug, Clone)]
pub struct DefaultInputs {
    defaults: BTreeMap<String, InputSource>,
}

impl DefaultInputs {
    pub fn new(defaults: BTreeMap<String, InputSource>) -> Self {
        Self { defaults }
    }

    pub fn defaults(&self) -> &BTreeMap<String, InputSource> {
        &self.defaults
    }
}

impl RequestMutator for DefaultInputs {
    fn mutate(&self, request: &Request, inputs: &mut Inputs) {
        for (name, source) in &self.defaults {
            if !inputs.contains_key(name) {
                inputs.insert(name.clone(), source.resolve(request));
            }
        }
    }

    /// Literal defaults are recorded; every defaulted attribute stops being
    /// required.
    fn inputs_type_from(&self, inputs_type: TypeDeclaration) -> TypeDeclaration {
        let defaults = self
            .defaults
            .iter()
            .map(|(name, source)| (name.clone(), source.literal().cloned()))
            .collect();
        inputs_type.with_defaults(&defaults)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Attributes;
    use serde_json::json;

    fn foo_bar() -> TypeDeclaration {
        TypeDeclaration::Attributes(
            Attributes::new()
                .required_attribute("foo", TypeDeclaration::String)
                .required_attribute("bar", TypeDeclaration::String),
        )
    }

    #[test]
    fn test_cookie_mutator() {
        let request = Request::new("/run/X").with_cookie("session_id", "abc");
        let mutator = SetInputFromCookie::new("foo").with_cookie_name("session_id");
        let mut inputs = Inputs::new();
        mutator.mutate(&request, &mut inputs);
        assert_eq!(inputs["foo"], json!("abc"));

        let declared = mutator.inputs_type_from(foo_bar());
        assert!(!declared.as_attributes().unwrap().elements().contains_key("foo"));
    }

    #[test]
    fn test_header_mutator_missing_header_sets_null() {
        let request = Request::new("/run/X");
        let mut inputs = Inputs::new();
        inputs.insert("foo".to_string(), json!("from body"));
        SetInputFromHeader::new("foo").mutate(&request, &mut inputs);
        assert_eq!(inputs["foo"], Value::Null);
    }

    #[test]
    fn test_proc_result_overwrites() {
        let request = Request::new("/run/X").with_remote_ip("10.0.0.1");
        let mutator = SetInputToProcResult::new(
            "foo",
            InputFn::new(|request| json!(request.remote_ip())),
        );
        let mut inputs = Inputs::new();
        inputs.insert("foo".to_string(), json!("caller"));
        mutator.mutate(&request, &mut inputs);
        assert_eq!(inputs["foo"], json!("10.0.0.1"));
    }

    #[test]
    fn test_default_inputs_only_fill_absent() {
        let request = Request::new("/run/X");
        let mutator = DefaultInputs::new(BTreeMap::from([
            ("foo".to_string(), InputSource::Value(json!("Fooooooo"))),
            ("bar".to_string(), InputSource::proc(|_| json!("Baaaaar"))),
        ]));
        let mut inputs = Inputs::new();
        inputs.insert("bar".to_string(), json!("given"));
        mutator.mutate(&request, &mut inputs);
        assert_eq!(inputs["foo"], json!("Fooooooo"));
        assert_eq!(inputs["bar"], json!("given"));

        let declared = mutator.inputs_type_from(foo_bar()).to_manifest();
        assert_eq!(declared["defaults"], json!({"foo": "Fooooooo"}));
        assert!(declared.get("required").is_none());
    }
}
