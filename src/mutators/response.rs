//! Response mutators.

use serde_json::Value;

use crate::command::TypeDeclaration;
use crate::http::{Cookie, CookieOptions, Response};
use crate::mutators::ResponseMutator;

fn wire_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Moves a result attribute into a cookie. Successful outcomes only.
#[derive(Debug, Clone)]
pub struct MoveAttributeToCookie {
    attribute_name: String,
    cookie_name: String,
    options: CookieOptions,
}

impl MoveAttributeToCookie {
    pub fn new(attribute_name: impl Into<String>) -> Self {
        let attribute_name = attribute_name.into();
        Self {
            cookie_name: attribute_name.clone(),
            attribute_name,
            options: CookieOptions::default(),
        }
    }

    pub fn with_cookie_name(mut self, cookie_name: impl Into<String>) -> Self {
        self.cookie_name = cookie_name.into();
        self
    }

    pub fn with_options(mut self, options: CookieOptions) -> Self {
        self.options = options;
        self
    }
}

impl ResponseMutator for MoveAttributeToCookie {
    fn applicable(&self, response: &Response<'_>) -> bool {
        response.is_success()
    }

    fn mutate(&self, response: &mut Response<'_>) {
        let value = response.take_attribute(&self.attribute_name).unwrap_or(Value::Null);
        response.add_cookie(Cookie::new(&self.cookie_name, wire_text(value), self.options.clone()));
    }

    fn result_type_from(&self, result_type: TypeDeclaration) -> TypeDeclaration {
        result_type.reject_attribute(&self.attribute_name)
    }
}

/// Moves a result attribute into a header. Successful outcomes only.
#[derive(Debug, Clone)]
pub struct MoveAttributeToHeader {
    attribute_name: String,
    header_name: String,
}

impl MoveAttributeToHeader {
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

impl ResponseMutator for MoveAttributeToHeader {
    fn applicable(&self, response: &Response<'_>) -> bool {
        response.is_success()
    }

    fn mutate(&self, response: &mut Response<'_>) {
        let value = response.take_attribute(&self.attribute_name).unwrap_or(Value::Null);
        response.add_header(&self.header_name, wire_text(value));
    }

    fn result_type_from(&self, result_type: TypeDeclaration) -> TypeDeclaration {
        result_type.reject_attribute(&self.attribute_name)
    }
}

/// Sets a fixed header on every response.
#[derive(Debug, Clone)]
pub struct SetHeader {
    name: String,
    value: String,
}

impl SetHeader {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl ResponseMutator for SetHeader {
    fn mutate(&self, response: &mut Response<'_>) {
        response.add_header(&self.name, self.value.clone());
    }
}
