//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use serde_json::{json, Value};

use http_command_connector::command::{
    Attributes, Entity, ErrorCategory, PossibleError, Record, TypeDeclaration,
};
use http_command_connector::persistence::EntityLoader;
use http_command_connector::{
    Command, CommandConnector, CommandError, Data, ErrorCollection, ExecutionContext, Inputs, Request,
};

/// `base ** exponent`.
pub struct ComputeExponential;

impl Command for ComputeExponential {
    fn name(&self) -> &str {
        "ComputeExponential"
    }

    fn description(&self) -> Option<&str> {
        Some("Raises base to exponent")
    }

    fn inputs_type(&self) -> TypeDeclaration {
        TypeDeclaration::Attributes(
            Attributes::new()
                .required_attribute("base", TypeDeclaration::Integer)
                .required_attribute("exponent", TypeDeclaration::Integer),
        )
    }

    fn result_type(&self) -> TypeDeclaration {
        TypeDeclaration::Integer
    }

    fn execute(&self, inputs: &Inputs, _context: &ExecutionContext<'_>) -> Result<Data, ErrorCollection> {
        let base = inputs["base"].as_i64().unwrap_or_default();
        let exponent = inputs["exponent"].as_i64().unwrap_or_default();
        Ok(Data::from(base.pow(exponent as u32)))
    }
}

/// Returns its cast inputs.
pub struct EchoInputs {
    pub name: &'static str,
    pub inputs: Attributes,
}

impl EchoInputs {
    pub fn new(name: &'static str, inputs: Attributes) -> Self {
        Self { name, inputs }
    }
}

impl Command for EchoInputs {
    fn name(&self) -> &str {
        self.name
    }

    fn inputs_type(&self) -> TypeDeclaration {
        TypeDeclaration::Attributes(self.inputs.clone())
    }

    fn result_type(&self) -> TypeDeclaration {
        TypeDeclaration::Attributes(self.inputs.clone())
    }

    fn execute(&self, inputs: &Inputs, _context: &ExecutionContext<'_>) -> Result<Data, ErrorCollection> {
        Ok(Data::from(Value::Object(inputs.clone())))
    }
}

/// Always panics.
pub struct Kaboom;

impl Command for Kaboom {
    fn name(&self) -> &str {
        "Kaboom"
    }

    fn execute(&self, _inputs: &Inputs, _context: &ExecutionContext<'_>) -> Result<Data, ErrorCollection> {
        panic!("kaboom");
    }
}

/// Fails with two runtime errors.
pub struct TwoErrors;

impl Command for TwoErrors {
    fn name(&self) -> &str {
        "TwoErrors"
    }

    fn possible_errors(&self) -> Vec<PossibleError> {
        vec![
            PossibleError::new(ErrorCategory::Runtime, "first"),
            PossibleError::new(ErrorCategory::Runtime, "second"),
        ]
    }

    fn execute(&self, _inputs: &Inputs, _context: &ExecutionContext<'_>) -> Result<Data, ErrorCollection> {
        Err([
            CommandError::runtime("first", "First failure"),
            CommandError::runtime("second", "Second failure"),
        ]
        .into_iter()
        .collect())
    }
}

/// Returns an unloaded `User` reference for `user_id`.
pub struct FindUser;

impl Command for FindUser {
    fn name(&self) -> &str {
        "SomeOrg::Auth::FindUser"
    }

    fn inputs_type(&self) -> TypeDeclaration {
        TypeDeclaration::Attributes(Attributes::new().required_attribute("user_id", TypeDeclaration::Integer))
    }

    fn result_type(&self) -> TypeDeclaration {
        TypeDeclaration::entity("User")
    }

    fn execute(&self, inputs: &Inputs, _context: &ExecutionContext<'_>) -> Result<Data, ErrorCollection> {
        Ok(Data::Entity(Entity::unloaded("User", "id", inputs["user_id"].clone())))
    }
}

/// Returns the authenticated user.
pub struct WhoAmI;

impl Command for WhoAmI {
    fn name(&self) -> &str {
        "WhoAmI"
    }

    fn execute(&self, _inputs: &Inputs, context: &ExecutionContext<'_>) -> Result<Data, ErrorCollection> {
        Ok(context.authenticated_user.cloned().map(Data::from).unwrap_or(Data::Null))
    }
}

/// Records keyed by `(type, id)`, counting every load.
#[derive(Default)]
pub struct InMemoryLoader {
    records: Mutex<HashMap<(String, String), Record>>,
    loads: AtomicUsize,
}

impl InMemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, type_name: &str, id: Value, attributes: Value) {
        let Value::Object(map) = attributes else {
            panic!("attributes must be an object");
        };
        let record = map.into_iter().map(|(k, v)| (k, Data::from(v))).collect();
        self.records
            .lock()
            .unwrap()
            .insert((type_name.to_string(), id.to_string()), record);
    }

    pub fn insert_record(&self, type_name: &str, id: Value, record: Record) {
        self.records
            .lock()
            .unwrap()
            .insert((type_name.to_string(), id.to_string()), record);
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl EntityLoader for InMemoryLoader {
    fn load(&self, type_name: &str, id: &Value) -> Option<Record> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.records
            .lock()
            .unwrap()
            .get(&(type_name.to_string(), id.to_string()))
            .cloned()
    }
}

/// A user fixture with a nested reference.
pub fn seed_users(loader: &InMemoryLoader) {
    loader.insert("User", json!(1), json!({ "id": 1, "name": "Ada" }));
    loader.insert("User", json!(2), json!({ "id": 2, "name": "Grace" }));
}

/// Post 10 written by user 1, who was referred by user 2.
pub fn seed_posts(loader: &InMemoryLoader) {
    let mut ada: Record = Record::new();
    ada.insert("id".to_string(), Data::from(1));
    ada.insert("name".to_string(), Data::from("Ada"));
    ada.insert("referred_by".to_string(), Data::Entity(Entity::unloaded("User", "id", 2)));
    loader.insert_record("User", json!(1), ada);
    loader.insert("User", json!(2), json!({ "id": 2, "name": "Grace" }));

    let mut post: Record = Record::new();
    post.insert("id".to_string(), Data::from(10));
    post.insert("title".to_string(), Data::from("Hello"));
    post.insert("author".to_string(), Data::Entity(Entity::unloaded("User", "id", 1)));
    loader.insert_record("Post", json!(10), post);
}

/// Returns an unloaded `Post` reference for `post_id`.
pub struct FindPost;

impl Command for FindPost {
    fn name(&self) -> &str {
        "Blog::FindPost"
    }

    fn inputs_type(&self) -> TypeDeclaration {
        TypeDeclaration::Attributes(Attributes::new().required_attribute("post_id", TypeDeclaration::Integer))
    }

    fn result_type(&self) -> TypeDeclaration {
        TypeDeclaration::entity("Post")
    }

    fn execute(&self, inputs: &Inputs, _context: &ExecutionContext<'_>) -> Result<Data, ErrorCollection> {
        Ok(Data::Entity(Entity::unloaded("Post", "id", inputs["post_id"].clone())))
    }
}

/// What a test needs from a response once the request is gone.
#[derive(Debug)]
pub struct Reply {
    pub status: u16,
    pub headers: std::collections::BTreeMap<String, String>,
    pub set_cookies: Vec<String>,
    pub body: String,
}

impl Reply {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

pub fn call(connector: &CommandConnector, request: Request) -> Reply {
    let mut request = request;
    let response = connector.run(&mut request);
    Reply {
        status: response.status().as_u16(),
        headers: response.headers().clone(),
        set_cookies: response.cookies().iter().map(|c| c.to_set_cookie_header()).collect(),
        body: response.body_text(),
    }
}

pub fn get(path: &str, query: &str) -> Request {
    Request::new(path).with_method("GET").with_query_string(query)
}

pub fn post(path: &str, body: Value) -> Request {
    Request::new(path)
        .with_method("POST")
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
}
