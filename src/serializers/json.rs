//! Pass-through, errors and JSON serializers.

use crate::serializers::{Payload, Serializer, APPLICATION_JSON};

/// Leaves the payload untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughSerializer;

impl Serializer for PassThroughSerializer {
    fn name(&self) -> &str {
        "pass_through"
    }

    fn serialize(&self, payload: Payload) -> Payload {
        payload
    }
}

/// Shapes an error collection as `{key: {key, symbol, message, context, is_fatal, ...}}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorsSerializer;

impl Serializer for ErrorsSerializer {
    fn name(&self) -> &str {
        "errors"
    }

    fn serialize(&self, payload: Payload) -> Payload {
        match payload {
            Payload::Errors(errors) => Payload::Structured(errors.to_json()),
            other => other,
        }
    }
}

/// Encodes to compact JSON text.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn name(&self) -> &str {
        "json"
    }

    fn serialize(&self, payload: Payload) -> Payload {
        match payload {
            Payload::Encoded(text) => Payload::Encoded(text),
            other => Payload::Encoded(other.to_json().to_string()),
        }
    }

    fn is_encoder(&self) -> bool {
        true
    }

    fn content_type(&self) -> Option<&str> {
        Some(APPLICATION_JSON)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandError, Data, ErrorCollection};
    use serde_json::json;

    #[test]
    fn test_errors_serializer_ignores_results() {
        let payload = Payload::Result(Data::from(1));
        assert_eq!(ErrorsSerializer.serialize(payload.clone()), payload);
    }

    #[test]
    fn test_json_encodes_unshaped_errors() {
        let errors = ErrorCollection::from(CommandError::runtime("too_big", "Too big"));
        let Payload::Encoded(text) = JsonSerializer.serialize(Payload::Errors(errors)) else {
            panic!("expected encoded payload")
        };
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["runtime.too_big"]["message"], json!("Too big"));
    }
}
