//! Declarative payload schemas.
//!
//! A command declares the shape of its payload as an [`ObjectSchema`]: a
//! list of named fields, each with a JSON kind. Validation checks the shape
//! only; keys the schema does not mention are ignored.

use serde::Serialize;
use serde_json::Value;

/// JSON kind a field must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Number,
    Boolean,
    Object,
    Array,
}

impl FieldKind {
    fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
        }
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single field of an object schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

/// Expected shape of a command payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ObjectSchema {
    fields: Vec<Field>,
}

impl ObjectSchema {
    /// A schema accepting any object.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a required field.
    pub fn field(mut self, name: &'static str, kind: FieldKind) -> Self {
        self.fields.push(Field {
            name,
            kind,
            required: true,
        });
        self
    }

    /// Add an optional field. When present (and not null) it must match `kind`.
    pub fn optional(mut self, name: &'static str, kind: FieldKind) -> Self {
        self.fields.push(Field {
            name,
            kind,
            required: false,
        });
        self
    }

    /// Shorthand for a required string field.
    pub fn string(self, name: &'static str) -> Self {
        self.field(name, FieldKind::String)
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Check `payload` against this schema.
    ///
    /// Fields are checked in declaration order and the first violation is
    /// reported.
    pub fn validate(&self, payload: &Value) -> Result<(), ValidationError> {
        let object = payload.as_object().ok_or(ValidationError::NotAnObject {
            found: json_kind(payload),
        })?;

        for field in &self.fields {
            match object.get(field.name) {
                None | Some(Value::Null) if field.required => {
                    return Err(ValidationError::MissingField(field.name.to_string()));
                }
                None | Some(Value::Null) => {}
                Some(value) if !field.kind.matches(value) => {
                    return Err(ValidationError::WrongType {
                        field: field.name.to_string(),
                        expected: field.kind,
                        found: json_kind(value),
                    });
                }
                Some(_) => {}
            }
        }

        Ok(())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Payload is not a JSON object.
    NotAnObject { found: &'static str },
    /// Required field is absent or null.
    MissingField(String),
    /// Field is present with the wrong JSON kind.
    WrongType {
        field: String,
        expected: FieldKind,
        found: &'static str,
    },
    /// Payload matched the schema but could not be decoded into the
    /// command's input type.
    Malformed(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAnObject { found } => write!(f, "expected an object, got {}", found),
            Self::MissingField(field) => write!(f, "missing required field '{}'", field),
            Self::WrongType {
                field,
                expected,
                found,
            } => write!(f, "field '{}' must be {}, got {}", field, expected, found),
            Self::Malformed(detail) => write!(f, "malformed payload: {}", detail),
        }
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn credentials() -> ObjectSchema {
        ObjectSchema::new()
            .string("id")
            .string("password")
            .optional("remember", FieldKind::Boolean)
    }

    #[test]
    fn test_valid_payload() {
        let schema = credentials();
        assert!(schema
            .validate(&json!({"id": "alice", "password": "pw"}))
            .is_ok());
        assert!(schema
            .validate(&json!({"id": "alice", "password": "pw", "remember": true}))
            .is_ok());
    }

    #[test]
    fn test_extra_keys_ignored() {
        let schema = credentials();
        assert!(schema
            .validate(&json!({"id": "a", "password": "b", "extra": [1, 2]}))
            .is_ok());
    }

    #[test]
    fn test_not_an_object() {
        let schema = credentials();
        assert_eq!(
            schema.validate(&json!("alice")),
            Err(ValidationError::NotAnObject { found: "string" })
        );
        assert_eq!(
            schema.validate(&Value::Null),
            Err(ValidationError::NotAnObject { found: "null" })
        );
    }

    #[test]
    fn test_missing_field() {
        let schema = credentials();
        assert_eq!(
            schema.validate(&json!({"id": "alice"})),
            Err(ValidationError::MissingField("password".into()))
        );
        assert_eq!(
            schema.validate(&json!({"id": "alice", "password": null})),
            Err(ValidationError::MissingField("password".into()))
        );
    }

    #[test]
    fn test_wrong_type() {
        let schema = credentials();
        let err = schema
            .validate(&json!({"id": 42, "password": "pw"}))
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::WrongType {
                field: "id".into(),
                expected: FieldKind::String,
                found: "number",
            }
        );
        assert_eq!(err.to_string(), "field 'id' must be string, got number");
    }

    #[test]
    fn test_optional_field_type_checked() {
        let schema = credentials();
        assert!(matches!(
            schema.validate(&json!({"id": "a", "password": "b", "remember": "yes"})),
            Err(ValidationError::WrongType { .. })
        ));
        assert!(schema
            .validate(&json!({"id": "a", "password": "b", "remember": null}))
            .is_ok());
    }

    #[test]
    fn test_empty_schema_accepts_any_object() {
        let schema = ObjectSchema::new();
        assert!(schema.validate(&json!({})).is_ok());
        assert!(schema.validate(&json!({"anything": 1})).is_ok());
        assert!(schema.validate(&json!([])).is_err());
    }

    #[test]
    fn test_schema_serializes_fields() {
        let json = serde_json::to_value(ObjectSchema::new().string("id")).unwrap();
        assert_eq!(
            json,
            json!({"fields": [{"name": "id", "kind": "string", "required": true}]})
        );
    }
}
