//! Keyed record handling
//!
//! Result rows are opaque JSON objects. The only field the reconciler ever
//! interprets is the configured identity field; everything else is carried
//! through untouched and compared structurally.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// A single row of an ordered result set.
pub type Record = serde_json::Map<String, Value>;

/// Errors raised when a record cannot be keyed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// Record carries no value under the configured identity field
    #[error("record is missing identity field '{field}'")]
    MissingIdentity { field: String },

    /// Identity values must be JSON strings or numbers
    #[error("identity field '{field}' holds a {kind}, expected a string or number")]
    UnsupportedIdentity { field: String, kind: &'static str },
}

/// Identity value of a record, in canonical string form.
///
/// String identities are used verbatim; numeric identities use their JSON
/// text representation, so `1` and `"1"` collide the same way they would in
/// a string-keyed map.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Identity {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Identity {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Extract a record's identity under the given field name.
///
/// Fails rather than skipping the record: a row without an identity cannot
/// be joined between snapshots, so the whole pass must be rejected.
pub fn identity_of(record: &Record, id_field: &str) -> Result<Identity, RecordError> {
    match record.get(id_field) {
        None => Err(RecordError::MissingIdentity {
            field: id_field.to_string(),
        }),
        Some(Value::String(s)) => Ok(Identity(s.clone())),
        Some(Value::Number(n)) => Ok(Identity(n.to_string())),
        Some(other) => Err(RecordError::UnsupportedIdentity {
            field: id_field.to_string(),
            kind: value_kind(other),
        }),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> Record {
        value.as_object().cloned().expect("test record must be an object")
    }

    #[test]
    fn test_string_identity_used_verbatim() {
        let row = record(json!({ "name": "queue-1", "depth": 3 }));
        let id = identity_of(&row, "name").unwrap();
        assert_eq!(id.as_str(), "queue-1");
    }

    #[test]
    fn test_numeric_identity_canonicalized() {
        let row = record(json!({ "id": 42, "v": "a" }));
        let id = identity_of(&row, "id").unwrap();
        assert_eq!(id.as_str(), "42");
        assert_eq!(id, Identity::from("42"));
    }

    #[test]
    fn test_missing_identity_field_is_an_error() {
        let row = record(json!({ "v": "a" }));
        let err = identity_of(&row, "id").unwrap_err();
        assert_eq!(
            err,
            RecordError::MissingIdentity {
                field: "id".to_string()
            }
        );
    }

    #[test]
    fn test_non_scalar_identity_is_an_error() {
        let row = record(json!({ "id": { "nested": true } }));
        let err = identity_of(&row, "id").unwrap_err();
        assert!(matches!(err, RecordError::UnsupportedIdentity { kind: "object", .. }));
    }

    #[test]
    fn test_identity_display_matches_source() {
        let row = record(json!({ "id": "broker/vhost" }));
        let id = identity_of(&row, "id").unwrap();
        assert_eq!(id.to_string(), "broker/vhost");
    }
}
