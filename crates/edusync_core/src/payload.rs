//! Opaque update payloads.
//!
//! Payload shapes belong to the producers (API handlers and UI actions).
//! The synchronization layer only ever reads two fields: `role`, for the
//! progress to parent-dashboard cascade, and `moduleId`, for module
//! notifications.

use crate::error::{SyncError, SyncResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field holding the role of the user an update belongs to.
pub const ROLE_FIELD: &str = "role";
/// Field holding the module id of a module update.
pub const MODULE_ID_FIELD: &str = "moduleId";
/// Field added to parent-dashboard updates derived from student progress.
pub const STUDENT_ID_FIELD: &str = "studentId";

/// Role of the user an update belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A student.
    Student,
    /// A parent or guardian.
    Parent,
    /// A teacher.
    Teacher,
    /// An administrator.
    Admin,
}

impl Role {
    /// The value stored in the `role` field.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Parent => "parent",
            Role::Teacher => "teacher",
            Role::Admin => "admin",
        }
    }
}

/// A JSON object carried by an update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(Map<String, Value>);

impl Payload {
    /// Creates an empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps a JSON value, which must be an object.
    pub fn from_value(value: Value) -> SyncResult<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(SyncError::InvalidPayload(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Adds a field, builder style.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Inserts a field, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Returns a field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns true if the payload has no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of top-level fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// The `role` field, if present and recognised.
    pub fn role(&self) -> Option<Role> {
        self.get(ROLE_FIELD)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// The `moduleId` field, if present and a string.
    pub fn module_id(&self) -> Option<&str> {
        self.get(MODULE_ID_FIELD).and_then(Value::as_str)
    }

    /// Borrows the underlying map.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Converts into a JSON value.
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Payload {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Payload {
    type Error = SyncError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_value_requires_object() {
        assert!(Payload::from_value(json!({"completed": true})).is_ok());

        let err = Payload::from_value(json!([1, 2])).unwrap_err();
        assert_eq!(
            err,
            SyncError::InvalidPayload("expected a JSON object, got an array".into())
        );
    }

    #[test]
    fn typed_accessors() {
        let payload = Payload::new()
            .with("role", "student")
            .with("moduleId", "algebra-1");
        assert_eq!(payload.role(), Some(Role::Student));
        assert_eq!(payload.module_id(), Some("algebra-1"));

        let payload = Payload::new().with("role", "janitor").with("moduleId", 7);
        assert_eq!(payload.role(), None);
        assert_eq!(payload.module_id(), None);
    }

    #[test]
    fn serializes_as_plain_object() {
        let payload = Payload::new().with("score", 90);
        assert_eq!(serde_json::to_value(&payload).unwrap(), json!({"score": 90}));
    }
}
