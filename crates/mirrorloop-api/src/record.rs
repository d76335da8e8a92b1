// ── Raw resource payloads ──
//
// The remote controller returns loosely-schemaed JSON objects. The
// engine normalizes the handful of fields it understands (id, name,
// enabled) and carries the rest verbatim so pass-through updates never
// lose attributes the engine doesn't model.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One resource payload exactly as the remote controller returned it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord {
    pub fields: Map<String, Value>,
}

impl RawRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// The record's identifier. Controllers expose it as `_id` (legacy
    /// object-id style) or `id`; both are accepted.
    pub fn id(&self) -> Option<&str> {
        self.fields
            .get("_id")
            .or_else(|| self.fields.get("id"))
            .and_then(Value::as_str)
    }

    /// Display name, falling back to `description` for rule-style
    /// resources that carry no `name` field.
    pub fn name(&self) -> Option<&str> {
        self.fields
            .get("name")
            .or_else(|| self.fields.get("description"))
            .and_then(Value::as_str)
    }

    /// The discriminating on/off state, when present and boolean-typed.
    pub fn enabled(&self) -> Option<bool> {
        self.fields.get("enabled").and_then(Value::as_bool)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

impl From<Value> for RawRecord {
    /// Wrap any JSON value. Non-object values become an empty record,
    /// which normalization then rejects for lacking an id.
    fn from(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self { fields },
            _ => Self::default(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> RawRecord {
        RawRecord::from(value)
    }

    #[test]
    fn id_prefers_legacy_underscore_form() {
        let r = record(json!({"_id": "abc", "id": "def"}));
        assert_eq!(r.id(), Some("abc"));
    }

    #[test]
    fn id_falls_back_to_plain_form() {
        let r = record(json!({"id": "def"}));
        assert_eq!(r.id(), Some("def"));
    }

    #[test]
    fn name_falls_back_to_description() {
        let r = record(json!({"description": "Block IoT"}));
        assert_eq!(r.name(), Some("Block IoT"));
    }

    #[test]
    fn enabled_requires_boolean() {
        let r = record(json!({"enabled": "yes"}));
        assert_eq!(r.enabled(), None);
        let r = record(json!({"enabled": true}));
        assert_eq!(r.enabled(), Some(true));
    }

    #[test]
    fn non_object_value_becomes_empty_record() {
        let r = record(json!([1, 2, 3]));
        assert!(r.fields.is_empty());
        assert_eq!(r.id(), None);
    }
}
