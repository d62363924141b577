use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{FieldValue, RecordId};

/// A record as stored by the remote database.
///
/// Fields live in a sorted map so that the same entity always encodes
/// to the same shape. A record without an id has never been stored;
/// the database assigns one when it is first upserted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRemoteRecord {
    pub record_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
}

impl RawRemoteRecord {
    /// Creates an empty, not-yet-stored record of the given type.
    pub fn new(record_type: impl Into<String>) -> Self {
        Self {
            record_type: record_type.into(),
            id: None,
            fields: BTreeMap::new(),
        }
    }

    /// Sets the record id, or clears it with `None`.
    #[must_use]
    pub fn with_id(mut self, id: Option<RecordId>) -> Self {
        self.id = id;
        self
    }

    /// Adds a field value.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Adds a field value only when one is present.
    #[must_use]
    pub fn with_optional_field<V: Into<FieldValue>>(
        mut self,
        name: impl Into<String>,
        value: Option<V>,
    ) -> Self {
        if let Some(value) = value {
            self.set(name, value);
        }
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Extract a string value.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_str)
    }

    /// Extract an integer value.
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(FieldValue::as_i64)
    }

    /// Extract a numeric value; integers are widened.
    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(FieldValue::as_f64)
    }

    /// Extract a boolean value.
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(FieldValue::as_bool)
    }

    /// Extract a timestamp value.
    pub fn get_timestamp(&self, name: &str) -> Option<DateTime<Utc>> {
        self.get(name).and_then(FieldValue::as_timestamp)
    }

    /// Extract a string list value.
    pub fn get_string_list(&self, name: &str) -> Option<&[String]> {
        self.get(name).and_then(FieldValue::as_string_list)
    }

    /// Extract a reference to another record.
    pub fn get_reference(&self, name: &str) -> Option<&RecordId> {
        self.get(name).and_then(FieldValue::as_reference)
    }
}
