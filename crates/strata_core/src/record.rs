//! Records and record type descriptors.

use crate::types::{Key, Value, Version};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// How a record type was declared to the storage layer.
///
/// The declaration decides when a backend that cannot map the type reports
/// it: authoritative types fail as soon as a store handle is acquired,
/// independent types fail on first access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Declaration {
    /// Schema is optional; support is checked lazily on first access.
    #[default]
    Independent,
    /// Schema is mandatory; support is checked eagerly.
    Authoritative,
}

/// Descriptor for a type of record taking part in store operations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordType {
    name: String,
    key_fields: Vec<String>,
    declaration: Declaration,
}

impl RecordType {
    /// Creates an independently declared record type.
    pub fn new<I, S>(name: impl Into<String>, key_fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            key_fields: key_fields.into_iter().map(Into::into).collect(),
            declaration: Declaration::Independent,
        }
    }

    /// Sets the declaration.
    #[must_use]
    pub fn with_declaration(mut self, declaration: Declaration) -> Self {
        self.declaration = declaration;
        self
    }

    /// Returns the type name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the ordered key field names.
    #[must_use]
    pub fn key_fields(&self) -> &[String] {
        &self.key_fields
    }

    /// Returns the declaration.
    #[must_use]
    pub fn declaration(&self) -> Declaration {
        self.declaration
    }

    /// Returns the position of a key field, if `field` names one.
    #[must_use]
    pub fn key_position(&self, field: &str) -> Option<usize> {
        self.key_fields.iter().position(|f| f == field)
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// One persisted entity: a key, an optional version and named fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Name of the record type this record belongs to.
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub type_name: String,
    /// Primary key.
    pub key: Key,
    /// Version, if the type is versioned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Version>,
    /// Non-key fields.
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
}

impl Record {
    /// Creates an unversioned record with no fields.
    pub fn new(type_name: impl Into<String>, key: impl Into<Key>) -> Self {
        Self {
            type_name: type_name.into(),
            key: key.into(),
            version: None,
            fields: BTreeMap::new(),
        }
    }

    /// Sets the version.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<Option<Version>>) -> Self {
        self.version = version.into();
        self
    }

    /// Sets a field value.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Returns a field value by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Resolves a field for predicate evaluation.
    ///
    /// Key fields of `record_type` are looked up by position, `version`
    /// resolves to the record version, anything else to a named field.
    /// Missing fields resolve to null.
    #[must_use]
    pub fn resolve(&self, record_type: &RecordType, field: &str) -> Value {
        if let Some(pos) = record_type.key_position(field) {
            return self.key.values().get(pos).cloned().unwrap_or(Value::Null);
        }
        if field == "version" {
            return self
                .version
                .map_or(Value::Null, |v| Value::Integer(v.as_i64()));
        }
        self.fields.get(field).cloned().unwrap_or(Value::Null)
    }

    /// Renders the record by identity only, e.g. `users[42]`.
    #[must_use]
    pub fn key_only_text(&self) -> String {
        format!("{}{}", self.type_name, self.key)
    }
}
