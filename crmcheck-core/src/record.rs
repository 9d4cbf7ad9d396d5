//! Record, filter and projection types exchanged with the record store.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A single record as returned by the record store: field name to value.
pub type Record = serde_json::Map<String, Value>;

/// Equality conditions combined with AND.
///
/// Backed by a `BTreeMap` so that iteration order, and therefore any query
/// rendered from the filter, is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordFilter {
    conditions: BTreeMap<String, Value>,
}

impl RecordFilter {
    /// Create an empty filter (matches every record).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a single-condition filter.
    pub fn by(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new().eq(field, value)
    }

    /// Add an equality condition, replacing any previous condition on `field`.
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.insert(field.into(), value.into());
        self
    }

    /// Iterate conditions in field-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.conditions.iter()
    }

    /// Look up the value required for `field`.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.conditions.get(field)
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    /// True if `record` satisfies every condition.
    pub fn matches(&self, record: &Record) -> bool {
        self.conditions
            .iter()
            .all(|(field, expected)| record.get(field) == Some(expected))
    }
}

/// Which fields a lookup should return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldProjection {
    /// Every field on the object ("unrestricted").
    All,
    /// Only the listed fields.
    Only(Vec<String>),
}

impl FieldProjection {
    pub fn is_restricted(&self) -> bool {
        matches!(self, FieldProjection::Only(_))
    }

    /// Field list for a restricted projection, `None` when unrestricted.
    pub fn fields(&self) -> Option<&[String]> {
        match self {
            FieldProjection::All => None,
            FieldProjection::Only(fields) => Some(fields),
        }
    }

    /// Keep only the projected fields of `record`.
    pub fn apply(&self, record: &Record) -> Record {
        match self {
            FieldProjection::All => record.clone(),
            FieldProjection::Only(fields) => record
                .iter()
                .filter(|(name, _)| fields.iter().any(|f| f == *name))
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
        }
    }
}

/// Outcome of a single record creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateResult {
    pub id: Option<String>,
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl CreateResult {
    pub fn created(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            success: true,
            errors: Vec::new(),
        }
    }

    pub fn failed(errors: Vec<String>) -> Self {
        Self {
            id: None,
            success: false,
            errors,
        }
    }
}

/// Outcome of an update or delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationResult {
    pub id: String,
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl MutationResult {
    pub fn ok(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            success: true,
            errors: Vec::new(),
        }
    }
}

/// Read the `Id` field of a record, if it is a string.
pub fn record_id(record: &Record) -> Option<&str> {
    record.get("Id").and_then(Value::as_str)
}
