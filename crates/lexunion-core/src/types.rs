//! Document model shared by every retriever backend.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::{Error, Result};

/// A structured record: an ordered mapping from field name to JSON value.
///
/// Field order is preserved from the source. Retrievers read the key field
/// and their indexed field; everything else passes through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    pub fn new() -> Self { Self::default() }

    /// Builder-style insert, handy for tests and fixtures.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> { self.0.get(field) }

    pub fn contains(&self, field: &str) -> bool { self.0.contains_key(field) }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> { self.0.iter() }

    /// Identity of this document under the given key field.
    pub fn key(&self, field: &str) -> Result<DocKey> {
        self.0
            .get(field)
            .map(DocKey::from_value)
            .ok_or_else(|| Error::MissingField { field: field.to_string() })
    }

    /// Text content of `field` as seen by the indexers.
    ///
    /// Strings are returned as-is, scalars are rendered, arrays are joined
    /// with a space. Missing fields, nulls and objects yield an empty string.
    pub fn text(&self, field: &str) -> String {
        self.0.get(field).map(value_text).unwrap_or_default()
    }
}

impl From<Map<String, Value>> for Document {
    fn from(map: Map<String, Value>) -> Self { Self(map) }
}

impl TryFrom<Value> for Document {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(Error::InvalidConfig(format!("expected a JSON object, found {}", json_kind(&other)))),
        }
    }
}

/// Render a JSON value as indexable text (see [`Document::text`]).
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items
            .iter()
            .map(value_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
        Value::Null | Value::Object(_) => String::new(),
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

/// Canonical, equality-comparable form of a key field value.
///
/// The value is stored as compact JSON so that `0` and `"0"` stay distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocKey(String);

impl DocKey {
    pub fn from_value(value: &Value) -> Self { Self(value.to_string()) }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for DocKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// Construction parameters shared by every backend.
///
/// - `key`: field whose value identifies a document
/// - `on`: field the retriever indexes and matches against
/// - `k`: result budget; `None` means unbounded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrieverConfig {
    pub key: String,
    pub on: String,
    #[serde(default)]
    pub k: Option<usize>,
}

impl RetrieverConfig {
    pub fn new(key: impl Into<String>, on: impl Into<String>) -> Self {
        Self { key: key.into(), on: on.into(), k: None }
    }

    pub fn with_k(mut self, k: Option<usize>) -> Self {
        self.k = k;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.key.is_empty() { return Err(Error::InvalidConfig("key field name is empty".into())); }
        if self.on.is_empty() { return Err(Error::InvalidConfig("indexed field name is empty".into())); }
        validate_k(self.k)
    }
}

/// Budgets must be positive when present.
pub fn validate_k(k: Option<usize>) -> Result<()> {
    match k {
        Some(0) => Err(Error::InvalidConfig("k must be a positive integer".into())),
        _ => Ok(()),
    }
}

/// What a union does when one of its children fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChildFailurePolicy {
    /// Propagate the first child error to the caller.
    #[default]
    FailFast,
    /// Log the error and treat the child as having returned nothing.
    Degrade,
}
