//! The canonical metadata record.
//!
//! A [`Record`] is an insertion-ordered mapping from field name to a scalar
//! or a vector of strings. Field names follow the upstream vocabulary:
//! vector fields (`vActor`, `vDirector`, `vProgramGenre`, ...) carry a `v`
//! prefix, rating fields hold canonical integers once normalized.

use serde::{Deserialize, Serialize};

/// A single field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Scalar text (titles, descriptions, timestamps).
    Text(String),
    /// Canonical integer, used for normalized ratings.
    Int(i64),
    /// Ordered list of strings (cast, writers, genres).
    List(Vec<String>),
}

impl Value {
    /// The text content, if this is a scalar string.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The integer content, if this is a scalar integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// The list content, if this is a vector field.
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Value::List(items)
    }
}

/// An insertion-ordered metadata record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// True if the record holds no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of fields in the record.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True if the field is present.
    pub fn contains(&self, key: &str) -> bool {
        self.fields.iter().any(|(k, _)| k == key)
    }

    /// Look up a field by name.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Text content of a scalar field, if present.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_text)
    }

    /// Integer content of a scalar field, if present.
    pub fn int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_int)
    }

    /// List content of a vector field, if present.
    pub fn list(&self, key: &str) -> Option<&[String]> {
        self.get(key).and_then(Value::as_list)
    }

    /// Set a field, replacing an existing value in place so the record keeps
    /// its insertion order.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.fields.push((key, value)),
        }
    }

    /// Remove a field, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let idx = self.fields.iter().position(|(k, _)| k == key)?;
        Some(self.fields.remove(idx).1)
    }

    /// Append an item to a vector field, creating the field if absent.
    /// Duplicate items are not inserted twice.
    pub fn push_list(&mut self, key: impl Into<String>, item: impl Into<String>) {
        let key = key.into();
        let item = item.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, Value::List(items))) => {
                if !items.contains(&item) {
                    items.push(item);
                }
            }
            Some((_, v)) => *v = Value::List(vec![item]),
            None => self.fields.push((key, Value::List(vec![item]))),
        }
    }

    /// Vector fields carry a `v` prefix in the upstream field vocabulary.
    pub fn is_vector_key(key: &str) -> bool {
        key.starts_with('v')
    }

    /// Merge another record into this one. Scalar fields from `other`
    /// override same-named fields here. When `additive` is set, vector
    /// fields append (without duplicates) instead of replacing.
    pub fn merge(&mut self, other: Record, additive: bool) {
        for (key, value) in other.fields {
            match (additive, value) {
                (true, Value::List(items)) if self.list(&key).is_some() => {
                    for item in items {
                        self.push_list(&key, item);
                    }
                }
                (_, value) => self.set(key, value),
            }
        }
    }

    /// Iterate over fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.set(k, v);
        }
        record
    }
}
