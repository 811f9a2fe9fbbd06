//! Metric payloads handed to hooks.

use serde::{Deserialize, Serialize};
use std::collections::hash_map::{self, HashMap};

/// A single metric value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LogValue {
    /// Scalar metric such as a loss or an accuracy.
    Scalar(f64),
    /// Composite metric such as per-class scores.
    Vector(Vec<f64>),
    /// Free-form annotation.
    Text(String),
}

impl LogValue {
    /// The scalar value, if this is a scalar.
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            LogValue::Scalar(v) => Some(*v),
            _ => None,
        }
    }

    /// The values, if this is a vector.
    pub fn as_vector(&self) -> Option<&[f64]> {
        match self {
            LogValue::Vector(v) => Some(v),
            _ => None,
        }
    }

    /// The text, if this is a text annotation.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            LogValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<f64> for LogValue {
    fn from(value: f64) -> Self {
        LogValue::Scalar(value)
    }
}

impl From<f32> for LogValue {
    fn from(value: f32) -> Self {
        LogValue::Scalar(f64::from(value))
    }
}

impl From<Vec<f64>> for LogValue {
    fn from(values: Vec<f64>) -> Self {
        LogValue::Vector(values)
    }
}

impl From<&str> for LogValue {
    fn from(text: &str) -> Self {
        LogValue::Text(text.to_string())
    }
}

impl From<String> for LogValue {
    fn from(text: String) -> Self {
        LogValue::Text(text)
    }
}

/// Metrics passed to a hook.
///
/// The training loop builds a `Logs` for each call site and lends it to the
/// hook for the duration of the call. Key order carries no meaning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Logs {
    values: HashMap<String, LogValue>,
}

impl Logs {
    /// Create empty logs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert of a scalar.
    pub fn with_scalar(mut self, key: impl Into<String>, value: f64) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert a value, returning the previous one under the same key.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<LogValue>,
    ) -> Option<LogValue> {
        self.values.insert(key.into(), value.into())
    }

    /// Get a value by key.
    pub fn get(&self, key: &str) -> Option<&LogValue> {
        self.values.get(key)
    }

    /// Get a scalar by key. Non-scalar values yield `None`.
    pub fn scalar(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(LogValue::as_scalar)
    }

    /// Whether a key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Remove a value by key.
    pub fn remove(&mut self, key: &str) -> Option<LogValue> {
        self.values.remove(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over entries in arbitrary order.
    pub fn iter(&self) -> hash_map::Iter<'_, String, LogValue> {
        self.values.iter()
    }

    /// Copy every entry of `other` into `self`, overwriting equal keys.
    pub fn merge(&mut self, other: &Logs) {
        for (key, value) in other.iter() {
            self.values.insert(key.clone(), value.clone());
        }
    }

    /// Remove all entries.
    pub fn clear(&mut self) {
        self.values.clear();
    }
}

impl<K: Into<String>, V: Into<LogValue>> FromIterator<(K, V)> for Logs {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Logs {
    type Item = (&'a String, &'a LogValue);
    type IntoIter = hash_map::Iter<'a, String, LogValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}
