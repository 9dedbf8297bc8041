//! Raw resource descriptions
//!
//! The platform answers every `Describe*` call with a nested JSON object. The
//! client keeps that object as-is so that every key the platform reports is
//! preserved, and offers dotted-path lookups on top of it.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A description returned by the control plane
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Description(Map<String, Value>);

impl Description {
    /// Creates a description from a JSON object map
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Creates a description from any JSON value
    ///
    /// Returns `None` if the value is not an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// Returns a top-level field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Looks up a nested field by dotted path
    ///
    /// Path segments that parse as integers index into arrays, so
    /// `"ProcessingInputs.0.InputName"` reads the first input's name.
    pub fn at(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.0.get(first)?;

        for segment in segments {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }

        Some(current)
    }

    /// Looks up a nested string field by dotted path
    pub fn str_at(&self, path: &str) -> Option<&str> {
        self.at(path).and_then(Value::as_str)
    }

    /// Looks up a nested integer field by dotted path
    pub fn u64_at(&self, path: &str) -> Option<u64> {
        self.at(path).and_then(Value::as_u64)
    }

    /// Deserializes a nested field into a typed value
    ///
    /// Returns `None` when the path is absent, `Some(Err(..))` when present but malformed.
    pub fn decode_at<T: DeserializeOwned>(&self, path: &str) -> Option<serde_json::Result<T>> {
        self.at(path).map(|value| serde_json::from_value(value.clone()))
    }

    /// Whether a nested path is present
    pub fn contains(&self, path: &str) -> bool {
        self.at(path).is_some()
    }

    /// Underlying JSON object
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consumes the description, returning the JSON value
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Description {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
