//! Hierarchical template parameters and their merge rules.
//!
//! Merging recurses only where both sides hold a mapping. Lists and scalars
//! on the overriding side replace the base value outright.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{io_err, ValuesError};

/// A string-keyed tree of parameter values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Values(Map<String, Value>);

impl Values {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    /// Return `self` deep-merged with `overrides`; keys in `overrides` win.
    ///
    /// Neither input is modified.
    pub fn merged(&self, overrides: &Values) -> Values {
        let mut out = self.0.clone();
        deep_merge(&mut out, &overrides.0);
        Values(out)
    }

    /// Assign `value` at a dotted `path`, creating intermediate mappings and
    /// replacing any non-mapping value found along the way.
    pub fn set_path(&mut self, path: &str, value: Value) {
        let mut segments: Vec<&str> = path.split('.').collect();
        let last = segments.pop().unwrap_or_default();
        let mut current = &mut self.0;
        for segment in segments {
            let entry = current
                .entry(segment)
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            current = match entry {
                Value::Object(map) => map,
                _ => unreachable!("entry was just normalised to a mapping"),
            };
        }
        current.insert(last.to_string(), value);
    }

    /// Apply a `path=value` assignment. The value is parsed as a YAML scalar
    /// or flow collection, so `replicas=3` yields a number and `tag=v1` a string.
    pub fn apply_assignment(&mut self, expr: &str) -> Result<(), ValuesError> {
        let (path, raw) = expr
            .split_once('=')
            .ok_or_else(|| ValuesError::InvalidAssignment(expr.to_string()))?;
        let path = path.trim();
        if path.is_empty() || path.split('.').any(str::is_empty) {
            return Err(ValuesError::InvalidAssignment(expr.to_string()));
        }
        let value = if raw.is_empty() {
            Value::String(String::new())
        } else {
            serde_yaml::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
        };
        self.set_path(path, value);
        Ok(())
    }

    /// Parse a YAML document whose root must be a mapping. An empty
    /// document yields empty values.
    pub fn from_yaml_str(text: &str, origin: &str) -> Result<Self, ValuesError> {
        if text.trim().is_empty() {
            return Ok(Values::new());
        }
        match serde_yaml::from_str::<Value>(text)? {
            Value::Null => Ok(Values::new()),
            Value::Object(map) => Ok(Values(map)),
            _ => Err(ValuesError::NotAMapping {
                origin: origin.to_string(),
            }),
        }
    }

    /// Load values from a YAML file.
    pub fn load(path: &Path) -> Result<Self, ValuesError> {
        let text = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
        Self::from_yaml_str(&text, &path.display().to_string())
    }
}

impl From<Map<String, Value>> for Values {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Values {
    type Error = ValuesError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Values(map)),
            _ => Err(ValuesError::NotAMapping {
                origin: "inline value".to_string(),
            }),
        }
    }
}

fn deep_merge(base: &mut Map<String, Value>, overrides: &Map<String, Value>) {
    for (key, value) in overrides {
        match (base.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                deep_merge(existing, incoming);
            }
            _ => {
                base.insert(key.clone(), value.clone());
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
